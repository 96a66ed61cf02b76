//! # camera-session-core
//!
//! Platform-agnostic camera session core.
//!
//! Provides the session lifecycle state machine, typed event dispatch, preview
//! frame throttling, and YUV/JPEG/PNG transcoding. Hardware backends implement
//! the `HardwareSessionProvider` trait and plug into the generic
//! `CameraSessionController`.
//!
//! ## Architecture
//!
//! ```text
//! camera-session-core (this crate)
//! ├── traits/       ← HardwareSessionProvider, CapabilityGate, DispatchContext
//! ├── models/       ← CameraError, CameraState, Frame, CapturedImage, SessionConfiguration, etc.
//! ├── processing/   ← FrameThrottler, ImageTranscoder, FlashModeCycler, CaptureSequencer
//! ├── events/       ← EventDispatcher, CameraEvent, SerialContext
//! └── session/      ← CameraSessionController (generic orchestrator), HardwareCallbacks
//! ```

pub mod events;
pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use events::dispatcher::EventDispatcher;
pub use events::event::{CameraEvent, EventKind, ListenerResult, SubscriptionHandle};
pub use events::serial_context::SerialContext;
pub use models::camera_models::{FlashMode, ImageEncoding, PixelFormat, Rotation, SessionDiagnostics};
pub use models::captured_image::CapturedImage;
pub use models::config::SessionConfiguration;
pub use models::error::{CameraError, ErrorLevel};
pub use models::frame::Frame;
pub use models::state::CameraState;
pub use processing::capture_sequencer::CaptureSequencer;
pub use processing::flash_cycler::FlashModeCycler;
pub use processing::frame_stats::FrameIntervalStats;
pub use processing::frame_throttler::FrameThrottler;
pub use processing::image_transcoder::ImageTranscoder;
pub use session::callbacks::HardwareCallbacks;
pub use session::controller::CameraSessionController;
pub use traits::capability_gate::CapabilityGate;
pub use traits::dispatch_context::{DispatchContext, InlineContext};
pub use traits::hardware_provider::{CaptureRequest, HardwareSessionProvider};
