//! # camera-session-sim
//!
//! Simulated camera backend for camera-session-kit.
//!
//! Provides:
//! - `SimulatedCamera`: synthetic NV21 preview stream and JPEG still captures,
//!   with injectable open failures and runtime faults
//! - `SimulatedPermission`: runtime-switchable camera capability gate
//!
//! ## Usage
//! ```ignore
//! use camera_session_core::{CameraSessionController, SessionConfiguration};
//! use camera_session_sim::{SimulatedCamera, SimulatedPermission};
//!
//! let controller = CameraSessionController::new(
//!     SimulatedCamera::default(),
//!     SimulatedPermission::granted(),
//!     SessionConfiguration::default(),
//! )?;
//! controller.start()?;
//! ```

pub mod permissions;
pub mod simulated_camera;

pub use permissions::SimulatedPermission;
pub use simulated_camera::{SimulatedCamera, SimulatedCameraConfig, SimulatedHandle};
