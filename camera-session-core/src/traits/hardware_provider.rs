use crate::models::camera_models::FlashMode;
use crate::models::error::CameraError;
use crate::session::callbacks::HardwareCallbacks;

/// A single-shot still capture request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    /// Request sequence number; echo it back through `picture_taken`.
    pub id: u64,
    /// Flash mode in effect when the request was issued.
    pub flash: FlashMode,
}

/// Interface for camera hardware backends.
///
/// Implemented by:
/// - `SimulatedCamera` (camera-session-sim)
/// - Future: V4L2, libcamera, Android Camera2 bridges
///
/// Every operation must return promptly. Outcomes are reported through the
/// `HardwareCallbacks` handed to `open_session`, from any thread, and may also
/// be reported synchronously from inside the call.
pub trait HardwareSessionProvider: Send + Sync + 'static {
    /// Opaque session handle, owned by the controller while a session is live.
    type Handle: Clone + Send + Sync + 'static;

    /// Begin opening a session. Report `opened` or `open_failed`, then stream
    /// preview frames and still captures through the same callbacks.
    fn open_session(&self, callbacks: HardwareCallbacks<Self::Handle>);

    /// Release a session. May be called from a callback thread.
    fn close_session(&self, handle: Self::Handle);

    /// Request one still picture; report it with `picture_taken(request.id, ..)`.
    fn request_capture(&self, handle: &Self::Handle, request: CaptureRequest);

    /// Apply a flash mode to an open session.
    fn set_flash(&self, _handle: &Self::Handle, _mode: FlashMode) -> Result<(), CameraError> {
        Ok(())
    }
}
