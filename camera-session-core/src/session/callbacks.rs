use std::sync::Weak;

use crate::models::captured_image::CapturedImage;
use crate::models::error::CameraError;
use crate::models::frame::Frame;

/// Receiving side of `HardwareCallbacks`, implemented by the controller.
pub(crate) trait CallbackSink<H>: Send + Sync {
    fn current_generation(&self) -> u64;
    fn on_opened(&self, generation: u64, handle: H);
    fn on_open_failed(&self, generation: u64, error: CameraError);
    fn on_frame(&self, generation: u64, frame: Frame);
    fn on_picture(&self, generation: u64, request_id: u64, result: Result<CapturedImage, CameraError>);
    fn on_fault(&self, generation: u64, error: CameraError);
}

/// Callbacks a hardware provider uses to report results for one session.
///
/// Every value is tagged with the session generation it was created for.
/// Once the controller moves on (stop, restart, fault), reports through an
/// old value are discarded, so providers never need to know whether their
/// session is still wanted. `is_stale()` lets long-running producers stop
/// early. Cheap to clone and safe to call from any thread.
pub struct HardwareCallbacks<H> {
    generation: u64,
    sink: Weak<dyn CallbackSink<H>>,
}

impl<H> HardwareCallbacks<H> {
    pub(crate) fn new(generation: u64, sink: Weak<dyn CallbackSink<H>>) -> Self {
        Self { generation, sink }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the controller has moved past this session (or is gone).
    pub fn is_stale(&self) -> bool {
        match self.sink.upgrade() {
            Some(sink) => sink.current_generation() != self.generation,
            None => true,
        }
    }

    /// Report a successfully opened session.
    ///
    /// Returns the handle back if the controller no longer exists; the
    /// provider then owns it and must release it. A live controller takes the
    /// handle even when the session is stale, and closes it itself.
    pub fn opened(&self, handle: H) -> Result<(), H> {
        match self.sink.upgrade() {
            Some(sink) => {
                sink.on_opened(self.generation, handle);
                Ok(())
            }
            None => Err(handle),
        }
    }

    pub fn open_failed(&self, error: CameraError) {
        if let Some(sink) = self.sink.upgrade() {
            sink.on_open_failed(self.generation, error);
        }
    }

    /// Report one raw preview frame.
    pub fn frame(&self, frame: Frame) {
        if let Some(sink) = self.sink.upgrade() {
            sink.on_frame(self.generation, frame);
        }
    }

    /// Report the outcome of the capture request with id `request_id`.
    pub fn picture_taken(&self, request_id: u64, result: Result<CapturedImage, CameraError>) {
        if let Some(sink) = self.sink.upgrade() {
            sink.on_picture(self.generation, request_id, result);
        }
    }

    /// Report an unrecoverable hardware fault. The session is torn down.
    pub fn fault(&self, error: CameraError) {
        if let Some(sink) = self.sink.upgrade() {
            sink.on_fault(self.generation, error);
        }
    }
}

impl<H> Clone for HardwareCallbacks<H> {
    fn clone(&self) -> Self {
        Self {
            generation: self.generation,
            sink: Weak::clone(&self.sink),
        }
    }
}

impl<H> std::fmt::Debug for HardwareCallbacks<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardwareCallbacks")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
