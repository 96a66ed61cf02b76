use std::sync::Arc;

use crate::models::captured_image::CapturedImage;
use crate::models::error::{CameraError, ErrorLevel};

/// What a listener returns. An `Err` is reported as a `ListenerFailure`
/// warning and never affects the session.
pub type ListenerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// A registered listener.
pub type Listener = Arc<dyn Fn(&CameraEvent) -> ListenerResult + Send + Sync>;

/// The five event channels a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Opened,
    Closed,
    Error,
    Frame,
    PictureTaken,
}

/// An event published by the session controller.
#[derive(Debug, Clone)]
pub enum CameraEvent {
    Opened,
    Closed,
    Error { error: CameraError, level: ErrorLevel },
    /// Throttled, transcoded preview frame.
    Frame(CapturedImage),
    /// Still capture, delivered in request order.
    PictureTaken(CapturedImage),
}

impl CameraEvent {
    /// Failure event at the error's default level.
    pub fn error(error: CameraError) -> Self {
        let level = error.level();
        Self::Error { error, level }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Opened => EventKind::Opened,
            Self::Closed => EventKind::Closed,
            Self::Error { .. } => EventKind::Error,
            Self::Frame(_) => EventKind::Frame,
            Self::PictureTaken(_) => EventKind::PictureTaken,
        }
    }
}

/// Identifies one listener registration. Pass it to `unsubscribe` to remove
/// exactly that registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: u64,
    kind: EventKind,
}

impl SubscriptionHandle {
    pub(crate) fn new(id: u64, kind: EventKind) -> Self {
        Self { id, kind }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }
}
