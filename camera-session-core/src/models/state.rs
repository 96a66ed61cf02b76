/// Camera session state machine.
///
/// State transitions:
/// ```text
/// closed → opening → opened → closing → closed
///             ↓         ↓
///           error  →  closed
/// ```
///
/// There is no terminal state; a session can always be restarted from `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraState {
    #[default]
    Closed,
    Opening,
    Opened,
    Closing,
    Error,
}

impl CameraState {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    pub fn is_opened(&self) -> bool {
        matches!(self, Self::Opened)
    }

    /// Opening or opened: the states `stop()` and `set_flash()` act on.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Opening | Self::Opened)
    }

    /// States in which the controller owns (or is acquiring) a hardware handle.
    pub fn holds_hardware(&self) -> bool {
        matches!(self, Self::Opening | Self::Opened | Self::Closing)
    }

    /// States in which frame and picture callbacks of the current generation
    /// may still be delivered.
    pub fn accepts_in_flight(&self) -> bool {
        matches!(self, Self::Opened | Self::Closing)
    }
}
