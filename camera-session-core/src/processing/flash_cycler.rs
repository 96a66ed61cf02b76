use crate::models::camera_models::FlashMode;
use crate::models::error::CameraError;

/// Next mode in the user-facing cycle `Off → Auto → On → Off`.
///
/// Modes outside the cycle (`Torch`, `RedEye`) are rejected rather than
/// mapped to a guess.
pub fn next(mode: FlashMode) -> Result<FlashMode, CameraError> {
    match mode {
        FlashMode::Off => Ok(FlashMode::Auto),
        FlashMode::Auto => Ok(FlashMode::On),
        FlashMode::On => Ok(FlashMode::Off),
        other => Err(CameraError::InvalidState(format!(
            "flash mode {:?} is not part of the off/auto/on cycle",
            other
        ))),
    }
}

/// Holder of the current flash mode with cycling support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlashModeCycler {
    current: FlashMode,
}

impl FlashModeCycler {
    pub fn new(initial: FlashMode) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> FlashMode {
        self.current
    }

    pub fn set(&mut self, mode: FlashMode) {
        self.current = mode;
    }

    /// Move to the next mode in the cycle and return it.
    ///
    /// Leaves the current mode untouched on error.
    pub fn advance(&mut self) -> Result<FlashMode, CameraError> {
        let next = next(self.current)?;
        self.current = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_order() {
        assert_eq!(next(FlashMode::Off), Ok(FlashMode::Auto));
        assert_eq!(next(FlashMode::Auto), Ok(FlashMode::On));
        assert_eq!(next(FlashMode::On), Ok(FlashMode::Off));
    }

    #[test]
    fn three_steps_return_to_start() {
        for mode in [FlashMode::Off, FlashMode::Auto, FlashMode::On] {
            let cycled = next(mode).and_then(next).and_then(next);
            assert_eq!(cycled, Ok(mode));
        }
    }

    #[test]
    fn modes_outside_cycle_are_rejected() {
        assert!(matches!(next(FlashMode::Torch), Err(CameraError::InvalidState(_))));
        assert!(matches!(next(FlashMode::RedEye), Err(CameraError::InvalidState(_))));
    }

    #[test]
    fn cycler_advances_and_keeps_mode_on_error() {
        let mut cycler = FlashModeCycler::default();
        assert_eq!(cycler.current(), FlashMode::Off);
        assert_eq!(cycler.advance(), Ok(FlashMode::Auto));
        assert_eq!(cycler.current(), FlashMode::Auto);

        cycler.set(FlashMode::Torch);
        assert!(cycler.advance().is_err());
        assert_eq!(cycler.current(), FlashMode::Torch);
    }
}
