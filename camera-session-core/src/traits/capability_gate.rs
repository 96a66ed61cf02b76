/// Predicate guarding access to the camera hardware.
///
/// Implemented by the application's permission layer. The controller consults
/// it on every `start()` and refuses to open hardware without capability.
/// Closures `Fn() -> bool` implement it directly.
pub trait CapabilityGate: Send + Sync {
    /// Whether the process currently may access the camera.
    fn has_camera_capability(&self) -> bool;
}

impl<F> CapabilityGate for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn has_camera_capability(&self) -> bool {
        self()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn closures_are_gates() {
        let granted = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&granted);
        let gate = move || flag.load(Ordering::SeqCst);

        assert!(!gate.has_camera_capability());
        granted.store(true, Ordering::SeqCst);
        assert!(gate.has_camera_capability());
    }
}
