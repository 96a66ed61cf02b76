//! Simulated camera permission.
//!
//! Stands in for an OS privacy setting. The application (or a test) can grant
//! or revoke access at runtime; the controller consults it on every `start()`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use camera_session_core::traits::capability_gate::CapabilityGate;

/// Shared, switchable camera permission. Clones observe the same flag.
#[derive(Debug, Clone)]
pub struct SimulatedPermission {
    granted: Arc<AtomicBool>,
}

impl SimulatedPermission {
    pub fn granted() -> Self {
        Self {
            granted: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn denied() -> Self {
        Self {
            granted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn grant(&self) {
        log::info!("Camera permission granted");
        self.granted.store(true, Ordering::SeqCst);
    }

    pub fn revoke(&self) {
        log::info!("Camera permission revoked");
        self.granted.store(false, Ordering::SeqCst);
    }

    pub fn is_granted(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }
}

impl CapabilityGate for SimulatedPermission {
    fn has_camera_capability(&self) -> bool {
        self.is_granted()
    }
}
