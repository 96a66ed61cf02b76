pub mod capability_gate;
pub mod dispatch_context;
pub mod hardware_provider;
