pub mod dispatcher;
pub mod event;
pub mod serial_context;
