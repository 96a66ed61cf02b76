/// A unit of listener work handed to a dispatch context.
pub type DispatchTask = Box<dyn FnOnce() + Send + 'static>;

/// Execution context that runs listener delivery passes.
///
/// The application chooses where listener code runs: inline on the thread
/// that published the event, on a dedicated worker (`SerialContext`), or on
/// a UI event loop. Implementations must run tasks in submission order.
pub trait DispatchContext: Send + Sync {
    fn execute(&self, task: DispatchTask);
}

/// Runs every delivery pass synchronously on the publishing thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineContext;

impl DispatchContext for InlineContext {
    fn execute(&self, task: DispatchTask) {
        task();
    }
}
