use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;

use parking_lot::Mutex;

use crate::models::error::CameraError;
use crate::traits::dispatch_context::{DispatchContext, DispatchTask};

/// Dispatch context backed by one dedicated worker thread.
///
/// Tasks run one at a time in submission order. Dropping the context stops
/// accepting tasks, lets the queued ones finish, and joins the worker (unless
/// the drop happens on the worker itself).
pub struct SerialContext {
    name: String,
    sender: Mutex<Option<mpsc::Sender<DispatchTask>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl SerialContext {
    pub fn new(name: &str) -> Result<Self, CameraError> {
        let (sender, receiver) = mpsc::channel::<DispatchTask>();
        let thread_name = name.to_string();

        let worker = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                while let Ok(task) = receiver.recv() {
                    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                        log::error!("Task panicked on dispatch thread {}", thread_name);
                    }
                }
                log::debug!("Dispatch thread {} finished", thread_name);
            })
            .map_err(|e| CameraError::Configuration(format!("failed to spawn dispatch thread: {}", e)))?;

        Ok(Self {
            name: name.to_string(),
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the caller is running on this context's worker thread.
    pub fn is_worker_thread(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|handle| handle.thread().id() == thread::current().id())
    }

    /// Stop accepting tasks and wait for queued ones to finish.
    pub fn shutdown(&self) {
        self.sender.lock().take();

        let Some(handle) = self.worker.lock().take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            // Cannot join ourselves; the loop ends once the queue drains.
            return;
        }
        if handle.join().is_err() {
            log::error!("Dispatch thread {} panicked", self.name);
        }
    }
}

impl DispatchContext for SerialContext {
    fn execute(&self, task: DispatchTask) {
        match self.sender.lock().as_ref() {
            Some(sender) => {
                if sender.send(task).is_err() {
                    log::warn!("Dispatch thread {} is gone, task dropped", self.name);
                }
            }
            None => log::debug!("Dispatch context {} shut down, task dropped", self.name),
        }
    }
}

impl Drop for SerialContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn tasks_run_in_order_on_named_thread() {
        let context = SerialContext::new("camera-test-dispatch").unwrap();
        let (tx, rx) = mpsc::channel();

        for i in 0..20 {
            let tx = tx.clone();
            context.execute(Box::new(move || {
                let name = thread::current().name().map(str::to_string);
                tx.send((i, name)).unwrap();
            }));
        }

        for expected in 0..20 {
            let (i, name) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            assert_eq!(i, expected);
            assert_eq!(name.as_deref(), Some("camera-test-dispatch"));
        }
    }

    #[test]
    fn shutdown_drains_queue_then_drops_new_tasks() {
        let context = SerialContext::new("camera-test-drain").unwrap();
        let (tx, rx) = mpsc::channel();

        let first = tx.clone();
        context.execute(Box::new(move || first.send(1).unwrap()));
        context.shutdown();

        context.execute(Box::new(move || tx.send(2).unwrap()));
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(1));
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn panicking_task_does_not_stop_worker() {
        let context = SerialContext::new("camera-test-panic").unwrap();
        let (tx, rx) = mpsc::channel();

        context.execute(Box::new(|| panic!("listener bug")));
        context.execute(Box::new(move || tx.send("still running").unwrap()));

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok("still running"));
    }

    #[test]
    fn dropping_on_worker_thread_does_not_deadlock() {
        let context = Arc::new(SerialContext::new("camera-test-self-drop").unwrap());
        let (tx, rx) = mpsc::channel();

        let inner = Arc::clone(&context);
        let slot = Arc::new(Mutex::new(Some(inner)));
        let task_slot = Arc::clone(&slot);
        context.execute(Box::new(move || {
            let on_worker = task_slot.lock().as_ref().map(|c| c.is_worker_thread());
            // Last reference released on the worker thread.
            task_slot.lock().take();
            tx.send(on_worker).unwrap();
        }));
        drop(context);

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(Some(true)));
    }
}
