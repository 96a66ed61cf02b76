use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::events::event::{CameraEvent, EventKind, Listener, ListenerResult, SubscriptionHandle};
use crate::models::error::{CameraError, ErrorLevel};
use crate::traits::dispatch_context::{DispatchContext, InlineContext};

struct Registry {
    next_id: u64,
    listeners: Vec<(SubscriptionHandle, Listener)>,
}

impl Registry {
    fn snapshot(&self, kind: EventKind) -> Vec<Listener> {
        self.listeners
            .iter()
            .filter(|(handle, _)| handle.kind() == kind)
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }
}

/// Typed publish/subscribe registry for camera events.
///
/// Listeners of one kind are called in subscription order. Each `publish`
/// snapshots the matching listeners under the registry lock and runs the
/// delivery pass on the dispatch context with the lock released, so
/// listeners may subscribe or unsubscribe freely; changes apply to the next
/// pass.
pub struct EventDispatcher {
    registry: Arc<Mutex<Registry>>,
    context: Arc<dyn DispatchContext>,
    failures: Arc<AtomicU64>,
}

impl EventDispatcher {
    /// Dispatcher that delivers synchronously on the publishing thread.
    pub fn new() -> Self {
        Self::with_context(Arc::new(InlineContext))
    }

    pub fn with_context(context: Arc<dyn DispatchContext>) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 1,
                listeners: Vec::new(),
            })),
            context,
            failures: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> SubscriptionHandle
    where
        F: Fn(&CameraEvent) -> ListenerResult + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock();
        let handle = SubscriptionHandle::new(registry.next_id, kind);
        registry.next_id += 1;
        registry.listeners.push((handle, Arc::new(listener)));
        handle
    }

    /// Remove one registration. Returns false if it was already gone.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let mut registry = self.registry.lock();
        let before = registry.listeners.len();
        registry.listeners.retain(|(h, _)| h != handle);
        registry.listeners.len() != before
    }

    /// Drop every registration.
    pub fn clear(&self) {
        self.registry.lock().listeners.clear();
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.registry
            .lock()
            .listeners
            .iter()
            .filter(|(handle, _)| handle.kind() == kind)
            .count()
    }

    /// Total listener invocations that returned an error or panicked.
    pub fn listener_failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn publish(&self, event: CameraEvent) {
        let listeners = self.registry.lock().snapshot(event.kind());

        if listeners.is_empty() {
            if let CameraEvent::Error { error, level } = &event {
                match level {
                    ErrorLevel::Error => log::error!("Unhandled camera error: {}", error),
                    ErrorLevel::Warning => log::warn!("Unhandled camera warning: {}", error),
                }
            }
            return;
        }

        let registry = Arc::clone(&self.registry);
        let failures = Arc::clone(&self.failures);
        self.context.execute(Box::new(move || {
            deliver(&registry, &failures, &listeners, &event);
        }));
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn deliver(registry: &Mutex<Registry>, failures: &AtomicU64, listeners: &[Listener], event: &CameraEvent) {
    for listener in listeners {
        let Some(reason) = invoke(listener, event) else {
            continue;
        };
        failures.fetch_add(1, Ordering::Relaxed);

        if event.kind() == EventKind::Error {
            log::error!("Error listener failed: {}", reason);
            continue;
        }

        log::warn!("{:?} listener failed: {}", event.kind(), reason);
        let failure = CameraEvent::Error {
            error: CameraError::ListenerFailure(reason),
            level: ErrorLevel::Warning,
        };
        let error_listeners = registry.lock().snapshot(EventKind::Error);
        for error_listener in &error_listeners {
            if let Some(reason) = invoke(error_listener, &failure) {
                failures.fetch_add(1, Ordering::Relaxed);
                log::error!("Error listener failed: {}", reason);
            }
        }
    }
}

/// Run one listener, turning an `Err` or a panic into a failure reason.
fn invoke(listener: &Listener, event: &CameraEvent) -> Option<String> {
    match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(err.to_string()),
        Err(payload) => Some(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::events::serial_context::SerialContext;

    fn recorder(
        log: &Arc<Mutex<Vec<String>>>,
        tag: &'static str,
    ) -> impl Fn(&CameraEvent) -> ListenerResult + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |event| {
            log.lock().push(format!("{}:{:?}", tag, event.kind()));
            Ok(())
        }
    }

    #[test]
    fn delivers_in_subscription_order() {
        let dispatcher = EventDispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        dispatcher.subscribe(EventKind::Opened, recorder(&log, "a"));
        dispatcher.subscribe(EventKind::Opened, recorder(&log, "b"));
        dispatcher.subscribe(EventKind::Opened, recorder(&log, "c"));
        dispatcher.publish(CameraEvent::Opened);

        assert_eq!(*log.lock(), vec!["a:Opened", "b:Opened", "c:Opened"]);
    }

    #[test]
    fn only_matching_kind_is_called() {
        let dispatcher = EventDispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        dispatcher.subscribe(EventKind::Opened, recorder(&log, "opened"));
        dispatcher.subscribe(EventKind::Closed, recorder(&log, "closed"));
        dispatcher.publish(CameraEvent::Closed);

        assert_eq!(*log.lock(), vec!["closed:Closed"]);
        assert_eq!(dispatcher.listener_count(EventKind::Opened), 1);
        assert_eq!(dispatcher.listener_count(EventKind::Frame), 0);
    }

    #[test]
    fn unsubscribed_listener_is_not_called() {
        let dispatcher = EventDispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let handle = dispatcher.subscribe(EventKind::Closed, recorder(&log, "a"));
        assert!(dispatcher.unsubscribe(&handle));
        assert!(!dispatcher.unsubscribe(&handle));
        dispatcher.publish(CameraEvent::Closed);

        assert!(log.lock().is_empty());
    }

    #[test]
    fn unsubscribe_during_dispatch_keeps_current_pass() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let second: Arc<Mutex<Option<SubscriptionHandle>>> = Arc::new(Mutex::new(None));

        let d = Arc::clone(&dispatcher);
        let s = Arc::clone(&second);
        dispatcher.subscribe(EventKind::Opened, move |_| {
            if let Some(handle) = s.lock().take() {
                d.unsubscribe(&handle);
            }
            Ok(())
        });
        *second.lock() = Some(dispatcher.subscribe(EventKind::Opened, recorder(&log, "second")));

        dispatcher.publish(CameraEvent::Opened);
        assert_eq!(log.lock().len(), 1);

        dispatcher.publish(CameraEvent::Opened);
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn failing_listener_becomes_warning_and_others_still_run() {
        let dispatcher = EventDispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let warnings = Arc::new(Mutex::new(Vec::new()));

        dispatcher.subscribe(EventKind::Opened, |_| Err("listener refused".into()));
        dispatcher.subscribe(EventKind::Opened, |_| panic!("listener bug"));
        dispatcher.subscribe(EventKind::Opened, recorder(&log, "last"));

        let w = Arc::clone(&warnings);
        dispatcher.subscribe(EventKind::Error, move |event| {
            if let CameraEvent::Error { error, level } = event {
                w.lock().push((error.clone(), *level));
            }
            Ok(())
        });

        dispatcher.publish(CameraEvent::Opened);

        assert_eq!(*log.lock(), vec!["last:Opened"]);
        assert_eq!(dispatcher.listener_failures(), 2);

        let warnings = warnings.lock();
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|(error, level)| {
            matches!(error, CameraError::ListenerFailure(_)) && *level == ErrorLevel::Warning
        }));
        assert!(matches!(&warnings[1].0, CameraError::ListenerFailure(msg) if msg.contains("listener bug")));
    }

    #[test]
    fn failing_error_listener_is_only_logged() {
        let dispatcher = EventDispatcher::new();
        let calls = Arc::new(AtomicU64::new(0));

        let c = Arc::clone(&calls);
        dispatcher.subscribe(EventKind::Error, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Err("cannot show dialog".into())
        });

        dispatcher.publish(CameraEvent::error(CameraError::CaptureFailure("timeout".into())));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.listener_failures(), 1);
    }

    #[test]
    fn error_without_listeners_is_not_lost() {
        let dispatcher = EventDispatcher::new();
        dispatcher.publish(CameraEvent::error(CameraError::HardwareRuntimeFailure("gone".into())));
        assert_eq!(dispatcher.listener_failures(), 0);
    }

    #[test]
    fn clear_removes_all_registrations() {
        let dispatcher = EventDispatcher::new();
        dispatcher.subscribe(EventKind::Opened, |_| Ok(()));
        dispatcher.subscribe(EventKind::Frame, |_| Ok(()));
        dispatcher.clear();

        assert_eq!(dispatcher.listener_count(EventKind::Opened), 0);
        assert_eq!(dispatcher.listener_count(EventKind::Frame), 0);
    }

    #[test]
    fn serial_context_preserves_publish_order() {
        let context = Arc::new(SerialContext::new("camera-test-events").unwrap());
        let dispatcher = EventDispatcher::with_context(context);
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);

        dispatcher.subscribe(EventKind::Opened, move |_| {
            tx.lock().send("opened")?;
            Ok(())
        });
        let (closed_tx, closed_rx) = mpsc::channel();
        let closed_tx = Mutex::new(closed_tx);
        dispatcher.subscribe(EventKind::Closed, move |_| {
            closed_tx.lock().send(thread_name())?;
            Ok(())
        });

        dispatcher.publish(CameraEvent::Opened);
        dispatcher.publish(CameraEvent::Closed);

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok("opened"));
        assert_eq!(
            closed_rx.recv_timeout(Duration::from_secs(2)).unwrap().as_deref(),
            Some("camera-test-events")
        );
    }

    fn thread_name() -> Option<String> {
        std::thread::current().name().map(str::to_string)
    }
}
