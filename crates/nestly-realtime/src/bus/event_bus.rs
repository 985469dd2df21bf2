//! Typed publish/subscribe dispatcher.
//!
//! Handlers are registered per [`EventKind`] and invoked in registration
//! order. `publish` snapshots the handler list under a read lock and
//! invokes it after releasing the lock, so handlers may subscribe or
//! unsubscribe freely. A panicking sync handler is caught and logged;
//! async handlers run as tracked tasks with their own error boundary.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use nestly_core::error::AppError;
use nestly_core::events::{DomainEvent, EventKind};
use nestly_core::result::AppResult;

use super::stats::EventBusStats;

/// Handle returned by every `subscribe*` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type SyncHandler = Arc<dyn Fn(&DomainEvent) + Send + Sync>;
type AsyncHandler = Arc<dyn Fn(DomainEvent) -> BoxFuture<'static, AppResult<()>> + Send + Sync>;

#[derive(Clone)]
enum Handler {
    Sync(SyncHandler),
    Async(AsyncHandler),
}

#[derive(Clone)]
struct Listener {
    id: SubscriptionId,
    handler: Handler,
    once: bool,
    fired: Arc<AtomicBool>,
}

/// Process-wide event bus.
pub struct EventBus {
    listeners: RwLock<HashMap<EventKind, Vec<Listener>>>,
    next_id: AtomicU64,
    published: AtomicU64,
    tracker: TaskTracker,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("published", &self.published.load(Ordering::Relaxed))
            .field("in_flight", &self.tracker.len())
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            published: AtomicU64::new(0),
            tracker: TaskTracker::new(),
        }
    }

    /// Register a synchronous handler for `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&DomainEvent) + Send + Sync + 'static,
    {
        self.add(kind, Handler::Sync(Arc::new(handler)), false)
    }

    /// Register an async handler for `kind`.
    ///
    /// Each invocation is spawned as its own task; `publish` never waits
    /// for it. Errors and panics are logged with the event name.
    pub fn subscribe_async<F, Fut>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(DomainEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<()>> + Send + 'static,
    {
        let handler: AsyncHandler = Arc::new(move |event| handler(event).boxed());
        self.add(kind, Handler::Async(handler), false)
    }

    /// Register a handler that fires on the next `kind` event only.
    pub fn subscribe_once<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnOnce(&DomainEvent) + Send + 'static,
    {
        let slot = Mutex::new(Some(handler));
        let wrapped = move |event: &DomainEvent| {
            let taken = slot.lock().ok().and_then(|mut guard| guard.take());
            if let Some(handler) = taken {
                handler(event);
            }
        };
        self.add(kind, Handler::Sync(Arc::new(wrapped)), true)
    }

    /// Wait for the next `kind` event.
    ///
    /// Fails with a timeout error when nothing arrives within `timeout`.
    /// The listener is removed in every case.
    pub async fn subscribe_once_with_timeout(
        &self,
        kind: EventKind,
        timeout: Duration,
    ) -> AppResult<DomainEvent> {
        let (tx, rx) = oneshot::channel();
        let id = self.subscribe_once(kind, move |event| {
            let _ = tx.send(event.clone());
        });

        let result = tokio::time::timeout(timeout, rx).await;
        self.unsubscribe(id);

        match result {
            Ok(Ok(event)) => Ok(event),
            Ok(Err(_)) => Err(AppError::service_unavailable(format!(
                "Event bus dropped the listener for {kind}"
            ))),
            Err(_) => Err(AppError::timeout(format!(
                "No {kind} event within {}ms",
                timeout.as_millis()
            ))),
        }
    }

    /// Remove a listener. Returns whether it existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut table = self.write_table();
        let mut removed = false;
        for listeners in table.values_mut() {
            let before = listeners.len();
            listeners.retain(|l| l.id != id);
            removed |= listeners.len() != before;
        }
        table.retain(|_, listeners| !listeners.is_empty());
        removed
    }

    /// Dispatch `event` to every listener of its kind.
    ///
    /// Returns `false` only when the handler table itself is unusable.
    pub fn publish(&self, event: DomainEvent) -> bool {
        let kind = event.kind();
        let snapshot = match self.listeners.read() {
            Ok(table) => table.get(&kind).cloned().unwrap_or_default(),
            Err(_) => {
                error!(event = %kind, "Event bus handler table is poisoned; event dropped");
                return false;
            }
        };
        self.published.fetch_add(1, Ordering::Relaxed);

        if snapshot.is_empty() {
            debug!(event = %kind, "No listeners for event");
            return true;
        }

        let mut spent = Vec::new();
        for listener in snapshot {
            if listener.once {
                if listener.fired.swap(true, Ordering::SeqCst) {
                    continue;
                }
                spent.push(listener.id);
            }

            match &listener.handler {
                Handler::Sync(handler) => {
                    if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                        error!(
                            event = %kind,
                            subscription = %listener.id,
                            panic = %panic_message(panic.as_ref()),
                            "Event handler panicked"
                        );
                    }
                }
                Handler::Async(handler) => {
                    match catch_unwind(AssertUnwindSafe(|| handler(event.clone()))) {
                        Ok(fut) => self.spawn_handler(kind, listener.id, fut),
                        Err(panic) => error!(
                            event = %kind,
                            subscription = %listener.id,
                            panic = %panic_message(panic.as_ref()),
                            "Async event handler panicked before start"
                        ),
                    }
                }
            }
        }

        if !spent.is_empty() {
            let mut table = self.write_table();
            if let Some(listeners) = table.get_mut(&kind) {
                listeners.retain(|l| !spent.contains(&l.id));
                if listeners.is_empty() {
                    table.remove(&kind);
                }
            }
        }

        true
    }

    /// Snapshot of listener counts and the publish counter.
    pub fn stats(&self) -> EventBusStats {
        let table = self.read_table();
        let per_event_counts: BTreeMap<EventKind, usize> = table
            .iter()
            .filter(|(_, listeners)| !listeners.is_empty())
            .map(|(kind, listeners)| (*kind, listeners.len()))
            .collect();

        EventBusStats {
            total_events: per_event_counts.len(),
            total_listeners: per_event_counts.values().sum(),
            per_event_counts,
            published: self.published.load(Ordering::Relaxed),
        }
    }

    /// Number of listeners registered for `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.read_table().get(&kind).map_or(0, Vec::len)
    }

    /// Detach every listener. Pending `subscribe_once_with_timeout` calls
    /// resolve with an error.
    pub fn remove_all(&self) {
        let mut table = self.write_table();
        let count: usize = table.values().map(Vec::len).sum();
        table.clear();
        drop(table);
        self.listeners.clear_poison();
        debug!(count, "All event listeners removed");
    }

    /// Wait until every spawned async handler has finished.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Detach every listener and drain in-flight async handlers.
    pub async fn shutdown(&self) {
        self.remove_all();
        self.tracker.close();
        self.tracker.wait().await;
        debug!("Event bus shut down");
    }

    fn add(&self, kind: EventKind, handler: Handler, once: bool) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.write_table().entry(kind).or_default().push(Listener {
            id,
            handler,
            once,
            fired: Arc::new(AtomicBool::new(false)),
        });
        debug!(event = %kind, subscription = %id, once, "Listener registered");
        id
    }

    fn spawn_handler(
        &self,
        kind: EventKind,
        id: SubscriptionId,
        fut: BoxFuture<'static, AppResult<()>>,
    ) {
        let Ok(runtime) = Handle::try_current() else {
            warn!(event = %kind, subscription = %id, "No async runtime; async handler skipped");
            return;
        };

        self.tracker.spawn_on(
            async move {
                match AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!(
                        event = %kind,
                        subscription = %id,
                        error = %e,
                        "Async event handler failed"
                    ),
                    Err(panic) => error!(
                        event = %kind,
                        subscription = %id,
                        panic = %panic_message(panic.as_ref()),
                        "Async event handler panicked"
                    ),
                }
            },
            &runtime,
        );
    }

    // Handlers never run under the lock, so poisoning can only come from a
    // panic in this module's own bookkeeping; mutation recovers the guard.
    fn write_table(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<EventKind, Vec<Listener>>> {
        self.listeners.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read_table(&self) -> std::sync::RwLockReadGuard<'_, HashMap<EventKind, Vec<Listener>>> {
        self.listeners.read().unwrap_or_else(|e| e.into_inner())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
