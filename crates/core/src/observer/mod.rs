//! The Observer Bus (§4.5): turns CRDT commits into ordered per-table `add`/`update`/
//! `delete` events and dispatches them to every materializer observing that table.
//!
//! Single logical dispatcher per workspace (§5: "single-threaded cooperative within a
//! workspace"). Different rows may be dispatched concurrently (one `tokio` task per
//! row touched in a commit); a given row's events are always delivered to its
//! handlers in strict commit order, one handler at a time, in registration order
//! (§4.5, §5).

mod errors;

pub use errors::ObserverError;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::field::Value;
use crate::materializer::Materializer;

/// A single coalesced row change, converted from a [`crate::crdt::RowDelta`] into the
/// serialized-row shape materializer handlers expect (§4.3, §4.5).
#[derive(Debug, Clone)]
pub enum RowEvent {
    Add {
        table: String,
        id: String,
        row: HashMap<String, Value>,
    },
    Update {
        table: String,
        id: String,
        row: HashMap<String, Value>,
    },
    Delete { table: String, id: String },
}

impl RowEvent {
    pub fn table(&self) -> &str {
        match self {
            RowEvent::Add { table, .. } | RowEvent::Update { table, .. } | RowEvent::Delete { table, .. } => table,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            RowEvent::Add { id, .. } | RowEvent::Update { id, .. } | RowEvent::Delete { id, .. } => id,
        }
    }
}

/// Per-materializer, per-table failure counter (§7: "a per-materializer failure
/// counter is incremented" on handler error).
#[derive(Debug, Default)]
pub struct FailureCounters {
    counts: RwLock<HashMap<(String, String), u64>>,
}

impl FailureCounters {
    fn record(&self, materializer: &str, table: &str) -> u64 {
        let mut counts = self.counts.write().unwrap();
        let entry = counts.entry((materializer.to_string(), table.to_string())).or_insert(0);
        *entry += 1;
        *entry
    }

    pub fn get(&self, materializer: &str, table: &str) -> u64 {
        self.counts
            .read()
            .unwrap()
            .get(&(materializer.to_string(), table.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

/// Synchronous row-event callbacks registered via [`crate::table::Table::observe`]
/// (§4.4's `observe({ on_add, on_update, on_delete })`).
///
/// Distinct from a [`Materializer`]: these exist for in-process notification (a host
/// wanting to react to a change, e.g. to show a toast) rather than mirroring state into
/// an external store, so they are plain synchronous closures rather than async,
/// fallible handlers (§4.5: "a handler may be synchronous").
#[derive(Default)]
pub struct ObserverCallbacks {
    pub on_add: Option<Box<dyn Fn(&str, &HashMap<String, Value>) + Send + Sync>>,
    pub on_update: Option<Box<dyn Fn(&str, &HashMap<String, Value>) + Send + Sync>>,
    pub on_delete: Option<Box<dyn Fn(&str) + Send + Sync>>,
}

/// Single-threaded-per-workspace dispatcher from CRDT commits to materializer handlers
/// and ad-hoc [`ObserverCallbacks`] subscribers.
pub struct ObserverBus {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn Materializer>>>>,
    callbacks: RwLock<HashMap<String, Vec<(u64, Arc<ObserverCallbacks>)>>>,
    failures: Arc<FailureCounters>,
    commit_seq: AtomicU64,
    next_callback_id: AtomicU64,
}

impl Default for ObserverBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ObserverBus {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            callbacks: RwLock::new(HashMap::new()),
            failures: Arc::new(FailureCounters::default()),
            commit_seq: AtomicU64::new(0),
            next_callback_id: AtomicU64::new(0),
        }
    }

    pub fn failure_counters(&self) -> Arc<FailureCounters> {
        self.failures.clone()
    }

    /// Register `materializer` to observe `table` (§4.6: materializers install handlers
    /// via `observe` on each declared table). Registration order is dispatch order.
    pub fn register(&self, table: &str, materializer: Arc<dyn Materializer>) {
        self.handlers
            .write()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(materializer);
    }

    /// Register an ad-hoc [`ObserverCallbacks`] subscriber on `table` (§4.4 `Table::observe`),
    /// returning an opaque id for [`Self::unregister_callback`].
    pub fn register_callback(&self, table: &str, callbacks: ObserverCallbacks) -> u64 {
        let id = self.next_callback_id.fetch_add(1, Ordering::SeqCst);
        self.callbacks
            .write()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push((id, Arc::new(callbacks)));
        id
    }

    /// Undo a prior [`Self::register_callback`] (§4.4: `observe` returns an unsubscribe handle).
    pub fn unregister_callback(&self, table: &str, id: u64) {
        if let Some(list) = self.callbacks.write().unwrap().get_mut(table) {
            list.retain(|(cid, _)| *cid != id);
        }
    }

    fn handlers_for(&self, table: &str) -> Vec<Arc<dyn Materializer>> {
        self.handlers
            .read()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn callbacks_for(&self, table: &str) -> Vec<Arc<ObserverCallbacks>> {
        self.callbacks
            .read()
            .unwrap()
            .get(table)
            .map(|list| list.iter().map(|(_, c)| Arc::clone(c)).collect())
            .unwrap_or_default()
    }

    /// Dispatch one commit's events. Events for different rows run concurrently; a
    /// given row's handlers run sequentially, in registration order (§4.5, §5).
    pub async fn dispatch(&self, events: Vec<RowEvent>) {
        let commit = self.commit_seq.fetch_add(1, Ordering::SeqCst);
        let mut by_row: HashMap<(String, String), Vec<RowEvent>> = HashMap::new();
        let mut row_order: Vec<(String, String)> = Vec::new();
        for event in events {
            let key = (event.table().to_string(), event.id().to_string());
            if !by_row.contains_key(&key) {
                row_order.push(key.clone());
            }
            by_row.entry(key).or_default().push(event);
        }

        let mut join_set = tokio::task::JoinSet::new();
        for key in row_order {
            let events = by_row.remove(&key).unwrap_or_default();
            let handlers = self.handlers_for(&key.0);
            let callbacks = self.callbacks_for(&key.0);
            let failures = self.failures.clone();
            join_set.spawn(async move {
                for event in events {
                    dispatch_one_row_event(&handlers, &callbacks, &failures, commit, event).await;
                }
            });
        }
        while join_set.join_next().await.is_some() {}
    }
}

async fn dispatch_one_row_event(
    handlers: &[Arc<dyn Materializer>],
    callbacks: &[Arc<ObserverCallbacks>],
    failures: &FailureCounters,
    commit: u64,
    event: RowEvent,
) {
    for handler in handlers {
        let result = match &event {
            RowEvent::Add { table, id, row } => handler.on_add(table, id, row).await,
            RowEvent::Update { table, id, row } => handler.on_update(table, id, row).await,
            RowEvent::Delete { table, id } => handler.on_delete(table, id).await,
        };
        if let Err(err) = result {
            let count = failures.record(handler.name(), event.table());
            tracing::warn!(
                commit,
                materializer = handler.name(),
                table = event.table(),
                id = event.id(),
                failure_count = count,
                error = %err,
                "materializer handler failed"
            );
        }
    }
    for callback in callbacks {
        match &event {
            RowEvent::Add { id, row, .. } => {
                if let Some(f) = &callback.on_add {
                    f(id, row);
                }
            }
            RowEvent::Update { id, row, .. } => {
                if let Some(f) = &callback.on_update {
                    f(id, row);
                }
            }
            RowEvent::Delete { id, .. } => {
                if let Some(f) = &callback.on_delete {
                    f(id);
                }
            }
        }
    }
}
