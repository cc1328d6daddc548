use dashmap::DashMap;
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::core::config::CoroutineConfig;
use crate::core::errors::{CoroError, Result};
use crate::coro::context::CoroutineContext;

/// Identity of one coroutine within a registry
pub type CoroutineId = u64;

/// Sentinel id for "not a coroutine" — the root execution context
pub const ROOT_ID: CoroutineId = 0;

/// The body of a coroutine, boxed so heterogeneous tasks share one registry
pub type TaskFuture = BoxFuture<'static, ()>;

type DeferFn = Box<dyn FnOnce() + Send + 'static>;

tokio::task_local! {
    static CURRENT_COROUTINE: CoroutineId;
}

/// Bookkeeping for one live coroutine
///
/// Removed from the registry table at termination; everything it owns
/// (context store, pending defers, a parked resume slot) goes with it.
struct CoroutineEntry {
    parent: CoroutineId,
    context: Arc<CoroutineContext>,
    defers: Mutex<Vec<DeferFn>>,
    resume_slot: Mutex<Option<oneshot::Sender<Value>>>,
}

/// The runtime-facing capability: allocates coroutine ids, tracks parent
/// links, owns per-coroutine state and parks/resumes suspended coroutines.
///
/// Instance-based so tests can run against a private registry; the
/// free-function surface in [`crate::functions`] uses a lazily created
/// process-wide default.
pub struct CoroutineRegistry {
    next_id: AtomicU64,
    entries: DashMap<CoroutineId, Arc<CoroutineEntry>>,
    config: RwLock<CoroutineConfig>,
}

impl CoroutineRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: DashMap::new(),
            config: RwLock::new(CoroutineConfig::default()),
        }
    }

    /// Schedule a task as a new coroutine and return its id.
    ///
    /// Fails with `ResourceExhaustion` when the configured coroutine cap is
    /// reached, or `Internal` when no tokio runtime is available (sync entry
    /// points should go through [`crate::run_in_root`]).
    pub fn spawn(self: &Arc<Self>, task: TaskFuture) -> Result<CoroutineId> {
        let max_coroutines = self.config.read().unwrap().max_coroutines;
        let active = self.entries.len();
        if active >= max_coroutines {
            return Err(CoroError::resource_exhausted(
                "coroutines",
                active as u64 + 1,
                max_coroutines as u64,
            ));
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            CoroError::internal("no tokio runtime on this thread; use run_in_root from sync code")
        })?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let parent = Self::current();
        let entry = Arc::new(CoroutineEntry {
            parent,
            context: Arc::new(CoroutineContext::new()),
            defers: Mutex::new(Vec::new()),
            resume_slot: Mutex::new(None),
        });
        self.entries.insert(id, entry);
        debug!(coroutine = id, parent, "spawning coroutine");

        let registry = Arc::clone(self);
        runtime.spawn(CURRENT_COROUTINE.scope(id, async move {
            // The guard tears the entry down and runs defers even if the
            // task panics or the runtime cancels it.
            let _scope = TerminationScope { registry, id };
            task.await;
        }));

        Ok(id)
    }

    /// Id of the coroutine executing the caller, `ROOT_ID` outside any
    pub fn current() -> CoroutineId {
        CURRENT_COROUTINE.try_with(|id| *id).unwrap_or(ROOT_ID)
    }

    /// Resolve a parent id.
    ///
    /// With an explicit id: `Destroyed` if the coroutine no longer exists.
    /// Without one: `NotInCoroutine` when the caller is not a coroutine.
    /// Top-level coroutines report `ROOT_ID` as their parent, so the result
    /// is never negative.
    pub fn parent_of(&self, id: Option<CoroutineId>) -> Result<CoroutineId> {
        match id {
            Some(id) => {
                let entry = self.entries.get(&id).ok_or(CoroError::Destroyed { id })?;
                Ok(entry.parent)
            }
            None => {
                let current = Self::current();
                if current == ROOT_ID {
                    return Err(CoroError::not_in_coroutine("parent_of"));
                }
                match self.entries.get(&current) {
                    Some(entry) => Ok(entry.parent),
                    // A task-local id from some other registry
                    None => Err(CoroError::not_in_coroutine("parent_of")),
                }
            }
        }
    }

    /// Swap the registry configuration; affects subsequently created coroutines
    pub fn configure(&self, config: CoroutineConfig) -> Result<()> {
        config.validate()?;
        *self.config.write().unwrap() = config;
        Ok(())
    }

    pub fn config(&self) -> CoroutineConfig {
        self.config.read().unwrap().clone()
    }

    /// Context store of the current coroutine, or of `id` when given.
    ///
    /// `None` for the root context and for dead ids; the store itself lives
    /// exactly as long as its coroutine.
    pub fn context_for(&self, id: Option<CoroutineId>) -> Option<Arc<CoroutineContext>> {
        let id = id.unwrap_or_else(Self::current);
        if id == ROOT_ID {
            return None;
        }
        self.entries.get(&id).map(|entry| Arc::clone(&entry.context))
    }

    /// Register a callback to run when the current coroutine terminates,
    /// LIFO relative to other defers of the same coroutine.
    pub fn defer<F>(&self, callback: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let current = Self::current();
        if current == ROOT_ID {
            return Err(CoroError::not_in_coroutine("defer"));
        }
        let entry = self
            .entries
            .get(&current)
            .ok_or_else(|| CoroError::not_in_coroutine("defer"))?;
        entry.defers.lock().unwrap().push(Box::new(callback));
        Ok(())
    }

    /// Park the current coroutine until [`resume`](Self::resume) wakes it,
    /// returning whatever value the resumer supplied. Suspension point.
    pub async fn yield_current(&self) -> Result<Value> {
        let current = Self::current();
        if current == ROOT_ID {
            return Err(CoroError::not_in_coroutine("yield_current"));
        }
        let receiver = {
            let entry = self
                .entries
                .get(&current)
                .ok_or_else(|| CoroError::not_in_coroutine("yield_current"))?;
            let (tx, rx) = oneshot::channel();
            *entry.resume_slot.lock().unwrap() = Some(tx);
            rx
            // entry guard dropped here, before the await
        };
        receiver
            .await
            .map_err(|_| CoroError::internal("coroutine was destroyed while suspended"))
    }

    /// Wake a parked coroutine with `value`.
    ///
    /// Returns false (no-op) when the id is dead or the coroutine is not
    /// currently suspended in `yield_current`.
    pub fn resume(&self, id: CoroutineId, value: Value) -> bool {
        let sender = match self.entries.get(&id) {
            Some(entry) => entry.resume_slot.lock().unwrap().take(),
            None => None,
        };
        match sender {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }

    pub fn is_alive(&self, id: CoroutineId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn active_count(&self) -> usize {
        self.entries.len()
    }
}

impl Default for CoroutineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs at coroutine termination: removes the registry entry (ending the
/// context store's lifetime) and fires deferred callbacks in LIFO order.
struct TerminationScope {
    registry: Arc<CoroutineRegistry>,
    id: CoroutineId,
}

impl Drop for TerminationScope {
    fn drop(&mut self) {
        if let Some((_, entry)) = self.registry.entries.remove(&self.id) {
            let mut defers = entry.defers.lock().unwrap();
            while let Some(defer) = defers.pop() {
                // A panicking defer must not take down the worker thread,
                // and must not stop the remaining defers.
                if std::panic::catch_unwind(std::panic::AssertUnwindSafe(defer)).is_err() {
                    warn!(coroutine = self.id, "deferred callback panicked");
                }
            }
        }
        debug!(coroutine = self.id, "coroutine terminated");
    }
}
