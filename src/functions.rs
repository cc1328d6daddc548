//! Free-function surface over the process-default registry.
//!
//! The rest of the system consumes this layer through these helpers; code
//! that needs an isolated registry (tests, embedded schedulers) uses the
//! instance API on [`CoroutineRegistry`] directly.

use lazy_static::lazy_static;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::core::config::CoroutineConfig;
use crate::core::errors::{CoroError, Result};
use crate::coro::context::CoroutineContext;
use crate::coro::handle::CoroutineHandle;
use crate::coro::registry::{CoroutineId, CoroutineRegistry, TaskFuture};
use crate::parallel::executor::{ParallelExecutor, ParallelTask, DEFAULT_CONCURRENCY};

lazy_static! {
    static ref GLOBAL_REGISTRY: Arc<CoroutineRegistry> = Arc::new(CoroutineRegistry::new());
}

/// The process-default registry backing the free functions
pub fn global_registry() -> Arc<CoroutineRegistry> {
    Arc::clone(&GLOBAL_REGISTRY)
}

/// Create and schedule a coroutine in one call.
///
/// The returned handle carries the new coroutine's id; the error carries
/// the scheduling-failure reason.
pub fn go<F>(task: F) -> Result<CoroutineHandle>
where
    F: Future<Output = ()> + Send + 'static,
{
    CoroutineHandle::create(&global_registry(), task)
}

/// Id of the currently executing coroutine, [`ROOT_ID`](crate::ROOT_ID) outside any
pub fn current_id() -> CoroutineId {
    CoroutineRegistry::current()
}

/// Parent id of `id`, or of the current coroutine when `id` is `None`
pub fn parent_id(id: Option<CoroutineId>) -> Result<CoroutineId> {
    GLOBAL_REGISTRY.parent_of(id)
}

/// Context store of the current coroutine, or of `id` when given
pub fn context_for(id: Option<CoroutineId>) -> Option<Arc<CoroutineContext>> {
    GLOBAL_REGISTRY.context_for(id)
}

/// Reconfigure the process-default registry
pub fn configure(config: CoroutineConfig) -> Result<()> {
    GLOBAL_REGISTRY.configure(config)
}

/// Run `callback` when the current coroutine terminates (LIFO)
pub fn defer<F>(callback: F) -> Result<()>
where
    F: FnOnce() + Send + 'static,
{
    GLOBAL_REGISTRY.defer(callback)
}

/// Park the current coroutine until [`resume`] wakes it
pub async fn yield_current() -> Result<Value> {
    GLOBAL_REGISTRY.yield_current().await
}

/// Wake a parked coroutine; false when it is dead or not suspended
pub fn resume(id: CoroutineId, value: Value) -> bool {
    GLOBAL_REGISTRY.resume(id, value)
}

/// Run a batch of independent tasks with bounded concurrency and collect
/// the successful results. See [`ParallelExecutor::run_all`].
pub async fn run_parallel(tasks: Vec<ParallelTask>, concurrency: usize) -> Result<Vec<Value>> {
    ParallelExecutor::new(global_registry())
        .run_all(tasks, concurrency)
        .await
}

/// Which runtime drivers a root run enables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootHooks {
    pub io: bool,
    pub time: bool,
}

impl RootHooks {
    pub fn all() -> Self {
        Self { io: true, time: true }
    }

    pub fn none() -> Self {
        Self {
            io: false,
            time: false,
        }
    }
}

impl Default for RootHooks {
    fn default() -> Self {
        Self::all()
    }
}

/// Bridge a non-coroutine entry point into the coroutine runtime.
///
/// Builds a current-thread runtime with the drivers `hooks` selects (and the
/// configured stack size for any threads it spawns), runs every callback as a
/// coroutine of the process-default registry, waits for all of them, then
/// tears the runtime down. Returns `Ok(true)` once every callback has
/// completed.
pub fn run_in_root<I>(callbacks: I, hooks: RootHooks) -> Result<bool>
where
    I: IntoIterator<Item = TaskFuture>,
{
    let mut builder = tokio::runtime::Builder::new_current_thread();
    builder.thread_stack_size(GLOBAL_REGISTRY.config().stack_size_bytes);
    if hooks.io {
        builder.enable_io();
    }
    if hooks.time {
        builder.enable_time();
    }
    let runtime = builder
        .build()
        .map_err(|source| CoroError::io("building root runtime", source))?;

    let tasks: Vec<ParallelTask> = callbacks
        .into_iter()
        .map(|task| -> ParallelTask {
            Box::pin(async move {
                task.await;
                Ok(Value::Null)
            })
        })
        .collect();

    runtime.block_on(async move {
        ParallelExecutor::new(global_registry())
            .run_all(tasks, DEFAULT_CONCURRENCY)
            .await
    })?;

    Ok(true)
}
