// Core infrastructure modules
pub mod core {
    pub mod config;
    pub mod errors;
}

// Coroutine identity, context and lifecycle
pub mod coro;
// Bounded fan-out/fan-in execution
pub mod parallel;
// Free-function surface over the process-default registry
pub mod functions;

// Re-exports for convenience
pub use crate::core::config::CoroutineConfig;
pub use crate::core::errors::{CoroError, Result};
pub use crate::coro::{
    CoroutineContext, CoroutineHandle, CoroutineId, CoroutineRegistry, TaskFuture, ROOT_ID,
};
pub use crate::functions::{
    configure, context_for, current_id, defer, global_registry, go, parent_id, resume,
    run_in_root, run_parallel, yield_current, RootHooks,
};
pub use crate::parallel::{
    CollectingSink, ErrorSink, ParallelExecutor, ParallelTask, TracingSink, DEFAULT_CONCURRENCY,
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_end_to_end_batch_on_private_registry() {
        let registry = Arc::new(CoroutineRegistry::new());
        let sink = Arc::new(CollectingSink::new());
        let executor = ParallelExecutor::with_sink(Arc::clone(&registry), Arc::clone(&sink));

        let tasks: Vec<ParallelTask> = vec![
            Box::pin(async { Ok(json!(1)) }),
            Box::pin(async { Err(anyhow::anyhow!("expected failure")) }),
            Box::pin(async { Ok(json!(3)) }),
        ];
        let mut results = executor.run_all(tasks, 2).await.unwrap();
        results.sort_by_key(|value| value.as_i64());

        assert_eq!(results, vec![json!(1), json!(3)]);
        assert_eq!(sink.reports().len(), 1);
        // Batch finished: no coroutines left behind
        assert_eq!(registry.active_count(), 0);
    }
}
