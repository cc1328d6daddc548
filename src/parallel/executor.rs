use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::debug;

use crate::core::errors::{CoroError, Result};
use crate::coro::registry::CoroutineRegistry;
use crate::parallel::sink::{ErrorSink, TracingSink};

/// One independent unit of work in a parallel batch
pub type ParallelTask = BoxFuture<'static, anyhow::Result<Value>>;

/// Default admission-control limit for a batch
pub const DEFAULT_CONCURRENCY: usize = 30;

/// Bounded fan-out/fan-in over registry coroutines.
///
/// Every task is scheduled immediately, in submission order; a semaphore
/// bounds how many task bodies run at once. The caller blocks until each
/// task has signalled completion exactly once, then receives the successful
/// results in completion order. One task's failure never aborts the batch
/// and never reaches the caller; it goes to the [`ErrorSink`].
pub struct ParallelExecutor {
    registry: Arc<CoroutineRegistry>,
    sink: Arc<dyn ErrorSink>,
}

impl ParallelExecutor {
    pub fn new(registry: Arc<CoroutineRegistry>) -> Self {
        Self {
            registry,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink<S>(registry: Arc<CoroutineRegistry>, sink: Arc<S>) -> Self
    where
        S: ErrorSink + 'static,
    {
        let sink: Arc<dyn ErrorSink> = sink;
        Self { registry, sink }
    }

    /// Run a batch with [`DEFAULT_CONCURRENCY`]
    pub async fn run(&self, tasks: Vec<ParallelTask>) -> Result<Vec<Value>> {
        self.run_all(tasks, DEFAULT_CONCURRENCY).await
    }

    /// Run a batch of independent tasks and collect the successful results.
    ///
    /// Returns only on a batch-level wait failure; individual task failures
    /// reduce the result count instead. Tasks that never return block the
    /// batch forever; no timeout is imposed here.
    pub async fn run_all(&self, tasks: Vec<ParallelTask>, concurrency: usize) -> Result<Vec<Value>> {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let total = tasks.len();
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let (tx, mut rx) = mpsc::unbounded_channel::<Option<Value>>();

        debug!(total, concurrency, "launching parallel batch");

        let mut scheduled = 0usize;
        for (index, task) in tasks.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let sink = Arc::clone(&self.sink);
            let tx = tx.clone();

            let spawned = self.registry.spawn(Box::pin(async move {
                let outcome = match semaphore.acquire_owned().await {
                    // Permit held for the task body; a panicking task is
                    // contained here so its completion signal still goes out.
                    Ok(_permit) => match AssertUnwindSafe(task).catch_unwind().await {
                        Ok(outcome) => outcome,
                        Err(panic) => Err(anyhow::anyhow!(
                            "task panicked: {}",
                            panic_message(&panic)
                        )),
                    },
                    Err(_) => Err(anyhow::anyhow!("admission semaphore closed")),
                };
                let message = match outcome {
                    Ok(value) => Some(value),
                    Err(error) => {
                        sink.report(index, &error);
                        None
                    }
                };
                // Exactly one completion signal per task, success or not
                let _ = tx.send(message);
            }));

            match spawned {
                Ok(_) => scheduled += 1,
                // Scheduling failures are isolated like task failures:
                // reported, and excluded from the countdown.
                Err(error) => self.sink.report(index, &anyhow::Error::new(error)),
            }
        }
        drop(tx);

        let mut results = Vec::with_capacity(scheduled);
        let mut completed = 0usize;
        while completed < scheduled {
            match rx.recv().await {
                Some(Some(value)) => {
                    results.push(value);
                    completed += 1;
                }
                Some(None) => completed += 1,
                None => {
                    return Err(CoroError::internal(
                        "completion channel closed before the batch finished",
                    ))
                }
            }
        }

        debug!(
            total,
            collected = results.len(),
            "parallel batch complete"
        );
        Ok(results)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;

    #[tokio::test]
    async fn test_scheduling_failure_is_isolated() {
        let registry = Arc::new(CoroutineRegistry::new());
        registry
            .configure(crate::CoroutineConfig {
                max_coroutines: 2,
                ..crate::CoroutineConfig::default()
            })
            .unwrap();

        let sink = Arc::new(crate::CollectingSink::new());
        let executor = ParallelExecutor::with_sink(Arc::clone(&registry), Arc::clone(&sink));

        // Three tasks against a cap of two live coroutines; at least the
        // first two run (completed ones free their slots, so the third may
        // or may not be admitted).
        let tasks: Vec<ParallelTask> = (0..3)
            .map(|i| -> ParallelTask { Box::pin(async move { Ok(json!(i)) }) })
            .collect();
        let results = executor.run_all(tasks, DEFAULT_CONCURRENCY).await.unwrap();

        assert_eq!(results.len() + sink.reports().len(), 3);
        assert!(results.len() >= 2);
    }

    #[tokio::test]
    async fn test_failure_reports_carry_submission_index() {
        let registry = Arc::new(CoroutineRegistry::new());
        let sink = Arc::new(crate::CollectingSink::new());
        let executor = ParallelExecutor::with_sink(registry, Arc::clone(&sink));

        let tasks: Vec<ParallelTask> = vec![
            Box::pin(async { Ok(json!("ok")) }),
            Box::pin(async { Err(anyhow!("task two failed")) }),
        ];
        let results = executor.run_all(tasks, 2).await.unwrap();

        assert_eq!(results, vec![json!("ok")]);
        assert_eq!(sink.reports(), vec![(1, "task two failed".to_string())]);
    }
}
