use std::future::Future;
use std::sync::Arc;

use crate::core::errors::{CoroError, Result};
use crate::coro::registry::{CoroutineId, CoroutineRegistry, TaskFuture};

/// Created-once identity object wrapping one scheduled coroutine.
///
/// Holds the task until [`schedule`](Self::schedule) hands it to the
/// registry; afterwards it holds only the id needed to query the coroutine.
/// The handle does not own the coroutine's execution, which runs (and may
/// terminate) independently of the handle's lifetime.
pub struct CoroutineHandle {
    task: Option<TaskFuture>,
    id: Option<CoroutineId>,
}

impl CoroutineHandle {
    /// Store the task without scheduling it. No side effects.
    pub fn new<F>(task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            task: Some(Box::pin(task)),
            id: None,
        }
    }

    /// Construct and schedule in one call.
    ///
    /// The error carries the scheduling-failure reason (coroutine cap hit,
    /// no runtime on this thread) instead of collapsing it to a boolean.
    pub fn create<F>(registry: &Arc<CoroutineRegistry>, task: F) -> Result<Self>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut handle = Self::new(task);
        handle.schedule(registry)?;
        Ok(handle)
    }

    /// Hand the stored task to the registry and record the id.
    ///
    /// The id is assigned exactly once; scheduling an already-scheduled
    /// handle returns the existing id.
    pub fn schedule(&mut self, registry: &Arc<CoroutineRegistry>) -> Result<CoroutineId> {
        if let Some(id) = self.id {
            return Ok(id);
        }
        let task = self.task.take().ok_or(CoroError::Unscheduled)?;
        let id = registry.spawn(task)?;
        self.id = Some(id);
        Ok(id)
    }

    /// The scheduled coroutine's id; `Unscheduled` before [`schedule`](Self::schedule).
    pub fn id(&self) -> Result<CoroutineId> {
        self.id.ok_or(CoroError::Unscheduled)
    }

    pub fn is_scheduled(&self) -> bool {
        self.id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_before_schedule_fails() {
        let handle = CoroutineHandle::new(async {});
        assert!(!handle.is_scheduled());
        assert!(matches!(handle.id(), Err(CoroError::Unscheduled)));
    }

    #[tokio::test]
    async fn test_id_stable_after_schedule() {
        let registry = Arc::new(CoroutineRegistry::new());
        let mut handle = CoroutineHandle::new(async {});
        let id = handle.schedule(&registry).unwrap();

        assert!(handle.is_scheduled());
        assert_eq!(handle.id().unwrap(), id);
        assert_eq!(handle.id().unwrap(), id);
        // Re-scheduling does not reassign the id
        assert_eq!(handle.schedule(&registry).unwrap(), id);
    }

    #[tokio::test]
    async fn test_create_schedules_immediately() {
        let registry = Arc::new(CoroutineRegistry::new());
        let handle = CoroutineHandle::create(&registry, async {}).unwrap();
        assert!(handle.id().is_ok());
    }
}
