use std::sync::Mutex;
use tracing::error;

/// Where individual task failures from a parallel batch end up.
///
/// Failures never propagate to the batch caller; they are handed here with
/// the submission index of the failed task.
pub trait ErrorSink: Send + Sync {
    fn report(&self, task_index: usize, error: &anyhow::Error);
}

/// Default sink: structured log via `tracing`
#[derive(Debug, Default)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, task_index: usize, error: &anyhow::Error) {
        error!(task_index, error = %error, "parallel task failed");
    }
}

/// Test sink that records every report
#[derive(Debug, Default)]
pub struct CollectingSink {
    reports: Mutex<Vec<(usize, String)>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(usize, String)> {
        self.reports.lock().unwrap().clone()
    }
}

impl ErrorSink for CollectingSink {
    fn report(&self, task_index: usize, error: &anyhow::Error) {
        self.reports
            .lock()
            .unwrap()
            .push((task_index, error.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_collecting_sink_records_reports() {
        let sink = CollectingSink::new();
        sink.report(2, &anyhow!("boom"));
        sink.report(0, &anyhow!("bang"));

        let reports = sink.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0], (2, "boom".to_string()));
        assert_eq!(reports[1], (0, "bang".to_string()));
    }
}
