pub mod executor;
pub mod sink;

pub use executor::{ParallelExecutor, ParallelTask, DEFAULT_CONCURRENCY};
pub use sink::{CollectingSink, ErrorSink, TracingSink};
