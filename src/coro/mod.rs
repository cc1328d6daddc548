pub mod context;
pub mod handle;
pub mod registry;

pub use context::CoroutineContext;
pub use handle::CoroutineHandle;
pub use registry::{CoroutineId, CoroutineRegistry, TaskFuture, ROOT_ID};
