//! 发送单元的执行、重试与 worker 池

pub mod executor;
pub mod pool;
pub mod retry;

pub use executor::{FailureInjector, UnitExecutor};
pub use pool::{WorkerPool, WorkerPoolHandle};
pub use retry::RetryPolicy;
