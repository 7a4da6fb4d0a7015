#[cfg(feature = "tokio")]
pub mod tokio;

use std::future::Future;

/// Runs transport work off the caller's thread.
///
/// Transports own the pool an operation executes on; the table core never
/// spawns anything itself.
pub trait Executor: Send + Sync + 'static {
    /// Spawn a detached task.
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
