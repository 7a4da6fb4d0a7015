//! Tokio-backed [`Executor`].

use std::future::Future;

use tokio::runtime::Handle;

use super::Executor;

/// Spawns onto a tokio runtime.
#[derive(Clone, Debug)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    /// Spawn onto the runtime behind `handle`.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }
}

impl Default for TokioExecutor {
    /// Bind to the runtime of the calling context.
    ///
    /// Panics when called outside of a tokio runtime.
    fn default() -> Self {
        Self {
            handle: Handle::current(),
        }
    }
}

impl Executor for TokioExecutor {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        drop(self.handle.spawn(future));
    }
}
