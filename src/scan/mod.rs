//! Push and pull delivery of scan results.
//!
//! A scan is driven by the transport, not pulled by the caller. Rows reach a
//! [`ScanResultConsumer`] one at a time, in key order, through a
//! [`ScanDriver`] that owns the termination contract:
//!
//! * `on_next` returning `false` stops the scan; nothing else is delivered.
//! * otherwise exactly one of `on_complete` or `on_error` ends the scan.
//!
//! [`ScanStream`] offers the same sequence as a bounded, non-restartable
//! [`Stream`](futures::Stream) whose drop is the cancellation point.

mod collect;
mod driver;
mod stream;

pub(crate) use self::collect::CollectConsumer;
pub use self::{driver::ScanDriver, stream::ScanStream};
use crate::{error::TableError, result::RowResult};

/// Caller-supplied logic receiving the rows of one scan.
///
/// Callbacks for one scan are never invoked concurrently.
pub trait ScanResultConsumer: Send + 'static {
    /// Receive the next row. Return `false` to stop the scan.
    fn on_next(&mut self, result: RowResult) -> bool;

    /// The scan hit an unrecoverable error and is over. `on_complete` will not follow.
    fn on_error(&mut self, error: TableError);

    /// Every matching row was delivered.
    fn on_complete(&mut self);
}

/// Lifecycle of a scan as seen by its driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanState {
    /// Rows may still be delivered.
    Streaming,
    /// All rows were delivered and `on_complete` fired.
    Completed,
    /// `on_error` fired.
    Errored,
    /// The consumer returned `false` or the stream reader went away; no terminal callback fires.
    Stopped,
}

impl ScanState {
    /// Whether no further callback can be delivered.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ScanState::Streaming)
    }
}
