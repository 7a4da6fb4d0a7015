use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use log::Level;

use super::{ScanResultConsumer, ScanState};
use crate::{
    error::{TableError, TableResult},
    id::ScanId,
    logging::table_log,
    result::RowResult,
    table_name::TableName,
};

enum Sink {
    Consumer(Box<dyn ScanResultConsumer>),
    Channel {
        sender: flume::Sender<TableResult<RowResult>>,
        /// Set right before a clean end; a reader seeing the channel close without it
        /// reports [`TableError::Abandoned`].
        completed: Arc<AtomicBool>,
    },
}

/// Core-owned state machine a transport calls to deliver one scan.
///
/// The terminal calls consume the driver, so a transport cannot signal the end
/// of a scan twice. Rows offered after the consumer stopped are dropped, and a
/// driver dropped while still streaming reports [`TableError::Abandoned`] so
/// the consumer always learns that the scan ended.
pub struct ScanDriver {
    id: ScanId,
    table: TableName,
    state: ScanState,
    delivered: usize,
    sink: Option<Sink>,
}

impl ScanDriver {
    pub(crate) fn for_consumer(
        id: ScanId,
        table: TableName,
        consumer: Box<dyn ScanResultConsumer>,
    ) -> Self {
        Self::new(id, table, Sink::Consumer(consumer))
    }

    pub(crate) fn for_channel(
        id: ScanId,
        table: TableName,
        sender: flume::Sender<TableResult<RowResult>>,
        completed: Arc<AtomicBool>,
    ) -> Self {
        Self::new(id, table, Sink::Channel { sender, completed })
    }

    fn new(id: ScanId, table: TableName, sink: Sink) -> Self {
        Self {
            id,
            table,
            state: ScanState::Streaming,
            delivered: 0,
            sink: Some(sink),
        }
    }

    /// Identifier of this scan.
    pub fn id(&self) -> ScanId {
        self.id
    }

    /// Table being scanned.
    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Rows handed to the consumer so far.
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Deliver the next row. `false` means the transport must stop fetching.
    ///
    /// For stream-backed scans this waits while the reader's buffer is full.
    pub async fn on_next(&mut self, result: RowResult) -> bool {
        if self.state != ScanState::Streaming {
            table_log!(
                Level::Warn,
                table: self.table,
                "scan_next_after_end",
                "scan={} state={:?}",
                self.id,
                self.state
            );
            return false;
        }
        let accepted = match &mut self.sink {
            Some(Sink::Consumer(consumer)) => {
                self.delivered += 1;
                consumer.on_next(result)
            }
            Some(Sink::Channel { sender, .. }) => {
                let sent = sender.send_async(Ok(result)).await.is_ok();
                if sent {
                    self.delivered += 1;
                }
                sent
            }
            None => false,
        };
        if !accepted {
            self.state = ScanState::Stopped;
            self.sink = None;
            table_log!(
                Level::Debug,
                table: self.table,
                "scan_stopped",
                "scan={} delivered={}",
                self.id,
                self.delivered
            );
        }
        accepted
    }

    /// End the scan with an error.
    pub async fn on_error(mut self, error: TableError) {
        if !self.begin_terminal("on_error") {
            return;
        }
        self.state = ScanState::Errored;
        table_log!(
            Level::Debug,
            table: self.table,
            "scan_errored",
            "scan={} delivered={} error={}",
            self.id,
            self.delivered,
            error
        );
        match self.sink.take() {
            Some(Sink::Consumer(mut consumer)) => consumer.on_error(error),
            Some(Sink::Channel { sender, .. }) => {
                let _ = sender.send_async(Err(error)).await;
            }
            None => {}
        }
    }

    /// End the scan normally.
    pub async fn on_complete(mut self) {
        if !self.begin_terminal("on_complete") {
            return;
        }
        self.state = ScanState::Completed;
        table_log!(
            Level::Debug,
            table: self.table,
            "scan_completed",
            "scan={} delivered={}",
            self.id,
            self.delivered
        );
        match self.sink.take() {
            Some(Sink::Consumer(mut consumer)) => consumer.on_complete(),
            // The flag is set before the sender drops and ends the reader's stream.
            Some(Sink::Channel { completed, .. }) => completed.store(true, Ordering::Release),
            None => {}
        }
    }

    /// Fail a scan that never reached the transport.
    pub(crate) fn reject(mut self, error: TableError) {
        self.state = ScanState::Errored;
        self.deliver_error_now(error);
    }

    fn begin_terminal(&self, callback: &'static str) -> bool {
        match self.state {
            ScanState::Streaming => true,
            ScanState::Stopped => {
                table_log!(
                    Level::Debug,
                    table: self.table,
                    "scan_terminal_suppressed",
                    "scan={} callback={}",
                    self.id,
                    callback
                );
                false
            }
            ScanState::Completed | ScanState::Errored => {
                table_log!(
                    Level::Warn,
                    table: self.table,
                    "scan_terminal_repeated",
                    "scan={} callback={} state={:?}",
                    self.id,
                    callback,
                    self.state
                );
                false
            }
        }
    }

    fn deliver_error_now(&mut self, error: TableError) {
        match self.sink.take() {
            Some(Sink::Consumer(mut consumer)) => consumer.on_error(error),
            // A full buffer drops the error; the reader then sees the channel
            // close without completion and reports `Abandoned` itself.
            Some(Sink::Channel { sender, .. }) => {
                let _ = sender.try_send(Err(error));
            }
            None => {}
        }
    }
}

impl Drop for ScanDriver {
    fn drop(&mut self) {
        if self.state == ScanState::Streaming {
            self.state = ScanState::Errored;
            table_log!(
                Level::Warn,
                table: self.table,
                "scan_abandoned",
                "scan={} delivered={}",
                self.id,
                self.delivered
            );
            self.deliver_error_now(TableError::Abandoned);
        }
    }
}

impl fmt::Debug for ScanDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanDriver")
            .field("id", &self.id)
            .field("table", &self.table)
            .field("state", &self.state)
            .field("delivered", &self.delivered)
            .finish()
    }
}
