//! Common test utilities for integration tests.
#![allow(dead_code)]

use std::time::Duration;

use async_table::{
    executor::tokio::TokioExecutor, mem::MemTransport, AsyncConnection, AsyncTable, RowResult,
    ScanResultConsumer, TableError, TableName, TableOptions,
};
use bytes::Bytes;

pub const FAMILY: &[u8] = b"cf";
pub const QUALIFIER: &[u8] = b"cq";

pub type MemConnection = AsyncConnection<MemTransport<TokioExecutor>>;
pub type MemTable = AsyncTable<MemTransport<TokioExecutor>>;

/// Fresh store with one table holding the `cf` family, plus a connection to it.
///
/// Must be called from inside a tokio runtime.
pub fn fixture() -> (MemConnection, MemTable) {
    fixture_with_options(TableOptions::default())
}

pub fn fixture_with_options(options: TableOptions) -> (MemConnection, MemTable) {
    let transport = MemTransport::new(TokioExecutor::default());
    let name = TableName::new("async").expect("valid table name");
    transport
        .create_table(name.clone(), [FAMILY])
        .expect("fresh store has no tables");
    let conn = AsyncConnection::with_options(transport, options);
    let table = conn.table(name);
    (conn, table)
}

pub fn random_value(len: usize) -> Bytes {
    let mut value = vec![0u8; len];
    fastrand::fill(&mut value);
    Bytes::from(value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    Next(Bytes),
    Error(TableError),
    Complete,
}

/// Consumer forwarding every callback into a channel, optionally stopping
/// after a fixed number of rows.
pub struct RecordingConsumer {
    events: flume::Sender<ScanEvent>,
    stop_after: Option<usize>,
    seen: usize,
}

impl RecordingConsumer {
    pub fn new(stop_after: Option<usize>) -> (Self, flume::Receiver<ScanEvent>) {
        let (events, receiver) = flume::unbounded();
        (
            Self {
                events,
                stop_after,
                seen: 0,
            },
            receiver,
        )
    }
}

impl ScanResultConsumer for RecordingConsumer {
    fn on_next(&mut self, result: RowResult) -> bool {
        self.seen += 1;
        let _ = self.events.send(ScanEvent::Next(result.row().clone()));
        self.stop_after.map_or(true, |limit| self.seen < limit)
    }

    fn on_error(&mut self, error: TableError) {
        let _ = self.events.send(ScanEvent::Error(error));
    }

    fn on_complete(&mut self) {
        let _ = self.events.send(ScanEvent::Complete);
    }
}

/// Collect events until the consumer has been dropped by the scan, or until
/// `quiet` passes without a new event.
pub async fn drain(events: &flume::Receiver<ScanEvent>, quiet: Duration) -> Vec<ScanEvent> {
    let mut collected = Vec::new();
    while let Ok(Ok(event)) = tokio::time::timeout(quiet, events.recv_async()).await {
        collected.push(event);
    }
    collected
}
