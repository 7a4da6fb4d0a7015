use std::mem;

use super::ScanResultConsumer;
use crate::{error::TableError, future::Completer, result::RowResult};

/// Buffers every row and resolves a future once the scan ends.
pub(crate) struct CollectConsumer {
    rows: Vec<RowResult>,
    completer: Option<Completer<Vec<RowResult>>>,
}

impl CollectConsumer {
    pub(crate) fn new(completer: Completer<Vec<RowResult>>) -> Self {
        Self {
            rows: Vec::new(),
            completer: Some(completer),
        }
    }
}

impl ScanResultConsumer for CollectConsumer {
    fn on_next(&mut self, result: RowResult) -> bool {
        self.rows.push(result);
        true
    }

    fn on_error(&mut self, error: TableError) {
        if let Some(completer) = self.completer.take() {
            completer.fail(error);
        }
    }

    fn on_complete(&mut self) {
        if let Some(completer) = self.completer.take() {
            completer.resolve(mem::take(&mut self.rows));
        }
    }
}
