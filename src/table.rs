use std::sync::{atomic::AtomicBool, Arc};

use bytes::Bytes;
use log::Level;

use crate::{
    connection::ConnectionShared,
    error::{TableError, TableResult},
    future::{pending, OperationFuture},
    id::ScanId,
    logging::table_log,
    request::{Append, CheckAndMutate, Delete, Get, Increment, Put, Scan},
    result::RowResult,
    scan::{CollectConsumer, ScanDriver, ScanResultConsumer, ScanStream},
    table_name::TableName,
    transport::{Request, Response, Transport},
};

/// Non-blocking dispatcher for operations against one table.
///
/// Every method returns immediately. Requests that fail client-side
/// validation come back as an already-failed future and never reach the
/// transport. Any number of operations may be outstanding at once, including
/// several against the same row; their futures complete independently and in
/// no particular order.
pub struct AsyncTable<T: Transport> {
    name: TableName,
    transport: Arc<T>,
    shared: Arc<ConnectionShared>,
}

impl<T: Transport> Clone for AsyncTable<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            transport: Arc::clone(&self.transport),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Transport> AsyncTable<T> {
    pub(crate) fn new(name: TableName, transport: Arc<T>, shared: Arc<ConnectionShared>) -> Self {
        Self {
            name,
            transport,
            shared,
        }
    }

    /// Table this handle addresses.
    pub fn name(&self) -> &TableName {
        &self.name
    }

    /// Write the cells of `put`.
    pub fn put(&self, put: Put) -> OperationFuture<()> {
        self.submit(Request::Put(put))
            .try_map(|response| expect_mutated("put", response))
    }

    /// Read a row. Missing rows and rows without matching cells both yield an empty result.
    pub fn get(&self, get: Get) -> OperationFuture<RowResult> {
        self.submit(Request::Get(get))
            .try_map(|response| expect_row("get", response))
    }

    /// Remove the row, families or columns named by `delete`.
    pub fn delete(&self, delete: Delete) -> OperationFuture<()> {
        self.submit(Request::Delete(delete))
            .try_map(|response| expect_mutated("delete", response))
    }

    /// Whether at least one requested cell is present, without transferring values.
    pub fn exists(&self, get: Get) -> OperationFuture<bool> {
        self.submit(Request::Exists(get))
            .try_map(|response| match response {
                Response::Exists(found) => Ok(found),
                other => Err(other.unexpected("exists")),
            })
    }

    /// Atomically add `delta` to the counter at `family:qualifier`, returning the new value.
    ///
    /// An absent counter starts from zero.
    pub fn increment_column_value(
        &self,
        row: impl Into<Bytes>,
        family: impl Into<Bytes>,
        qualifier: impl Into<Bytes>,
        delta: i64,
    ) -> OperationFuture<i64> {
        let family = family.into();
        let qualifier = qualifier.into();
        let increment = Increment::new(row).add_column(family.clone(), qualifier.clone(), delta);
        self.submit(Request::Increment(increment))
            .try_map(move |response| {
                expect_row("increment", response)?
                    .value_as_i64(&family, &qualifier)?
                    .ok_or(TableError::UnexpectedResponse {
                        op: "increment",
                        response: "row without counter",
                    })
            })
    }

    /// Atomically apply every delta of `increment`; the result holds the new counter values.
    pub fn increment(&self, increment: Increment) -> OperationFuture<RowResult> {
        self.submit(Request::Increment(increment))
            .try_map(|response| expect_row("increment", response))
    }

    /// Atomically concatenate onto existing values; the result holds the values right after
    /// this append.
    pub fn append(&self, append: Append) -> OperationFuture<RowResult> {
        self.submit(Request::Append(append))
            .try_map(|response| expect_row("append", response))
    }

    /// Apply `put` only if `family:qualifier` of `row` holds `expected` (`None`: is absent).
    ///
    /// Resolves to whether the put was applied.
    pub fn check_and_put(
        &self,
        row: impl Into<Bytes>,
        family: impl Into<Bytes>,
        qualifier: impl Into<Bytes>,
        expected: Option<Bytes>,
        put: Put,
    ) -> OperationFuture<bool> {
        self.check_and_mutate(CheckAndMutate::new(row, family, qualifier, expected, put))
    }

    /// Apply `delete` only if `family:qualifier` of `row` holds `expected` (`None`: is absent).
    ///
    /// Resolves to whether the delete was applied.
    pub fn check_and_delete(
        &self,
        row: impl Into<Bytes>,
        family: impl Into<Bytes>,
        qualifier: impl Into<Bytes>,
        expected: Option<Bytes>,
        delete: Delete,
    ) -> OperationFuture<bool> {
        self.check_and_mutate(CheckAndMutate::new(row, family, qualifier, expected, delete))
    }

    /// Apply a prepared check-and-mutate.
    pub fn check_and_mutate(&self, check: CheckAndMutate) -> OperationFuture<bool> {
        self.submit(Request::CheckAndMutate(check))
            .try_map(|response| match response {
                Response::Checked(applied) => Ok(applied),
                other => Err(other.unexpected("check_and_mutate")),
            })
    }

    /// Submit one `get` per descriptor; futures come back in input order.
    pub fn get_many(&self, gets: impl IntoIterator<Item = Get>) -> Vec<OperationFuture<RowResult>> {
        gets.into_iter().map(|get| self.get(get)).collect()
    }

    /// Submit one `exists` per descriptor; futures come back in input order.
    pub fn exists_many(&self, gets: impl IntoIterator<Item = Get>) -> Vec<OperationFuture<bool>> {
        gets.into_iter().map(|get| self.exists(get)).collect()
    }

    /// Submit one `put` per descriptor; futures come back in input order.
    pub fn put_many(&self, puts: impl IntoIterator<Item = Put>) -> Vec<OperationFuture<()>> {
        puts.into_iter().map(|put| self.put(put)).collect()
    }

    /// Submit one `delete` per descriptor; futures come back in input order.
    pub fn delete_many(
        &self,
        deletes: impl IntoIterator<Item = Delete>,
    ) -> Vec<OperationFuture<()>> {
        deletes.into_iter().map(|delete| self.delete(delete)).collect()
    }

    /// Push every row matched by `scan` to `consumer`.
    ///
    /// Returns immediately; the transport calls back from its own task.
    pub fn scan<C>(&self, scan: Scan, consumer: C) -> ScanId
    where
        C: ScanResultConsumer,
    {
        let id = self.shared.scan_ids.generate();
        let driver = ScanDriver::for_consumer(id, self.name.clone(), Box::new(consumer));
        self.start_scan(scan, driver);
        id
    }

    /// Pull every row matched by `scan` as a stream.
    pub fn scan_stream(&self, scan: Scan) -> ScanStream {
        let id = self.shared.scan_ids.generate();
        let (sender, receiver) = flume::bounded(self.shared.options.buffer());
        let completed = Arc::new(AtomicBool::new(false));
        let driver =
            ScanDriver::for_channel(id, self.name.clone(), sender, Arc::clone(&completed));
        self.start_scan(scan, driver);
        ScanStream::new(id, receiver, completed)
    }

    /// Collect every row matched by `scan`. Intended for scans known to be small.
    pub fn scan_all(&self, scan: Scan) -> OperationFuture<Vec<RowResult>> {
        let (completer, rows) = pending();
        self.scan(scan, CollectConsumer::new(completer));
        rows
    }

    fn start_scan(&self, scan: Scan, driver: ScanDriver) {
        if self.shared.is_closed() {
            table_log!(
                Level::Debug,
                table: self.name,
                "scan_rejected",
                "scan={} error={}",
                driver.id(),
                TableError::ConnectionClosed
            );
            driver.reject(TableError::ConnectionClosed);
            return;
        }
        table_log!(
            Level::Debug,
            table: self.name,
            "scan_started",
            "scan={} reversed={} limit={:?}",
            driver.id(),
            scan.is_reversed(),
            scan.limit()
        );
        let scan = scan.with_default_caching(self.shared.options.caching());
        self.transport.scan(&self.name, scan, driver);
    }

    fn submit(&self, request: Request) -> OperationFuture<Response> {
        let checked = if self.shared.is_closed() {
            Err(TableError::ConnectionClosed)
        } else {
            request.validate(&self.shared.options)
        };
        if let Err(error) = checked {
            table_log!(
                Level::Debug,
                table: self.name,
                "submit_rejected",
                "op={} error={}",
                request.name(),
                error
            );
            return OperationFuture::failed(error);
        }
        self.transport.submit(&self.name, request)
    }
}

fn expect_row(op: &'static str, response: Response) -> TableResult<RowResult> {
    match response {
        Response::Row(result) => Ok(result),
        other => Err(other.unexpected(op)),
    }
}

fn expect_mutated(op: &'static str, response: Response) -> TableResult<()> {
    match response {
        Response::Mutated => Ok(()),
        other => Err(other.unexpected(op)),
    }
}
