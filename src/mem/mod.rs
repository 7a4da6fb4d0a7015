//! In-memory [`Transport`] for tests, benches and local development.
//!
//! Tables live in a crossbeam skip list keyed by row, so scans walk rows in
//! key order without a global lock. Mutations of one row serialise on that
//! row's lock, which makes increments, appends and check-and-mutate atomic.
//! Every request runs on the supplied [`Executor`], never on the caller's
//! thread.

mod store;

use std::{
    collections::{BTreeSet, HashMap},
    pin::pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError, RwLock,
    },
};

use async_stream::try_stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use log::Level;

use self::store::MemTable;
use crate::{
    error::{TableError, TableResult},
    executor::Executor,
    future::{pending, OperationFuture},
    logging::table_log,
    option::{DEFAULT_MAX_KEY_VALUE_SIZE, DEFAULT_SCAN_CACHING},
    request::Scan,
    result::RowResult,
    scan::ScanDriver,
    table_name::TableName,
    transport::{Request, Response, Transport},
};

#[derive(Default)]
struct MemInner {
    tables: RwLock<HashMap<TableName, Arc<MemTable>>>,
    offline: AtomicBool,
    closed: AtomicBool,
    scan_fault: Mutex<Option<usize>>,
}

impl MemInner {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn check_online(&self) -> TableResult<()> {
        if self.offline.load(Ordering::Acquire) {
            return Err(TableError::Transport("store is offline".into()));
        }
        Ok(())
    }

    fn table(&self, name: &TableName) -> TableResult<Arc<MemTable>> {
        self.check_online()?;
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| TableError::TableNotFound(name.clone()))
    }

    fn execute(&self, name: &TableName, request: &Request, limit: usize) -> TableResult<Response> {
        let table = self.table(name)?;
        match request {
            Request::Get(get) => table.get(get).map(Response::Row),
            Request::Exists(get) => table.exists(get).map(Response::Exists),
            Request::Put(put) => table.put(put).map(|()| Response::Mutated),
            Request::Delete(delete) => table.delete(delete).map(|()| Response::Mutated),
            Request::Append(append) => table.append(append, limit).map(Response::Row),
            Request::Increment(increment) => table.increment(increment).map(Response::Row),
            Request::CheckAndMutate(check) => table.check_and_mutate(check).map(Response::Checked),
        }
    }

    fn scan_fault(&self) -> Option<usize> {
        *self.scan_fault.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Transport backed by in-process tables.
///
/// Closing the transport rejects requests and scans submitted afterwards.
/// Work accepted before the close runs to completion.
pub struct MemTransport<E: Executor> {
    inner: Arc<MemInner>,
    executor: E,
    max_key_value_size: usize,
}

impl<E: Executor> MemTransport<E> {
    /// Empty store running its work on `executor`.
    pub fn new(executor: E) -> Self {
        Self {
            inner: Arc::new(MemInner::default()),
            executor,
            max_key_value_size: DEFAULT_MAX_KEY_VALUE_SIZE,
        }
    }

    /// Largest cell the store keeps, in bytes. Appends that would grow a cell
    /// past it fail with [`TableError::KeyValueTooLarge`].
    pub fn with_max_key_value_size(self, max_key_value_size: usize) -> Self {
        Self {
            max_key_value_size,
            ..self
        }
    }

    /// Create `name` with the given column families.
    pub fn create_table<I>(&self, name: TableName, families: I) -> TableResult<()>
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        let families: BTreeSet<Bytes> = families.into_iter().map(Into::into).collect();
        let mut tables = self
            .inner
            .tables
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if tables.contains_key(&name) {
            return Err(TableError::TableExists(name));
        }
        table_log!(
            Level::Debug,
            table: name,
            "table_created",
            "families={}",
            families.len()
        );
        tables.insert(name.clone(), Arc::new(MemTable::new(name, families)));
        Ok(())
    }

    /// Remove `name` and every row in it.
    pub fn drop_table(&self, name: &TableName) -> TableResult<()> {
        let removed = self
            .inner
            .tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        if removed.is_none() {
            return Err(TableError::TableNotFound(name.clone()));
        }
        table_log!(Level::Debug, table: name, "table_dropped", "");
        Ok(())
    }

    /// Simulate losing the store: while offline every request and every scan
    /// fetch fails with [`TableError::Transport`].
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::Release);
    }

    /// Make scans started from now on fail after delivering `rows` rows, as if
    /// the connection broke mid-scan. `None` disables the fault.
    pub fn fail_scans_after(&self, rows: Option<usize>) {
        *self
            .inner
            .scan_fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = rows;
    }
}

impl<E: Executor> Transport for MemTransport<E> {
    fn submit(&self, table: &TableName, request: Request) -> OperationFuture<Response> {
        if self.inner.is_closed() {
            return OperationFuture::failed(TableError::ConnectionClosed);
        }
        let (completer, future) = pending();
        let inner = Arc::clone(&self.inner);
        let table = table.clone();
        let limit = self.max_key_value_size;
        self.executor.spawn(async move {
            let outcome = inner.execute(&table, &request, limit);
            table_log!(
                Level::Trace,
                table: table,
                "mem_executed",
                "op={} ok={}",
                request.name(),
                outcome.is_ok()
            );
            completer.complete(outcome);
        });
        future
    }

    fn scan(&self, table: &TableName, scan: Scan, driver: ScanDriver) {
        if self.inner.is_closed() {
            return driver.reject(TableError::ConnectionClosed);
        }
        self.executor
            .spawn(run_scan(Arc::clone(&self.inner), table.clone(), scan, driver));
    }

    fn close(&self) -> OperationFuture<()> {
        self.inner.closed.store(true, Ordering::Release);
        table_log!(Level::Trace, "mem_closed", "");
        OperationFuture::ready(())
    }
}

async fn run_scan(inner: Arc<MemInner>, name: TableName, scan: Scan, mut driver: ScanDriver) {
    let table = match inner.table(&name).and_then(|table| {
        table.check_families(scan.selection().families())?;
        Ok(table)
    }) {
        Ok(table) => table,
        Err(error) => return driver.on_error(error).await,
    };
    let fault = inner.scan_fault();
    let mut pages = pin!(pages(inner, table, scan));
    let mut delivered = 0;
    while let Some(page) = pages.next().await {
        let page = match page {
            Ok(page) => page,
            Err(error) => return driver.on_error(error).await,
        };
        table_log!(
            Level::Trace,
            table: name,
            "mem_scan_page",
            "scan={} rows={}",
            driver.id(),
            page.len()
        );
        for row in page {
            if fault == Some(delivered) {
                let error = TableError::Transport(format!("scan broken after {delivered} rows"));
                return driver.on_error(error).await;
            }
            if !driver.on_next(row).await {
                return;
            }
            delivered += 1;
        }
    }
    driver.on_complete().await;
}

/// Fetches the scan range in batches of `caching` rows, re-checking that the
/// store is online before each batch.
fn pages(
    inner: Arc<MemInner>,
    table: Arc<MemTable>,
    scan: Scan,
) -> impl Stream<Item = TableResult<Vec<RowResult>>> + Send {
    try_stream! {
        let caching = scan.caching().unwrap_or(DEFAULT_SCAN_CACHING);
        let mut remaining = scan.limit();
        let mut last: Option<Bytes> = None;
        loop {
            let want = remaining.map_or(caching, |left| left.min(caching));
            if want == 0 {
                break;
            }
            inner.check_online()?;
            let page = table.page(&scan, last.as_deref(), want);
            let exhausted = page.len() < want;
            last = page.last().map(|row| row.row().clone());
            if let Some(left) = remaining.as_mut() {
                *left -= page.len();
            }
            if !page.is_empty() {
                yield page;
            }
            if exhausted {
                break;
            }
        }
    }
}

#[cfg(all(test, feature = "tokio"))]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        executor::tokio::TokioExecutor,
        id::ScanIdGenerator,
        request::{Append, Get, Put},
        scan::ScanResultConsumer,
        AsyncConnection,
    };

    fn transport() -> MemTransport<TokioExecutor> {
        let transport = MemTransport::new(TokioExecutor::default());
        transport
            .create_table(TableName::new("t").unwrap(), ["cf"])
            .unwrap();
        transport
    }

    #[tokio::test]
    async fn duplicate_table_is_rejected() {
        let transport = transport();
        let name = TableName::new("t").unwrap();
        assert_eq!(
            transport.create_table(name.clone(), ["cf"]),
            Err(TableError::TableExists(name.clone()))
        );
        transport.drop_table(&name).unwrap();
        assert_eq!(
            transport.drop_table(&name),
            Err(TableError::TableNotFound(name))
        );
    }

    #[tokio::test]
    async fn offline_store_fails_requests() {
        let conn = AsyncConnection::new(transport());
        let table = conn.table(TableName::new("t").unwrap());
        conn.transport().set_offline(true);
        assert!(matches!(
            table.get(Get::new("r")).await,
            Err(TableError::Transport(_))
        ));
        conn.transport().set_offline(false);
        table
            .put(Put::new("r").add_column("cf", "q", "v"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_table_fails() {
        let conn = AsyncConnection::new(transport());
        let table = conn.table(TableName::new("missing").unwrap());
        assert_eq!(
            table.exists(Get::new("r")).await,
            Err(TableError::TableNotFound(TableName::new("missing").unwrap()))
        );
    }

    struct Count(Arc<Mutex<(usize, Option<TableResult<()>>)>>);

    impl ScanResultConsumer for Count {
        fn on_next(&mut self, _result: RowResult) -> bool {
            self.0.lock().unwrap().0 += 1;
            true
        }

        fn on_error(&mut self, error: TableError) {
            self.0.lock().unwrap().1 = Some(Err(error));
        }

        fn on_complete(&mut self) {
            self.0.lock().unwrap().1 = Some(Ok(()));
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn scan_pages_through_small_caching() {
        let conn = AsyncConnection::new(transport());
        let table = conn.table(TableName::new("t").unwrap());
        let puts = (0..25).map(|i| Put::new(format!("row-{i:02}")).add_column("cf", "q", "v"));
        crate::future::all(table.put_many(puts)).await.unwrap();

        let rows = table
            .scan_all(Scan::new().with_caching(4).with_limit(10))
            .await
            .unwrap();
        assert_eq!(rows.len(), 10);
        assert_eq!(&rows[9].row()[..], b"row-09");

        let seen = Arc::new(Mutex::new((0, None)));
        table.scan(Scan::new().with_caching(7), Count(Arc::clone(&seen)));
        loop {
            if seen.lock().unwrap().1.is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(*seen.lock().unwrap(), (25, Some(Ok(()))));
    }

    #[tokio::test]
    async fn close_rejects_only_later_work() {
        let transport = transport();
        let name = TableName::new("t").unwrap();
        let put = transport.submit(&name, Request::Put(Put::new("r").add_column("cf", "q", "v")));
        transport.close().await.unwrap();
        assert_eq!(put.await, Ok(Response::Mutated));

        assert_eq!(
            transport.submit(&name, Request::Get(Get::new("r"))).await,
            Err(TableError::ConnectionClosed)
        );
        let seen = Arc::new(Mutex::new((0, None)));
        let driver = ScanDriver::for_consumer(
            ScanIdGenerator::new().generate(),
            name,
            Box::new(Count(Arc::clone(&seen))),
        );
        transport.scan(&TableName::new("t").unwrap(), Scan::new(), driver);
        assert_eq!(
            *seen.lock().unwrap(),
            (0, Some(Err(TableError::ConnectionClosed)))
        );
    }

    #[tokio::test]
    async fn append_respects_the_store_cell_limit() {
        let transport = transport().with_max_key_value_size(8);
        let name = TableName::new("t").unwrap();
        let append = |fragment: &'static str| {
            Request::Append(Append::new("r").add("cf", "q", fragment))
        };
        transport.submit(&name, append("abc")).await.unwrap();
        assert_eq!(
            transport.submit(&name, append("de")).await,
            Err(TableError::KeyValueTooLarge { size: 9, limit: 8 })
        );
    }
}
