use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::Level;

use crate::{
    future::OperationFuture, id::ScanIdGenerator, logging::table_log, option::TableOptions,
    table::AsyncTable, table_name::TableName, transport::Transport,
};

/// State shared by a connection and every table handle it produced.
pub(crate) struct ConnectionShared {
    pub(crate) options: TableOptions,
    pub(crate) scan_ids: ScanIdGenerator,
    closed: AtomicBool,
}

impl ConnectionShared {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Entry point owning a [`Transport`] and handing out [`AsyncTable`] handles.
///
/// Cloning is cheap; clones share the transport and the closed flag.
///
/// # Example
/// ```no_run
/// use async_table::{
///     executor::tokio::TokioExecutor, mem::MemTransport, AsyncConnection, Get, Put, TableName,
/// };
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let transport = MemTransport::new(TokioExecutor::default());
///     let name = TableName::new("async")?;
///     transport.create_table(name.clone(), ["cf"])?;
///
///     let conn = AsyncConnection::new(transport);
///     let table = conn.table(name);
///     table.put(Put::new("row").add_column("cf", "cq", "value")).await?;
///     let result = table.get(Get::new("row").add_column("cf", "cq")).await?;
///     assert_eq!(result.value(b"cf", b"cq").map(|v| v.as_ref()), Some(&b"value"[..]));
///     conn.close().await?;
///     Ok(())
/// }
/// ```
pub struct AsyncConnection<T: Transport> {
    transport: Arc<T>,
    shared: Arc<ConnectionShared>,
}

impl<T: Transport> Clone for AsyncConnection<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Transport> AsyncConnection<T> {
    /// Wrap `transport` with default options.
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, TableOptions::default())
    }

    /// Wrap `transport` with explicit options.
    pub fn with_options(transport: T, options: TableOptions) -> Self {
        Self {
            transport: Arc::new(transport),
            shared: Arc::new(ConnectionShared {
                options,
                scan_ids: ScanIdGenerator::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Handle for `name`. Does not contact the store; an unknown table surfaces
    /// as a failed operation.
    pub fn table(&self, name: TableName) -> AsyncTable<T> {
        AsyncTable::new(name, Arc::clone(&self.transport), Arc::clone(&self.shared))
    }

    /// Options applied to every table of this connection.
    pub fn options(&self) -> &TableOptions {
        &self.shared.options
    }

    /// Underlying transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Whether [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Close the connection. Later submissions on any of its tables fail with
    /// [`TableError::ConnectionClosed`](crate::TableError::ConnectionClosed);
    /// operations already in flight still complete. Closing twice is a no-op.
    pub fn close(&self) -> OperationFuture<()> {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return OperationFuture::ready(());
        }
        table_log!(Level::Info, "connection_closed", "");
        self.transport.close()
    }
}
