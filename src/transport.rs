use crate::{
    error::{TableError, TableResult},
    future::OperationFuture,
    option::TableOptions,
    request::{Append, CheckAndMutate, Delete, Get, Increment, Put, Scan},
    result::RowResult,
    scan::ScanDriver,
    table_name::TableName,
};

/// Single-row operation handed to a [`Transport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    /// Read cells of a row.
    Get(Get),
    /// Existence check; the transport need not materialise values.
    Exists(Get),
    /// Write cells.
    Put(Put),
    /// Remove cells.
    Delete(Delete),
    /// Concatenate onto cells.
    Append(Append),
    /// Add to counters.
    Increment(Increment),
    /// Conditional put or delete.
    CheckAndMutate(CheckAndMutate),
}

impl Request {
    /// Short operation name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Request::Get(_) => "get",
            Request::Exists(_) => "exists",
            Request::Put(_) => "put",
            Request::Delete(_) => "delete",
            Request::Append(_) => "append",
            Request::Increment(_) => "increment",
            Request::CheckAndMutate(_) => "check_and_mutate",
        }
    }

    pub(crate) fn validate(&self, options: &TableOptions) -> TableResult<()> {
        match self {
            Request::Get(get) | Request::Exists(get) => get.validate(),
            Request::Put(put) => put.validate(options.value_limit()),
            Request::Delete(delete) => delete.validate(),
            Request::Append(append) => append.validate(options.value_limit()),
            Request::Increment(increment) => increment.validate(),
            Request::CheckAndMutate(cam) => cam.validate(options.value_limit()),
        }
    }
}

/// Outcome of a [`Request`] as reported by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// Row content: the read for `Get`, the post-mutation cells for `Append`/`Increment`.
    Row(RowResult),
    /// Answer to `Exists`.
    Exists(bool),
    /// A `Put` or `Delete` was applied.
    Mutated,
    /// Whether a check-and-mutate condition held (and the mutation was applied).
    Checked(bool),
}

impl Response {
    fn kind(&self) -> &'static str {
        match self {
            Response::Row(_) => "row",
            Response::Exists(_) => "exists",
            Response::Mutated => "mutated",
            Response::Checked(_) => "checked",
        }
    }

    pub(crate) fn unexpected(&self, op: &'static str) -> TableError {
        TableError::UnexpectedResponse {
            op,
            response: self.kind(),
        }
    }
}

/// Abstract operation-submission interface to the store.
///
/// Implementations own wire framing, routing, retries and the pool operations
/// run on. Every method returns without waiting for the store: `submit` hands
/// back a future the transport resolves later, and `scan` drives `driver`
/// from a task of its own.
pub trait Transport: Send + Sync + 'static {
    /// Submit a single-row request.
    fn submit(&self, table: &TableName, request: Request) -> OperationFuture<Response>;

    /// Start a scan, delivering rows through `driver` in key order.
    ///
    /// The transport must end every scan with exactly one of
    /// [`ScanDriver::on_complete`] or [`ScanDriver::on_error`] unless
    /// [`ScanDriver::on_next`] returned `false`.
    fn scan(&self, table: &TableName, scan: Scan, driver: ScanDriver);

    /// Release transport resources.
    fn close(&self) -> OperationFuture<()>;
}
