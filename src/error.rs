use crate::table_name::TableName;

/// Result type shared across table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Errors surfaced through failed futures and scan `on_error` callbacks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// The request carried an empty row key.
    #[error("row key must not be empty")]
    EmptyRow,
    /// The row key exceeds the maximum supported length.
    #[error("row key length {len} exceeds maximum {max}")]
    RowTooLong {
        /// Length of the offending key.
        len: usize,
        /// Maximum permitted length.
        max: usize,
    },
    /// A mutation that needs at least one column carried none.
    #[error("no columns to {0}")]
    NoColumns(&'static str),
    /// A single value exceeds the configured size limit.
    #[error("key value size {size} exceeds limit {limit}")]
    KeyValueTooLarge {
        /// Encoded size of the cell.
        size: usize,
        /// Configured limit.
        limit: usize,
    },
    /// A check-and-mutate pairs a mutation with a different row.
    #[error("mutation row does not match the checked row")]
    RowMismatch,
    /// A table name failed validation.
    #[error("invalid table name `{name}`: {reason}")]
    InvalidTableName {
        /// Rejected input.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },
    /// The connection was closed before the request was submitted.
    #[error("connection is closed")]
    ConnectionClosed,
    /// The transport failed to carry the request (connection lost, timeout).
    #[error("transport error: {0}")]
    Transport(String),
    /// The party responsible for resolving an outcome went away without doing so.
    #[error("operation was abandoned before completion")]
    Abandoned,
    /// The addressed table does not exist.
    #[error("table {0} does not exist")]
    TableNotFound(TableName),
    /// A table with this name already exists.
    #[error("table {0} already exists")]
    TableExists(TableName),
    /// The request names a column family the table does not have.
    #[error("column family `{family}` does not exist in table {table}")]
    NoSuchColumnFamily {
        /// Table addressed by the request.
        table: TableName,
        /// Lossy UTF-8 rendering of the family.
        family: String,
    },
    /// The stored value cannot be treated as a 64-bit counter.
    #[error("field is not a long, it's {0} bytes wide")]
    NotACounter(usize),
    /// The transport answered with a response of the wrong kind.
    #[error("unexpected response to {op}: {response}")]
    UnexpectedResponse {
        /// Operation that was submitted.
        op: &'static str,
        /// Kind of response received.
        response: &'static str,
    },
}

impl TableError {
    /// Whether the failure was detected before the request left the client.
    pub fn is_submission_failure(&self) -> bool {
        matches!(
            self,
            TableError::EmptyRow
                | TableError::RowTooLong { .. }
                | TableError::NoColumns(_)
                | TableError::KeyValueTooLarge { .. }
                | TableError::RowMismatch
                | TableError::InvalidTableName { .. }
                | TableError::ConnectionClosed
        )
    }
}
