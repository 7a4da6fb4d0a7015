#![deny(missing_docs)]
//! Non-blocking table operations against a distributed key-value store.
//!
//! Every single-row operation on [`AsyncTable`] returns an [`OperationFuture`]
//! immediately; the future is resolved exactly once, off the caller's thread,
//! by whatever [`Transport`] backs the connection. Scans are pushed to a
//! [`ScanResultConsumer`] (or pulled through a [`ScanStream`]) under a strict
//! termination contract enforced by the [`ScanDriver`].
//!
//! The crate ships an in-memory transport, [`mem::MemTransport`], so the core
//! can be exercised without a cluster.

mod logging;

/// Connection handle that hands out tables.
pub mod connection;

/// Error type shared by every operation.
pub mod error;

/// Spawn abstraction used by transports.
pub mod executor;

/// Single-assignment deferred results.
pub mod future;

/// Identifiers attached to long-running operations.
pub mod id;

/// In-memory transport backed by an ordered concurrent map.
pub mod mem;

/// Client-side tuning knobs.
pub mod option;

/// Immutable request descriptors (`Get`, `Put`, `Scan`, ...).
pub mod request;

/// Row results and counter encoding.
pub mod result;

/// Push and pull scan delivery.
pub mod scan;

/// Operation dispatcher for a single table.
pub mod table;

/// Namespace-qualified table names.
pub mod table_name;

/// Abstract operation-submission interface.
pub mod transport;

pub use crate::{
    connection::AsyncConnection,
    error::{TableError, TableResult},
    future::{Completer, OperationFuture},
    option::TableOptions,
    request::{Append, CheckAndMutate, Column, Delete, Get, Increment, Put, RowMutation, Scan},
    result::RowResult,
    scan::{ScanDriver, ScanResultConsumer, ScanState, ScanStream},
    table::AsyncTable,
    table_name::TableName,
    transport::{Request, Response, Transport},
};
