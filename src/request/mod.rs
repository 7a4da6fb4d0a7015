//! Immutable request descriptors.
//!
//! Descriptors are plain values built by chaining: `Put::new(row).add_column(f, q, v)`.
//! They carry caller-controlled opaque bytes and impose no encoding. Validation that
//! does not need the store (empty rows, oversized cells, missing columns) runs in
//! [`AsyncTable`](crate::AsyncTable) before anything is handed to a transport.

mod append;
mod check;
mod delete;
mod get;
mod increment;
mod put;
mod scan;

use std::collections::BTreeSet;

use bytes::Bytes;

pub use self::{
    append::Append,
    check::{CheckAndMutate, RowMutation},
    delete::{Delete, DeleteTarget},
    get::Get,
    increment::Increment,
    put::Put,
    scan::Scan,
};
pub(crate) use self::scan::range_is_empty;
use crate::{
    error::{TableError, TableResult},
    option::MAX_ROW_LENGTH,
};

/// Two-level `(family, qualifier)` address of a value within a row.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Column {
    family: Bytes,
    qualifier: Bytes,
}

impl Column {
    /// Address `family:qualifier`.
    pub fn new(family: impl Into<Bytes>, qualifier: impl Into<Bytes>) -> Self {
        Self {
            family: family.into(),
            qualifier: qualifier.into(),
        }
    }

    /// Column family.
    pub fn family(&self) -> &Bytes {
        &self.family
    }

    /// Qualifier within the family.
    pub fn qualifier(&self) -> &Bytes {
        &self.qualifier
    }

    pub(crate) fn encoded_len(&self) -> usize {
        self.family.len() + self.qualifier.len()
    }
}

/// Set of columns requested by a [`Get`] or [`Scan`].
///
/// Whole families and single columns may be mixed; an empty selection means
/// every column of the row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnSelection {
    families: BTreeSet<Bytes>,
    columns: BTreeSet<Column>,
}

impl ColumnSelection {
    pub(crate) fn add_family(&mut self, family: Bytes) {
        self.columns.retain(|column| column.family != family);
        self.families.insert(family);
    }

    pub(crate) fn add_column(&mut self, column: Column) {
        if !self.families.contains(&column.family) {
            self.columns.insert(column);
        }
    }

    /// Whether no column was named, i.e. everything is selected.
    pub fn is_all(&self) -> bool {
        self.families.is_empty() && self.columns.is_empty()
    }

    /// Whether `column` is part of the selection.
    pub fn matches(&self, column: &Column) -> bool {
        self.is_all() || self.families.contains(&column.family) || self.columns.contains(column)
    }

    /// Every family referenced, directly or through one of its columns.
    pub fn families(&self) -> impl Iterator<Item = &Bytes> {
        self.families
            .iter()
            .chain(self.columns.iter().map(|column| &column.family))
    }
}

pub(crate) fn check_row(row: &[u8]) -> TableResult<()> {
    if row.is_empty() {
        return Err(TableError::EmptyRow);
    }
    if row.len() > MAX_ROW_LENGTH {
        return Err(TableError::RowTooLong {
            len: row.len(),
            max: MAX_ROW_LENGTH,
        });
    }
    Ok(())
}

pub(crate) fn check_cell(row: &[u8], column: &Column, value: &[u8], limit: usize) -> TableResult<()> {
    let size = row.len() + column.encoded_len() + value.len();
    if size > limit {
        return Err(TableError::KeyValueTooLarge { size, limit });
    }
    Ok(())
}
