use bytes::Bytes;

use super::{check_row, Column, ColumnSelection};
use crate::error::TableResult;

/// Read of a single row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Get {
    row: Bytes,
    selection: ColumnSelection,
}

impl Get {
    /// Read `row`; every column unless narrowed with [`add_column`](Self::add_column)
    /// or [`add_family`](Self::add_family).
    pub fn new(row: impl Into<Bytes>) -> Self {
        Self {
            row: row.into(),
            selection: ColumnSelection::default(),
        }
    }

    /// Request a single column.
    pub fn add_column(mut self, family: impl Into<Bytes>, qualifier: impl Into<Bytes>) -> Self {
        self.selection.add_column(Column::new(family, qualifier));
        self
    }

    /// Request every column of `family`.
    pub fn add_family(mut self, family: impl Into<Bytes>) -> Self {
        self.selection.add_family(family.into());
        self
    }

    /// Row addressed by this read.
    pub fn row(&self) -> &Bytes {
        &self.row
    }

    /// Requested columns.
    pub fn selection(&self) -> &ColumnSelection {
        &self.selection
    }

    pub(crate) fn validate(&self) -> TableResult<()> {
        check_row(&self.row)
    }
}
