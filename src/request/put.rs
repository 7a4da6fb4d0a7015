use bytes::Bytes;

use super::{check_cell, check_row, Column};
use crate::error::{TableError, TableResult};

/// Write of one or more cells into a single row.
///
/// When the same column is added twice the later value wins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Put {
    row: Bytes,
    cells: Vec<(Column, Bytes)>,
}

impl Put {
    /// Start a write against `row`.
    pub fn new(row: impl Into<Bytes>) -> Self {
        Self {
            row: row.into(),
            cells: Vec::new(),
        }
    }

    /// Set `family:qualifier` to `value`.
    pub fn add_column(
        mut self,
        family: impl Into<Bytes>,
        qualifier: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> Self {
        self.cells
            .push((Column::new(family, qualifier), value.into()));
        self
    }

    /// Row addressed by this write.
    pub fn row(&self) -> &Bytes {
        &self.row
    }

    /// Cells in insertion order.
    pub fn cells(&self) -> &[(Column, Bytes)] {
        &self.cells
    }

    /// Whether no cell was added.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub(crate) fn validate(&self, value_limit: usize) -> TableResult<()> {
        check_row(&self.row)?;
        if self.cells.is_empty() {
            return Err(TableError::NoColumns("insert"));
        }
        for (column, value) in &self.cells {
            check_cell(&self.row, column, value, value_limit)?;
        }
        Ok(())
    }
}
