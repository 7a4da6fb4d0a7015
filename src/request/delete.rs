use bytes::Bytes;

use super::{check_row, Column};
use crate::error::TableResult;

/// What a [`Delete`] removes from its row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteTarget {
    /// Every column of a family.
    Family(Bytes),
    /// A single column.
    Column(Column),
}

/// Removal of a whole row, whole families, or single columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delete {
    row: Bytes,
    targets: Vec<DeleteTarget>,
}

impl Delete {
    /// Delete the entire `row` unless narrowed with targets.
    pub fn new(row: impl Into<Bytes>) -> Self {
        Self {
            row: row.into(),
            targets: Vec::new(),
        }
    }

    /// Narrow the delete to `family:qualifier`.
    pub fn add_column(mut self, family: impl Into<Bytes>, qualifier: impl Into<Bytes>) -> Self {
        self.targets
            .push(DeleteTarget::Column(Column::new(family, qualifier)));
        self
    }

    /// Narrow the delete to every column of `family`.
    pub fn add_family(mut self, family: impl Into<Bytes>) -> Self {
        self.targets.push(DeleteTarget::Family(family.into()));
        self
    }

    /// Row addressed by this delete.
    pub fn row(&self) -> &Bytes {
        &self.row
    }

    /// Explicit targets; empty means the whole row.
    pub fn targets(&self) -> &[DeleteTarget] {
        &self.targets
    }

    /// Whether the entire row is removed.
    pub fn is_whole_row(&self) -> bool {
        self.targets.is_empty()
    }

    pub(crate) fn validate(&self) -> TableResult<()> {
        check_row(&self.row)
    }
}
