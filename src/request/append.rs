use bytes::Bytes;

use super::{check_cell, check_row, Column};
use crate::error::{TableError, TableResult};

/// Atomic byte concatenation onto existing cell values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Append {
    row: Bytes,
    cells: Vec<(Column, Bytes)>,
}

impl Append {
    /// Start an append against `row`.
    pub fn new(row: impl Into<Bytes>) -> Self {
        Self {
            row: row.into(),
            cells: Vec::new(),
        }
    }

    /// Append `value` to whatever `family:qualifier` currently holds.
    pub fn add(
        mut self,
        family: impl Into<Bytes>,
        qualifier: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> Self {
        self.cells
            .push((Column::new(family, qualifier), value.into()));
        self
    }

    /// Row addressed by this append.
    pub fn row(&self) -> &Bytes {
        &self.row
    }

    /// Fragments in insertion order.
    pub fn cells(&self) -> &[(Column, Bytes)] {
        &self.cells
    }

    pub(crate) fn validate(&self, value_limit: usize) -> TableResult<()> {
        check_row(&self.row)?;
        if self.cells.is_empty() {
            return Err(TableError::NoColumns("append"));
        }
        for (column, value) in &self.cells {
            check_cell(&self.row, column, value, value_limit)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_requires_a_fragment() {
        assert_eq!(
            Append::new("r").validate(64),
            Err(TableError::NoColumns("append"))
        );
        assert!(Append::new("r").add("f", "q", "0:").validate(64).is_ok());
    }
}
