use bytes::Bytes;

use super::{check_row, Column};
use crate::error::{TableError, TableResult};

/// Atomic addition to one or more 64-bit counters of a row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Increment {
    row: Bytes,
    deltas: Vec<(Column, i64)>,
}

impl Increment {
    /// Start an increment against `row`.
    pub fn new(row: impl Into<Bytes>) -> Self {
        Self {
            row: row.into(),
            deltas: Vec::new(),
        }
    }

    /// Add `delta` to the counter at `family:qualifier`. An absent counter counts as zero.
    pub fn add_column(
        mut self,
        family: impl Into<Bytes>,
        qualifier: impl Into<Bytes>,
        delta: i64,
    ) -> Self {
        self.deltas.push((Column::new(family, qualifier), delta));
        self
    }

    /// Row addressed by this increment.
    pub fn row(&self) -> &Bytes {
        &self.row
    }

    /// Per-column deltas in insertion order.
    pub fn deltas(&self) -> &[(Column, i64)] {
        &self.deltas
    }

    pub(crate) fn validate(&self) -> TableResult<()> {
        check_row(&self.row)?;
        if self.deltas.is_empty() {
            return Err(TableError::NoColumns("increment"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_requires_a_column() {
        assert_eq!(
            Increment::new("r").validate(),
            Err(TableError::NoColumns("increment"))
        );
        let inc = Increment::new("r").add_column("f", "q", -3);
        assert!(inc.validate().is_ok());
        assert_eq!(inc.deltas()[0].1, -3);
    }
}
