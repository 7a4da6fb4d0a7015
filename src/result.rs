use std::collections::BTreeMap;

use bytes::Bytes;

use crate::{
    error::{TableError, TableResult},
    request::Column,
};

/// Width of an encoded counter cell.
pub const COUNTER_WIDTH: usize = std::mem::size_of::<i64>();

/// Resolved `(family, qualifier) -> value` entries for one row.
///
/// A row that does not exist and a row with no matching cells both produce an
/// empty result.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RowResult {
    row: Bytes,
    cells: BTreeMap<Column, Bytes>,
}

impl RowResult {
    /// Result for `row` holding `cells`.
    pub fn new(row: impl Into<Bytes>, cells: impl IntoIterator<Item = (Column, Bytes)>) -> Self {
        Self {
            row: row.into(),
            cells: cells.into_iter().collect(),
        }
    }

    /// Result for `row` without any cell.
    pub fn empty(row: impl Into<Bytes>) -> Self {
        Self {
            row: row.into(),
            cells: BTreeMap::new(),
        }
    }

    /// Row key this result was read from.
    pub fn row(&self) -> &Bytes {
        &self.row
    }

    /// Whether no cell matched.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Value stored at `family:qualifier`.
    pub fn value(&self, family: &[u8], qualifier: &[u8]) -> Option<&Bytes> {
        self.cells.get(&Column::new(
            Bytes::copy_from_slice(family),
            Bytes::copy_from_slice(qualifier),
        ))
    }

    /// Whether `family:qualifier` is present.
    pub fn contains_column(&self, family: &[u8], qualifier: &[u8]) -> bool {
        self.value(family, qualifier).is_some()
    }

    /// Value at `family:qualifier` decoded as a counter.
    pub fn value_as_i64(&self, family: &[u8], qualifier: &[u8]) -> TableResult<Option<i64>> {
        self.value(family, qualifier)
            .map(|value| decode_counter(value))
            .transpose()
    }

    /// Cells ordered by family then qualifier.
    pub fn iter(&self) -> impl Iterator<Item = (&Column, &Bytes)> {
        self.cells.iter()
    }

    /// `(qualifier, value)` pairs of one family.
    pub fn family<'a>(&'a self, family: &'a [u8]) -> impl Iterator<Item = (&'a Bytes, &'a Bytes)> {
        self.cells
            .iter()
            .filter(move |(column, _)| column.family().as_ref() == family)
            .map(|(column, value)| (column.qualifier(), value))
    }

    /// Consume the result, yielding its cells.
    pub fn into_cells(self) -> BTreeMap<Column, Bytes> {
        self.cells
    }
}

/// Encode a counter the way the store persists it: 8 bytes, big-endian.
pub fn counter_bytes(value: i64) -> Bytes {
    Bytes::copy_from_slice(&value.to_be_bytes())
}

/// Decode a persisted counter.
pub fn decode_counter(bytes: &[u8]) -> TableResult<i64> {
    let raw: [u8; COUNTER_WIDTH] = bytes
        .try_into()
        .map_err(|_| TableError::NotACounter(bytes.len()))?;
    Ok(i64::from_be_bytes(raw))
}
