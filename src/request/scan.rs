use std::ops::Bound;

use bytes::Bytes;

use super::{Column, ColumnSelection};

/// Ordered read of a range of rows, delivered incrementally.
///
/// Forward scans start at the (inclusive) start row and stop before the stop row.
/// Reversed scans walk keys downwards: the start row is then the upper bound.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scan {
    start: Option<Bytes>,
    stop: Option<Bytes>,
    include_stop: bool,
    prefix: Option<(Bytes, Option<Bytes>)>,
    selection: ColumnSelection,
    limit: Option<usize>,
    caching: Option<usize>,
    reversed: bool,
}

impl Scan {
    /// Scan every row of the table.
    pub fn new() -> Self {
        Self::default()
    }

    /// First row to return. An empty key means the beginning of the table.
    pub fn with_start_row(mut self, row: impl Into<Bytes>) -> Self {
        let row = row.into();
        self.start = (!row.is_empty()).then_some(row);
        self
    }

    /// Row at which the scan stops, excluded unless `inclusive`.
    pub fn with_stop_row(mut self, row: impl Into<Bytes>, inclusive: bool) -> Self {
        let row = row.into();
        self.stop = (!row.is_empty()).then_some(row);
        self.include_stop = inclusive;
        self
    }

    /// Restrict the scan to rows starting with `prefix`, replacing start and stop rows.
    pub fn with_row_prefix(mut self, prefix: impl Into<Bytes>) -> Self {
        let prefix = prefix.into();
        let next = next_prefix(&prefix);
        self.prefix = Some((prefix, next));
        self
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

    /// Stop after `limit` rows. Zero means no limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }

    /// Rows fetched per transport round trip. Zero falls back to the table default.
    pub fn with_caching(mut self, caching: usize) -> Self {
        self.caching = (caching > 0).then_some(caching);
        self
    }

    /// Walk rows in descending key order.
    pub fn reversed(mut self, reversed: bool) -> Self {
        self.reversed = reversed;
        self
    }

    /// Configured start row.
    pub fn start_row(&self) -> Option<&Bytes> {
        self.start.as_ref()
    }

    /// Configured stop row and whether it is inclusive.
    pub fn stop_row(&self) -> Option<(&Bytes, bool)> {
        self.stop.as_ref().map(|row| (row, self.include_stop))
    }

    /// Requested columns.
    pub fn selection(&self) -> &ColumnSelection {
        &self.selection
    }

    /// Maximum number of rows to deliver.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Per-fetch row count, if set on this scan.
    pub fn caching(&self) -> Option<usize> {
        self.caching
    }

    /// Whether rows are delivered in descending key order.
    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub(crate) fn with_default_caching(mut self, caching: usize) -> Self {
        if self.caching.is_none() {
            self.caching = Some(caching);
        }
        self
    }

    /// Key range still to be visited, as ascending `(lower, upper)` bounds.
    ///
    /// `last` is the most recently delivered row; the range shrinks past it in
    /// the direction of travel.
    pub fn remaining_range<'a>(&'a self, last: Option<&'a [u8]>) -> (Bound<&'a [u8]>, Bound<&'a [u8]>) {
        let (mut lower, mut upper) = self.key_range();
        if let Some(last) = last {
            if self.reversed {
                upper = tighter_upper(upper, last);
            } else {
                lower = tighter_lower(lower, last);
            }
        }
        (lower, upper)
    }

    fn key_range(&self) -> (Bound<&[u8]>, Bound<&[u8]>) {
        if let Some((prefix, next)) = &self.prefix {
            let upper = next
                .as_ref()
                .map_or(Bound::Unbounded, |next| Bound::Excluded(next.as_ref()));
            return (Bound::Included(prefix.as_ref()), upper);
        }
        let start = self
            .start
            .as_ref()
            .map_or(Bound::Unbounded, |row| Bound::Included(row.as_ref()));
        let stop = match &self.stop {
            None => Bound::Unbounded,
            Some(row) if self.include_stop => Bound::Included(row.as_ref()),
            Some(row) => Bound::Excluded(row.as_ref()),
        };
        if self.reversed {
            (stop, start)
        } else {
            (start, stop)
        }
    }
}

/// Whether no key can satisfy both bounds.
pub(crate) fn range_is_empty(lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> bool {
    match (lower, upper) {
        (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
        (Bound::Included(lo), Bound::Excluded(hi))
        | (Bound::Excluded(lo), Bound::Included(hi))
        | (Bound::Excluded(lo), Bound::Excluded(hi)) => lo >= hi,
        _ => false,
    }
}

fn tighter_lower<'a>(lower: Bound<&'a [u8]>, last: &'a [u8]) -> Bound<&'a [u8]> {
    match lower {
        Bound::Included(lo) | Bound::Excluded(lo) if lo > last => lower,
        _ => Bound::Excluded(last),
    }
}

fn tighter_upper<'a>(upper: Bound<&'a [u8]>, last: &'a [u8]) -> Bound<&'a [u8]> {
    match upper {
        Bound::Included(hi) | Bound::Excluded(hi) if hi < last => upper,
        _ => Bound::Excluded(last),
    }
}

/// Smallest key greater than every key starting with `prefix`, if one exists.
fn next_prefix(prefix: &[u8]) -> Option<Bytes> {
    let end = prefix.iter().rposition(|byte| *byte != u8::MAX)?;
    let mut next = prefix[..=end].to_vec();
    next[end] += 1;
    Some(Bytes::from(next))
}
