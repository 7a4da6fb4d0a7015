use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use bytes::{Bytes, BytesMut};
use crossbeam_skiplist::SkipMap;

use crate::{
    error::{TableError, TableResult},
    request::{
        check_cell, range_is_empty, Append, CheckAndMutate, Column, ColumnSelection, Delete,
        DeleteTarget, Get, Increment, Put, RowMutation, Scan,
    },
    result::{counter_bytes, decode_counter, RowResult},
    table_name::TableName,
};

type Cells = BTreeMap<Column, Bytes>;

/// One table: an ordered concurrent map of rows, each guarded by its own lock.
///
/// Deleting every cell of a row leaves an empty entry behind; readers treat it
/// as absent. Removing the entry would let a concurrent writer holding the old
/// row lock mutate a detached row.
pub(crate) struct MemTable {
    name: TableName,
    families: BTreeSet<Bytes>,
    rows: SkipMap<Bytes, Arc<Mutex<Cells>>>,
}

impl MemTable {
    pub(crate) fn new(name: TableName, families: BTreeSet<Bytes>) -> Self {
        Self {
            name,
            families,
            rows: SkipMap::new(),
        }
    }

    pub(crate) fn check_families<'a>(
        &self,
        families: impl IntoIterator<Item = &'a Bytes>,
    ) -> TableResult<()> {
        for family in families {
            if !self.families.contains(family) {
                return Err(TableError::NoSuchColumnFamily {
                    table: self.name.clone(),
                    family: String::from_utf8_lossy(family).into_owned(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn get(&self, get: &Get) -> TableResult<RowResult> {
        self.check_families(get.selection().families())?;
        let cells = match self.rows.get::<[u8]>(get.row()) {
            Some(entry) => select(&lock(entry.value()), get.selection()),
            None => Cells::new(),
        };
        Ok(RowResult::new(get.row().clone(), cells))
    }

    pub(crate) fn exists(&self, get: &Get) -> TableResult<bool> {
        self.check_families(get.selection().families())?;
        Ok(self.rows.get::<[u8]>(get.row()).is_some_and(|entry| {
            lock(entry.value())
                .keys()
                .any(|column| get.selection().matches(column))
        }))
    }

    pub(crate) fn put(&self, put: &Put) -> TableResult<()> {
        self.check_families(put.cells().iter().map(|(column, _)| column.family()))?;
        let row = self.row(put.row());
        apply_put(&mut lock(&row), put);
        Ok(())
    }

    pub(crate) fn delete(&self, delete: &Delete) -> TableResult<()> {
        self.check_families(delete.targets().iter().map(target_family))?;
        if let Some(entry) = self.rows.get::<[u8]>(delete.row()) {
            apply_delete(&mut lock(entry.value()), delete);
        }
        Ok(())
    }

    /// Fails with [`TableError::KeyValueTooLarge`], leaving the row untouched,
    /// when a concatenated cell would exceed `limit`.
    pub(crate) fn append(&self, append: &Append, limit: usize) -> TableResult<RowResult> {
        self.check_families(append.cells().iter().map(|(column, _)| column.family()))?;
        let row = self.row(append.row());
        let mut cells = lock(&row);
        let mut staged = Cells::new();
        for (column, fragment) in append.cells() {
            let current = staged.get(column).or_else(|| cells.get(column));
            let mut value = BytesMut::with_capacity(
                current.map_or(0, Bytes::len) + fragment.len(),
            );
            if let Some(current) = current {
                value.extend_from_slice(current);
            }
            value.extend_from_slice(fragment);
            check_cell(append.row(), column, &value, limit)?;
            staged.insert(column.clone(), value.freeze());
        }
        cells.extend(staged.iter().map(|(c, v)| (c.clone(), v.clone())));
        Ok(RowResult::new(append.row().clone(), staged))
    }

    /// Every delta is validated before any counter changes. Overflow wraps.
    pub(crate) fn increment(&self, increment: &Increment) -> TableResult<RowResult> {
        self.check_families(increment.deltas().iter().map(|(column, _)| column.family()))?;
        let row = self.row(increment.row());
        let mut cells = lock(&row);
        let mut staged = BTreeMap::<Column, i64>::new();
        for (column, delta) in increment.deltas() {
            let current = match staged.get(column) {
                Some(value) => *value,
                None => cells
                    .get(column)
                    .map(|value| decode_counter(value))
                    .transpose()?
                    .unwrap_or(0),
            };
            staged.insert(column.clone(), current.wrapping_add(*delta));
        }
        let staged: Cells = staged
            .into_iter()
            .map(|(column, value)| (column, counter_bytes(value)))
            .collect();
        cells.extend(staged.iter().map(|(c, v)| (c.clone(), v.clone())));
        Ok(RowResult::new(increment.row().clone(), staged))
    }

    pub(crate) fn check_and_mutate(&self, check: &CheckAndMutate) -> TableResult<bool> {
        self.check_families([check.column().family()])?;
        match check.mutation() {
            RowMutation::Put(put) => {
                self.check_families(put.cells().iter().map(|(column, _)| column.family()))?
            }
            RowMutation::Delete(delete) => {
                self.check_families(delete.targets().iter().map(target_family))?
            }
        }
        let row = self.row(check.row());
        let mut cells = lock(&row);
        if cells.get(check.column()) != check.expected() {
            return Ok(false);
        }
        match check.mutation() {
            RowMutation::Put(put) => apply_put(&mut cells, put),
            RowMutation::Delete(delete) => apply_delete(&mut cells, delete),
        }
        Ok(true)
    }

    /// Next batch of at most `max_rows` non-empty rows after `last`, in scan order.
    pub(crate) fn page(&self, scan: &Scan, last: Option<&[u8]>, max_rows: usize) -> Vec<RowResult> {
        let (lower, upper) = scan.remaining_range(last);
        if max_rows == 0 || range_is_empty(lower, upper) {
            return Vec::new();
        }
        let range = self.rows.range::<[u8], _>((lower, upper));
        let rows: Box<dyn Iterator<Item = _>> = if scan.is_reversed() {
            Box::new(range.rev())
        } else {
            Box::new(range)
        };
        rows.filter_map(|entry| {
            let cells = select(&lock(entry.value()), scan.selection());
            (!cells.is_empty()).then(|| RowResult::new(entry.key().clone(), cells))
        })
        .take(max_rows)
        .collect()
    }

    fn row(&self, row: &Bytes) -> Arc<Mutex<Cells>> {
        Arc::clone(self.rows.get_or_insert_with(row.clone(), Default::default).value())
    }
}

fn lock(row: &Mutex<Cells>) -> MutexGuard<'_, Cells> {
    row.lock().unwrap_or_else(PoisonError::into_inner)
}

fn select(cells: &Cells, selection: &ColumnSelection) -> Cells {
    cells
        .iter()
        .filter(|(column, _)| selection.matches(column))
        .map(|(column, value)| (column.clone(), value.clone()))
        .collect()
}

fn target_family(target: &DeleteTarget) -> &Bytes {
    match target {
        DeleteTarget::Family(family) => family,
        DeleteTarget::Column(column) => column.family(),
    }
}

fn apply_put(cells: &mut Cells, put: &Put) {
    for (column, value) in put.cells() {
        cells.insert(column.clone(), value.clone());
    }
}

fn apply_delete(cells: &mut Cells, delete: &Delete) {
    if delete.is_whole_row() {
        cells.clear();
        return;
    }
    for target in delete.targets() {
        match target {
            DeleteTarget::Family(family) => cells.retain(|column, _| column.family() != family),
            DeleteTarget::Column(column) => {
                cells.remove(column);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::DEFAULT_MAX_KEY_VALUE_SIZE;

    fn table() -> MemTable {
        MemTable::new(
            TableName::new("t").unwrap(),
            [Bytes::from_static(b"cf"), Bytes::from_static(b"meta")]
                .into_iter()
                .collect(),
        )
    }

    fn rows(results: &[RowResult]) -> Vec<String> {
        results
            .iter()
            .map(|result| String::from_utf8_lossy(result.row()).into_owned())
            .collect()
    }

    #[test]
    fn put_get_delete() {
        let table = table();
        table
            .put(&Put::new("r").add_column("cf", "a", "1").add_column("meta", "b", "2"))
            .unwrap();

        let all = table.get(&Get::new("r")).unwrap();
        assert_eq!(all.len(), 2);
        let narrowed = table.get(&Get::new("r").add_family("meta")).unwrap();
        assert_eq!(narrowed.value(b"meta", b"b").map(Bytes::as_ref), Some(&b"2"[..]));
        assert!(!narrowed.contains_column(b"cf", b"a"));

        table.delete(&Delete::new("r").add_column("cf", "a")).unwrap();
        assert!(!table.exists(&Get::new("r").add_family("cf")).unwrap());
        assert!(table.exists(&Get::new("r")).unwrap());

        table.delete(&Delete::new("r")).unwrap();
        assert!(table.get(&Get::new("r")).unwrap().is_empty());
        assert!(!table.exists(&Get::new("r")).unwrap());
    }

    #[test]
    fn unknown_family_is_rejected() {
        let table = table();
        let error = table
            .put(&Put::new("r").add_column("nope", "a", "1"))
            .unwrap_err();
        assert_eq!(
            error,
            TableError::NoSuchColumnFamily {
                table: TableName::new("t").unwrap(),
                family: "nope".into()
            }
        );
        assert!(table.get(&Get::new("r").add_column("nope", "a")).is_err());
    }

    #[test]
    fn increment_starts_from_zero_and_wraps() {
        let table = table();
        let first = table
            .increment(&Increment::new("r").add_column("cf", "n", 5))
            .unwrap();
        assert_eq!(first.value_as_i64(b"cf", b"n"), Ok(Some(5)));

        table
            .put(&Put::new("r").add_column("cf", "max", counter_bytes(i64::MAX)))
            .unwrap();
        let wrapped = table
            .increment(&Increment::new("r").add_column("cf", "max", 1))
            .unwrap();
        assert_eq!(wrapped.value_as_i64(b"cf", b"max"), Ok(Some(i64::MIN)));
    }

    #[test]
    fn increment_is_all_or_nothing() {
        let table = table();
        table.put(&Put::new("r").add_column("cf", "text", "abc")).unwrap();
        let error = table
            .increment(
                &Increment::new("r")
                    .add_column("cf", "n", 1)
                    .add_column("cf", "text", 1),
            )
            .unwrap_err();
        assert_eq!(error, TableError::NotACounter(3));
        assert!(!table.exists(&Get::new("r").add_column("cf", "n")).unwrap());
    }

    #[test]
    fn append_concatenates() {
        let table = table();
        table
            .append(&Append::new("r").add("cf", "q", "a"), DEFAULT_MAX_KEY_VALUE_SIZE)
            .unwrap();
        let result = table
            .append(
                &Append::new("r").add("cf", "q", "b").add("cf", "q", "c"),
                DEFAULT_MAX_KEY_VALUE_SIZE,
            )
            .unwrap();
        assert_eq!(result.value(b"cf", b"q").map(Bytes::as_ref), Some(&b"abc"[..]));
    }

    #[test]
    fn append_cannot_grow_a_cell_past_the_limit() {
        // row "r" + "cf" + "q" leaves room for a 12-byte value under a 16-byte limit.
        const LIMIT: usize = 16;
        let table = table();
        table
            .append(&Append::new("r").add("cf", "q", "01234567"), LIMIT)
            .unwrap();

        let grown = table.append(
            &Append::new("r").add("cf", "meta", "ok").add("cf", "q", "89abc"),
            LIMIT,
        );
        assert_eq!(
            grown,
            Err(TableError::KeyValueTooLarge {
                size: 17,
                limit: LIMIT
            })
        );
        let row = table.get(&Get::new("r")).unwrap();
        assert_eq!(
            row.value(b"cf", b"q").map(Bytes::as_ref),
            Some(&b"01234567"[..])
        );
        assert_eq!(row.value(b"cf", b"meta"), None);

        let result = table
            .append(&Append::new("r").add("cf", "q", "89ab"), LIMIT)
            .unwrap();
        assert_eq!(
            result.value(b"cf", b"q").map(Bytes::as_ref),
            Some(&b"0123456789ab"[..])
        );
    }

    #[test]
    fn check_and_mutate_compares_current_value() {
        let table = table();
        let put = Put::new("r").add_column("cf", "q", "v1");
        assert!(table
            .check_and_mutate(&CheckAndMutate::new("r", "cf", "q", None, put.clone()))
            .unwrap());
        assert!(!table
            .check_and_mutate(&CheckAndMutate::new("r", "cf", "q", None, put))
            .unwrap());

        let delete = Delete::new("r");
        assert!(!table
            .check_and_mutate(&CheckAndMutate::new(
                "r",
                "cf",
                "q",
                Some(Bytes::from_static(b"other")),
                delete.clone()
            ))
            .unwrap());
        assert!(table
            .check_and_mutate(&CheckAndMutate::new(
                "r",
                "cf",
                "q",
                Some(Bytes::from_static(b"v1")),
                delete
            ))
            .unwrap());
        assert!(table.get(&Get::new("r")).unwrap().is_empty());
    }

    #[test]
    fn pages_resume_after_last_row() {
        let table = table();
        for row in ["a", "b", "c", "d", "e"] {
            table.put(&Put::new(row).add_column("cf", "q", row)).unwrap();
        }
        table.delete(&Delete::new("c")).unwrap();

        let scan = Scan::new();
        let first = table.page(&scan, None, 2);
        assert_eq!(rows(&first), vec!["a", "b"]);
        let second = table.page(&scan, Some(&b"b"[..]), 2);
        assert_eq!(rows(&second), vec!["d", "e"]);
        assert!(table.page(&scan, Some(&b"e"[..]), 2).is_empty());

        let reversed = Scan::new().with_start_row("d").reversed(true);
        assert_eq!(rows(&table.page(&reversed, None, 10)), vec!["d", "b", "a"]);
        assert_eq!(rows(&table.page(&reversed, Some(&b"b"[..]), 10)), vec!["a"]);
    }

    #[test]
    fn page_skips_rows_without_selected_columns() {
        let table = table();
        table.put(&Put::new("a").add_column("cf", "q", "1")).unwrap();
        table.put(&Put::new("b").add_column("meta", "q", "2")).unwrap();
        let scan = Scan::new().add_family("meta");
        assert_eq!(rows(&table.page(&scan, None, 10)), vec!["b"]);
    }
}
