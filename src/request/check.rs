use bytes::Bytes;

use super::{check_cell, check_row, Column, Delete, Put};
use crate::error::{TableError, TableResult};

/// Mutation applied by a [`CheckAndMutate`] when its condition holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowMutation {
    /// Write cells.
    Put(Put),
    /// Remove cells, families or the whole row.
    Delete(Delete),
}

impl RowMutation {
    /// Row the mutation addresses.
    pub fn row(&self) -> &Bytes {
        match self {
            RowMutation::Put(put) => put.row(),
            RowMutation::Delete(delete) => delete.row(),
        }
    }
}

impl From<Put> for RowMutation {
    fn from(put: Put) -> Self {
        RowMutation::Put(put)
    }
}

impl From<Delete> for RowMutation {
    fn from(delete: Delete) -> Self {
        RowMutation::Delete(delete)
    }
}

/// Atomic compare-then-mutate on a single row.
///
/// The mutation is applied only when the checked column currently holds
/// `expected`; `None` requires the column to be absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckAndMutate {
    row: Bytes,
    column: Column,
    expected: Option<Bytes>,
    mutation: RowMutation,
}

impl CheckAndMutate {
    /// Guard `mutation` on `family:qualifier` of `row` holding `expected`.
    pub fn new(
        row: impl Into<Bytes>,
        family: impl Into<Bytes>,
        qualifier: impl Into<Bytes>,
        expected: Option<Bytes>,
        mutation: impl Into<RowMutation>,
    ) -> Self {
        Self {
            row: row.into(),
            column: Column::new(family, qualifier),
            expected,
            mutation: mutation.into(),
        }
    }

    /// Row that is checked and mutated.
    pub fn row(&self) -> &Bytes {
        &self.row
    }

    /// Column whose value is compared.
    pub fn column(&self) -> &Column {
        &self.column
    }

    /// Value the column must hold, or `None` for absence.
    pub fn expected(&self) -> Option<&Bytes> {
        self.expected.as_ref()
    }

    /// Mutation applied when the check passes.
    pub fn mutation(&self) -> &RowMutation {
        &self.mutation
    }

    pub(crate) fn validate(&self, value_limit: usize) -> TableResult<()> {
        check_row(&self.row)?;
        if self.mutation.row() != &self.row {
            return Err(TableError::RowMismatch);
        }
        if let Some(expected) = &self.expected {
            check_cell(&self.row, &self.column, expected, value_limit)?;
        }
        match &self.mutation {
            RowMutation::Put(put) => put.validate(value_limit),
            RowMutation::Delete(delete) => delete.validate(),
        }
    }
}
