//! Caller-owned optimistic copy of a collection and its rollback snapshot.

use crate::{
    core::rank,
    record::{Ranked, Record},
    types::RecordId,
};

/// The initiator's local view of one collection.
///
/// Mutated optimistically before a write is confirmed; restored verbatim
/// from an [`OperationSnapshot`] if the write is rolled back.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalView<T> {
    records: Vec<T>,
}

impl<T: Record> LocalView<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copies the whole collection ahead of an optimistic mutation.
    pub fn snapshot(&self) -> OperationSnapshot<T> {
        OperationSnapshot {
            records: self.records.clone(),
        }
    }

    /// Replaces the local state with `snapshot`, consuming it.
    pub fn restore(&mut self, snapshot: OperationSnapshot<T>) {
        self.records = snapshot.records;
    }

    pub(crate) fn records_mut(&mut self) -> &mut Vec<T> {
        &mut self.records
    }
}

impl<T: Ranked> LocalView<T> {
    pub fn ids_by_rank(&self) -> Vec<RecordId> {
        rank::ids_by_rank(&self.records)
    }
}

/// Immutable pre-operation copy, owned by the operation that took it until
/// that operation commits or rolls back.
#[derive(Debug, PartialEq)]
pub struct OperationSnapshot<T> {
    records: Vec<T>,
}

impl<T> OperationSnapshot<T> {
    pub fn records(&self) -> &[T] {
        &self.records
    }
}
