//! In-process [`PersistentTable`] keeping rows in insertion order.

use std::sync::{
    Mutex, MutexGuard,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use hashbrown::HashMap;

use crate::types::{EntityKind, RecordId};

use super::{PersistError, PersistResult, PersistentTable, StoredRow};

#[derive(Debug, Default)]
struct Table {
    rows: Vec<StoredRow>,
    pos: HashMap<RecordId, usize>,
}

impl Table {
    fn upsert(&mut self, row: StoredRow) {
        match self.pos.get(&row.id) {
            Some(&idx) => self.rows[idx] = row,
            None => {
                self.pos.insert(row.id.clone(), self.rows.len());
                self.rows.push(row);
            }
        }
    }
}

/// Mutex-guarded tables. Writes can be forced to fail to exercise rollback.
#[derive(Debug, Default)]
pub struct MemoryTables {
    tables: Mutex<HashMap<EntityKind, Table>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every `put`/`bulk_put`/`clear` fails without touching rows.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful write calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> PersistResult<MutexGuard<'_, HashMap<EntityKind, Table>>> {
        self.tables
            .lock()
            .map_err(|_| PersistError::Message("memory table lock poisoned".to_string()))
    }

    fn check_writable(&self) -> PersistResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistError::Message("write rejected by memory table".to_string()));
        }
        Ok(())
    }
}

impl PersistentTable for MemoryTables {
    fn get_all(&self, kind: EntityKind) -> PersistResult<Vec<StoredRow>> {
        Ok(self
            .lock()?
            .get(&kind)
            .map(|t| t.rows.clone())
            .unwrap_or_default())
    }

    fn get_by_id(&self, kind: EntityKind, id: &str) -> PersistResult<Option<StoredRow>> {
        let tables = self.lock()?;
        Ok(tables
            .get(&kind)
            .and_then(|t| t.pos.get(id).map(|&idx| t.rows[idx].clone())))
    }

    fn put(&self, kind: EntityKind, row: StoredRow) -> PersistResult<()> {
        self.check_writable()?;
        self.lock()?.entry(kind).or_default().upsert(row);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn bulk_put(&self, kind: EntityKind, rows: &[StoredRow]) -> PersistResult<()> {
        self.check_writable()?;
        let mut tables = self.lock()?;
        let table = tables.entry(kind).or_default();
        for row in rows {
            table.upsert(row.clone());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn clear(&self, kind: EntityKind) -> PersistResult<()> {
        self.check_writable()?;
        self.lock()?.remove(&kind);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
