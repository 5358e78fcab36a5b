//! SQLite-backed persistent tables.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, Row, params, types::Type};

use crate::types::{EntityKind, Rank};

use super::{PersistError, PersistResult, PersistentTable, StoredRow};

/// SQLite implementation of [`crate::persist::PersistentTable`].
///
/// Each entity kind has its own table keyed by `id`; `rank` is a plain
/// integer column with no index.
pub struct SqliteTables {
    conn: Mutex<Connection>,
}

impl SqliteTables {
    /// Opens or creates the tables at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens an in-memory database.
    pub fn open_in_memory() -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> PersistResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> PersistResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| PersistError::Message("sqlite connection lock poisoned".to_string()))
    }
}

impl PersistentTable for SqliteTables {
    fn get_all(&self, kind: EntityKind) -> PersistResult<Vec<StoredRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, rank, payload FROM {} ORDER BY rowid ASC",
            kind.table_name()
        ))?;
        let rows = stmt.query_map([], read_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn get_by_id(&self, kind: EntityKind, id: &str) -> PersistResult<Option<StoredRow>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT id, rank, payload FROM {} WHERE id = ?1",
                    kind.table_name()
                ),
                params![id],
                read_row,
            )
            .optional()?;
        Ok(row)
    }

    fn put(&self, kind: EntityKind, row: StoredRow) -> PersistResult<()> {
        let conn = self.lock()?;
        conn.execute(&upsert_sql(kind), row_params(&row))?;
        Ok(())
    }

    fn bulk_put(&self, kind: EntityKind, rows: &[StoredRow]) -> PersistResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&upsert_sql(kind))?;
            for row in rows {
                stmt.execute(row_params(row))?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn clear(&self, kind: EntityKind) -> PersistResult<()> {
        let conn = self.lock()?;
        conn.execute(&format!("DELETE FROM {}", kind.table_name()), [])?;
        Ok(())
    }
}

// Upserts keep the existing rowid, so `get_all` order stays the insertion order.
fn upsert_sql(kind: EntityKind) -> String {
    format!(
        "INSERT INTO {}(id, rank, payload) VALUES (?1, ?2, ?3) \
         ON CONFLICT(id) DO UPDATE SET rank = excluded.rank, payload = excluded.payload",
        kind.table_name()
    )
}

fn row_params(row: &StoredRow) -> (&str, Option<i64>, &[u8]) {
    (row.id.as_str(), row.rank.map(i64::from), row.payload.as_slice())
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<StoredRow> {
    let id: String = row.get(0)?;
    let rank: Option<i64> = row.get(1)?;
    let rank = rank
        .map(|r| {
            Rank::try_from(r).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(1, Type::Integer, Box::new(e))
            })
        })
        .transpose()?;
    let payload: Vec<u8> = row.get(2)?;
    Ok(StoredRow { id, rank, payload })
}
