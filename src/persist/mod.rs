//! Persistent table abstraction, row codec, and implementations.

/// In-process tables used by tests and ephemeral boards.
pub mod memory;
/// SQLite-backed tables, one per entity kind.
pub mod sqlite;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::{
    record::Record,
    types::{EntityKind, Rank, RecordId},
};

/// Version stamped into every encoded row payload.
pub const ROW_FORMAT_VERSION: u16 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unsupported row format version {0}")]
    UnsupportedFormat(u16),
    #[error("{0}")]
    Message(String),
}

pub type PersistResult<T> = Result<T, PersistError>;

/// One table row: the key, the plain rank column, and the encoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    pub id: RecordId,
    pub rank: Option<Rank>,
    pub payload: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RowEnvelope<T> {
    format_version: u16,
    record: T,
}

impl StoredRow {
    pub fn encode<T: Record>(record: &T) -> PersistResult<Self> {
        let payload = serde_json::to_vec(&RowEnvelope {
            format_version: ROW_FORMAT_VERSION,
            record,
        })?;
        Ok(Self {
            id: record.id().to_string(),
            rank: record.rank_column(),
            payload,
        })
    }

    /// Decodes the payload, refusing any envelope version other than
    /// [`ROW_FORMAT_VERSION`] before its record shape is looked at.
    pub fn decode<T: DeserializeOwned>(&self) -> PersistResult<T> {
        let header: RowHeader = serde_json::from_slice(&self.payload)?;
        match header.format_version {
            Some(ROW_FORMAT_VERSION) => {
                Ok(serde_json::from_slice::<RowEnvelope<T>>(&self.payload)?.record)
            }
            Some(other) => Err(PersistError::UnsupportedFormat(other)),
            // Rows written before the envelope existed hold the bare record.
            None => Ok(serde_json::from_slice::<T>(&self.payload)?),
        }
    }
}

#[derive(Deserialize)]
struct RowHeader {
    #[serde(default)]
    format_version: Option<u16>,
}

/// Durable store keyed by id, one independent table per [`EntityKind`].
///
/// Implementations must make `bulk_put` all-or-nothing.
pub trait PersistentTable: Send + Sync {
    fn get_all(&self, kind: EntityKind) -> PersistResult<Vec<StoredRow>>;
    fn get_by_id(&self, kind: EntityKind, id: &str) -> PersistResult<Option<StoredRow>>;
    fn put(&self, kind: EntityKind, row: StoredRow) -> PersistResult<()>;
    fn bulk_put(&self, kind: EntityKind, rows: &[StoredRow]) -> PersistResult<()>;
    fn clear(&self, kind: EntityKind) -> PersistResult<()>;
}

/// Decodes every row of `T`'s table, in insertion order.
pub fn load_all<T: Record>(table: &dyn PersistentTable) -> PersistResult<Vec<T>> {
    table.get_all(T::KIND)?.iter().map(StoredRow::decode).collect()
}

/// Looks up and decodes a single record of `T`.
pub fn load_one<T: Record>(table: &dyn PersistentTable, id: &str) -> PersistResult<Option<T>> {
    table
        .get_by_id(T::KIND, id)?
        .map(|row| row.decode())
        .transpose()
}

/// Encodes and writes a single record.
pub fn store_one<T: Record>(table: &dyn PersistentTable, record: &T) -> PersistResult<()> {
    table.put(T::KIND, StoredRow::encode(record)?)
}

/// Encodes and writes `records` in one all-or-nothing batch.
pub fn store_all<T: Record>(table: &dyn PersistentTable, records: &[T]) -> PersistResult<()> {
    let rows = records
        .iter()
        .map(StoredRow::encode)
        .collect::<PersistResult<Vec<_>>>()?;
    table.bulk_put(T::KIND, &rows)
}
