//! Read-through snapshot of every table.

use std::sync::Arc;

use hashbrown::HashMap;
use tokio::sync::RwLock;

use crate::{
    persist::{self, PersistError, PersistResult, PersistentTable},
    record::{Assessment, Candidate, Job, Record},
    types::RecordId,
};

/// Records of one kind in table order, with an id-to-position index.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    records: Vec<T>,
    pos: HashMap<RecordId, usize>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            pos: HashMap::new(),
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn from_records(records: Vec<T>) -> Self {
        let mut out = Self::default();
        for rec in records {
            out.upsert(rec);
        }
        out
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.pos.get(id).map(|&idx| &self.records[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.pos.contains_key(id)
    }

    /// Replaces the record with the same id in place, or appends it.
    pub fn upsert(&mut self, record: T) {
        match self.pos.get(record.id()) {
            Some(&idx) => self.records[idx] = record,
            None => {
                self.pos.insert(record.id().to_string(), self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Every table, as last observed by the cache.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheSnapshot {
    pub jobs: Collection<Job>,
    pub candidates: Collection<Candidate>,
    pub assessments: Collection<Assessment>,
}

impl CacheSnapshot {
    pub fn collection<T: Record>(&self) -> &Collection<T> {
        T::collection(self)
    }
}

/// In-memory mirror of the persistent tables.
///
/// Filled on first [`load`](Self::load) and kept current by
/// [`apply_write`](Self::apply_write) after each confirmed commit. Writes
/// that bypass `apply_write` are not observed until [`invalidate`](Self::invalidate).
pub struct ReadThroughCache {
    tables: Arc<dyn PersistentTable>,
    state: RwLock<Option<Arc<CacheSnapshot>>>,
}

impl ReadThroughCache {
    pub fn new(tables: Arc<dyn PersistentTable>) -> Self {
        Self {
            tables,
            state: RwLock::new(None),
        }
    }

    pub fn tables(&self) -> &Arc<dyn PersistentTable> {
        &self.tables
    }

    pub async fn is_loaded(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// Returns the current snapshot, fetching every table on first use.
    pub async fn load(&self) -> PersistResult<Arc<CacheSnapshot>> {
        if let Some(snapshot) = self.state.read().await.as_ref() {
            tracing::trace!("cache hit");
            return Ok(Arc::clone(snapshot));
        }

        let mut guard = self.state.write().await;
        if let Some(snapshot) = guard.as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        let snapshot = Arc::new(fetch_all(Arc::clone(&self.tables)).await?);
        tracing::info!(
            jobs = snapshot.jobs.len(),
            candidates = snapshot.candidates.len(),
            assessments = snapshot.assessments.len(),
            "cache filled"
        );
        *guard = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Point-updates one record after a confirmed write.
    ///
    /// A no-op when nothing is loaded; the next `load` reads the table.
    pub async fn apply_write<T: Record>(&self, record: T) {
        self.apply_writes(vec![record]).await;
    }

    /// Point-updates several records of one kind under a single lock.
    pub async fn apply_writes<T: Record>(&self, records: Vec<T>) {
        let mut guard = self.state.write().await;
        let Some(snapshot) = guard.as_mut() else {
            return;
        };
        // Readers holding the previous Arc keep their consistent view.
        let snapshot = Arc::make_mut(snapshot);
        let collection = T::collection_mut(snapshot);
        for record in records {
            tracing::debug!(entity = ?T::KIND, id = record.id(), "cache point update");
            collection.upsert(record);
        }
    }

    /// Discards the snapshot so the next `load` refetches.
    pub async fn invalidate(&self) {
        *self.state.write().await = None;
        tracing::info!("cache invalidated");
    }
}

async fn fetch_all(tables: Arc<dyn PersistentTable>) -> PersistResult<CacheSnapshot> {
    let (jobs, candidates, assessments) = tokio::try_join!(
        fetch::<Job>(Arc::clone(&tables)),
        fetch::<Candidate>(Arc::clone(&tables)),
        fetch::<Assessment>(tables),
    )?;
    Ok(CacheSnapshot {
        jobs: Collection::from_records(jobs),
        candidates: Collection::from_records(candidates),
        assessments: Collection::from_records(assessments),
    })
}

async fn fetch<T: Record>(tables: Arc<dyn PersistentTable>) -> PersistResult<Vec<T>> {
    tokio::task::spawn_blocking(move || persist::load_all::<T>(tables.as_ref()))
        .await
        .map_err(|e| PersistError::Message(format!("join error: {e}")))?
}
