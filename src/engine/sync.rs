use std::{future::Future, sync::Arc};

use crate::{
    channel::{ChannelStats, UnreliableChannel},
    core::{
        cache::ReadThroughCache,
        rank::{self, RankShift},
    },
    persist::{self, PersistError, PersistResult},
    record::{
        Assessment, Candidate, CandidateDraft, CandidatePatch, Job, JobDraft, JobPatch, Ranked,
        Record, RecordPatch, slugify,
    },
    types::{CandidateStage, JobStatus, Rank},
};

use super::{WriteError, WritePhase, view::LocalView};

/// Applies writes to a caller's [`LocalView`] first, then confirms them over
/// the [`UnreliableChannel`].
///
/// Confirmed writes reach the persistent table and then the cache. Failed
/// ones restore the view from its operation snapshot. Only one write is in
/// flight at a time because every write path takes `&mut self`; two engines
/// reordering the same collection are not guarded against.
pub struct SyncEngine {
    cache: Arc<ReadThroughCache>,
    channel: UnreliableChannel,
    phase: WritePhase,
}

impl SyncEngine {
    pub fn new(cache: Arc<ReadThroughCache>, channel: UnreliableChannel) -> Self {
        Self {
            cache,
            channel,
            phase: WritePhase::Idle,
        }
    }

    pub fn cache(&self) -> &Arc<ReadThroughCache> {
        &self.cache
    }

    /// Phase of the most recent write.
    pub fn phase(&self) -> WritePhase {
        self.phase
    }

    pub fn channel_stats(&self) -> ChannelStats {
        self.channel.stats()
    }

    /// Copies the cached collection of `T` into a fresh local view.
    pub async fn open_view<T: Record>(&self) -> Result<LocalView<T>, WriteError> {
        let snapshot = self.cache.load().await?;
        Ok(LocalView::new(T::collection(&snapshot).as_slice().to_vec()))
    }

    /// Moves `id` from `rank_from` to `rank_to`, shifting the records between.
    ///
    /// Bounds, id, and density are checked against `view` before anything is
    /// mutated. Moving a record onto its own rank is a no-op that never
    /// reaches the channel.
    pub async fn reorder<T: Ranked>(
        &mut self,
        view: &mut LocalView<T>,
        id: &str,
        rank_from: Rank,
        rank_to: Rank,
    ) -> Result<(), WriteError> {
        self.advance(WritePhase::Proposed);
        let plan = match rank::plan_move(view.records(), id, rank_from, rank_to) {
            Ok(plan) => plan,
            Err(err) => {
                self.advance(WritePhase::Idle);
                return Err(err.into());
            }
        };
        if plan.is_noop() {
            self.advance(WritePhase::Idle);
            return Ok(());
        }
        tracing::debug!(
            entity = ?T::KIND,
            id,
            rank_from,
            rank_to,
            shifted = plan.shifts.len(),
            "reorder planned"
        );

        let commit = commit_rank_shifts::<T>(Arc::clone(&self.cache), plan.shifts.clone());
        self.run_optimistic(
            view,
            "reorder",
            |records| {
                rank::apply_shifts(records, &plan);
            },
            commit,
        )
        .await?;

        tracing::info!(entity = ?T::KIND, id, rank_from, rank_to, "reorder committed");
        Ok(())
    }

    /// Appends `record` to `view` and persists it.
    ///
    /// A ranked record must take the next rank (`N + 1`) of the cached
    /// collection; anything else is rejected before the view is touched.
    pub async fn create<T: Record>(
        &mut self,
        view: &mut LocalView<T>,
        record: T,
    ) -> Result<T, WriteError> {
        self.advance(WritePhase::Proposed);
        let snapshot = self.cache.load().await?;
        if view.get(record.id()).is_some() || T::collection(&snapshot).contains(record.id()) {
            self.advance(WritePhase::Idle);
            return Err(WriteError::InvalidArgument(format!(
                "{:?} {} already exists",
                T::KIND,
                record.id()
            )));
        }
        if let Some(rank) = record.rank_column() {
            let expected = Rank::try_from(T::collection(&snapshot).len() + 1).unwrap_or(Rank::MAX);
            if rank != expected {
                self.advance(WritePhase::Idle);
                return Err(WriteError::InvalidArgument(format!(
                    "new {:?} {} must take rank {expected}, not {rank}",
                    T::KIND,
                    record.id()
                )));
            }
        }

        let commit = commit_records(Arc::clone(&self.cache), vec![record.clone()]);
        let local = record.clone();
        self.run_optimistic(view, "create", move |records| records.push(local), commit)
            .await?;

        tracing::info!(entity = ?T::KIND, id = record.id(), "record created");
        Ok(record)
    }

    /// Applies `patch` to the record `id` and persists the result.
    ///
    /// The persisted record is the cached one with `patch` applied, so stale
    /// fields in `view` are never written back.
    pub async fn update<T: Record>(
        &mut self,
        view: &mut LocalView<T>,
        id: &str,
        patch: T::Patch,
    ) -> Result<T, WriteError> {
        self.advance(WritePhase::Proposed);
        let Some(current) = view.get(id) else {
            self.advance(WritePhase::Idle);
            return Err(WriteError::UnknownRecord {
                kind: T::KIND,
                id: id.to_string(),
            });
        };
        if patch.is_empty() {
            let current = current.clone();
            self.advance(WritePhase::Idle);
            return Ok(current);
        }

        let snapshot = self.cache.load().await?;
        let mut updated = T::collection(&snapshot)
            .get(id)
            .cloned()
            .ok_or_else(|| WriteError::UnknownRecord {
                kind: T::KIND,
                id: id.to_string(),
            })?;
        patch.apply_to(&mut updated);

        let commit = commit_records(Arc::clone(&self.cache), vec![updated.clone()]);
        self.run_optimistic(
            view,
            "update",
            |records| {
                if let Some(rec) = records.iter_mut().find(|r| r.id() == id) {
                    patch.apply_to(rec);
                }
            },
            commit,
        )
        .await?;

        tracing::info!(entity = ?T::KIND, id, "record updated");
        Ok(updated)
    }

    /// Creates a job at the end of the ranking (`N + 1`).
    pub async fn create_job(
        &mut self,
        view: &mut LocalView<Job>,
        draft: JobDraft,
    ) -> Result<Job, WriteError> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(WriteError::InvalidArgument("job title is required".to_string()));
        }
        let slug = draft.slug.unwrap_or_else(|| slugify(&title));
        if slug.is_empty() {
            return Err(WriteError::InvalidArgument(format!(
                "job title {title:?} yields an empty slug"
            )));
        }

        let snapshot = self.cache.load().await?;
        let jobs = snapshot.jobs.as_slice();
        if jobs.iter().any(|j| j.slug == slug) {
            return Err(WriteError::InvalidArgument(format!(
                "job slug {slug:?} is taken"
            )));
        }

        let job = Job {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            slug,
            status: draft.status,
            tags: draft.tags,
            rank: rank::next_rank(jobs),
        };
        self.create(view, job).await
    }

    /// Archives a job. Its rank slot is kept; nothing is renumbered.
    pub async fn archive_job(
        &mut self,
        view: &mut LocalView<Job>,
        id: &str,
    ) -> Result<Job, WriteError> {
        let patch = JobPatch {
            status: Some(JobStatus::Archived),
            ..JobPatch::default()
        };
        self.update(view, id, patch).await
    }

    pub async fn create_candidate(
        &mut self,
        view: &mut LocalView<Candidate>,
        draft: CandidateDraft,
    ) -> Result<Candidate, WriteError> {
        let name = draft.name.trim().to_string();
        let email = draft.email.trim().to_string();
        if name.is_empty() || email.is_empty() {
            return Err(WriteError::InvalidArgument(
                "candidate name and email are required".to_string(),
            ));
        }
        self.require_job(&draft.job_id).await?;

        let candidate = Candidate {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            email,
            job_id: draft.job_id,
            stage: draft.stage,
        };
        self.create(view, candidate).await
    }

    /// Kanban move of a candidate to another pipeline stage.
    pub async fn move_candidate(
        &mut self,
        view: &mut LocalView<Candidate>,
        id: &str,
        stage: CandidateStage,
    ) -> Result<Candidate, WriteError> {
        let patch = CandidatePatch {
            stage: Some(stage),
            ..CandidatePatch::default()
        };
        self.update(view, id, patch).await
    }

    /// Creates or replaces an assessment.
    pub async fn save_assessment(
        &mut self,
        view: &mut LocalView<Assessment>,
        assessment: Assessment,
    ) -> Result<Assessment, WriteError> {
        if assessment.title.trim().is_empty() {
            return Err(WriteError::InvalidArgument(
                "assessment title is required".to_string(),
            ));
        }
        self.require_job(&assessment.job_id).await?;

        if view.get(&assessment.id).is_none() {
            return self.create(view, assessment).await;
        }

        self.advance(WritePhase::Proposed);
        let commit = commit_records(Arc::clone(&self.cache), vec![assessment.clone()]);
        let local = assessment.clone();
        self.run_optimistic(
            view,
            "save_assessment",
            move |records| {
                if let Some(rec) = records.iter_mut().find(|r| r.id == local.id) {
                    *rec = local;
                }
            },
            commit,
        )
        .await?;

        tracing::info!(id = %assessment.id, job_id = %assessment.job_id, "assessment saved");
        Ok(assessment)
    }

    async fn require_job(&self, job_id: &str) -> Result<(), WriteError> {
        let snapshot = self.cache.load().await?;
        if snapshot.jobs.contains(job_id) {
            Ok(())
        } else {
            Err(WriteError::InvalidArgument(format!("unknown job {job_id}")))
        }
    }

    async fn run_optimistic<T, Fut>(
        &mut self,
        view: &mut LocalView<T>,
        label: &'static str,
        mutate: impl FnOnce(&mut Vec<T>),
        commit: Fut,
    ) -> Result<(), WriteError>
    where
        T: Record,
        Fut: Future<Output = PersistResult<()>>,
    {
        let snapshot = view.snapshot();
        mutate(view.records_mut());
        self.advance(WritePhase::OptimisticallyApplied);

        match self.channel.execute(label, commit).await {
            Ok(()) => {
                self.advance(WritePhase::Committed);
                Ok(())
            }
            Err(err) => {
                view.restore(snapshot);
                self.advance(WritePhase::RolledBack);
                tracing::warn!(entity = ?T::KIND, op = label, error = %err, "write rolled back");
                Err(WriteError::RolledBack(err))
            }
        }
    }

    fn advance(&mut self, next: WritePhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal write phase transition {:?} -> {:?}",
            self.phase,
            next
        );
        tracing::trace!(from = ?self.phase, to = ?next, "write phase");
        self.phase = next;
    }
}

async fn commit_rank_shifts<T: Ranked>(
    cache: Arc<ReadThroughCache>,
    shifts: Vec<RankShift>,
) -> PersistResult<()> {
    let snapshot = cache.load().await?;
    let collection = T::collection(&snapshot);
    let mut updated = Vec::with_capacity(shifts.len());
    for shift in &shifts {
        let mut rec = collection.get(&shift.id).cloned().ok_or_else(|| {
            PersistError::Message(format!("{:?} {} missing from cache", T::KIND, shift.id))
        })?;
        rec.set_rank(shift.to);
        updated.push(rec);
    }
    commit_records(cache, updated).await
}

// Table first, cache second: the cache only ever reflects confirmed rows.
async fn commit_records<T: Record>(
    cache: Arc<ReadThroughCache>,
    records: Vec<T>,
) -> PersistResult<()> {
    let tables = Arc::clone(cache.tables());
    let rows = records.clone();
    tokio::task::spawn_blocking(move || match rows.as_slice() {
        [one] => persist::store_one(tables.as_ref(), one),
        many => persist::store_all(tables.as_ref(), many),
    })
    .await
    .map_err(|e| PersistError::Message(format!("join error: {e}")))??;

    cache.apply_writes(records).await;
    Ok(())
}
