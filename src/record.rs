//! Hiring-board records, drafts, sparse patches, and the traits the engines bind on.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    core::cache::{CacheSnapshot, Collection},
    types::{CandidateStage, EntityKind, JobStatus, Rank, RecordId},
};

/// Any entity stored in a table and mirrored in the cache.
pub trait Record: Clone + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Table this record lives in.
    const KIND: EntityKind;
    /// Sparse patch type for optimistic updates.
    type Patch: RecordPatch<Self>;

    /// Stable identifier.
    fn id(&self) -> &str;

    /// Typed slot of this kind inside a cache snapshot.
    fn collection(snapshot: &CacheSnapshot) -> &Collection<Self>;

    /// Mutable slot of this kind inside a cache snapshot.
    fn collection_mut(snapshot: &mut CacheSnapshot) -> &mut Collection<Self>;

    /// Rank column value, for kinds that participate in an ordering.
    fn rank_column(&self) -> Option<Rank> {
        None
    }
}

/// A record participating in a dense rank ordering.
pub trait Ranked: Record {
    /// Current one-based rank.
    fn rank(&self) -> Rank;
    /// Overwrites the rank.
    fn set_rank(&mut self, rank: Rank);
}

/// Sparse patch where each `Some` field overwrites the record value.
pub trait RecordPatch<R>: Clone + Send + Sync + 'static {
    /// Returns true when no fields are set.
    fn is_empty(&self) -> bool;
    /// Applies this patch in place to `rec`.
    fn apply_to(&self, rec: &mut R);
}

/// Job posting; the ranked collection of the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Stable job identifier.
    pub id: RecordId,
    /// Display title.
    pub title: String,
    /// URL slug, unique across jobs.
    pub slug: String,
    /// Listing status.
    pub status: JobStatus,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Board position.
    pub rank: Rank,
}

/// Insert payload used to create a new [`Job`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobDraft {
    /// Display title.
    pub title: String,
    /// Optional slug; derived from the title when absent.
    pub slug: Option<String>,
    /// Initial status.
    pub status: JobStatus,
    /// Free-form tags.
    pub tags: Vec<String>,
}

/// Sparse job patch. Rank changes go through reorder.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobPatch {
    /// Optional replacement title.
    pub title: Option<String>,
    /// Optional replacement slug.
    pub slug: Option<String>,
    /// Optional replacement status.
    pub status: Option<JobStatus>,
    /// Optional replacement tag list.
    pub tags: Option<Vec<String>>,
}

impl RecordPatch<Job> for JobPatch {
    fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn apply_to(&self, rec: &mut Job) {
        if let Some(v) = &self.title {
            rec.title = v.clone();
        }
        if let Some(v) = &self.slug {
            rec.slug = v.clone();
        }
        if let Some(v) = self.status {
            rec.status = v;
        }
        if let Some(v) = &self.tags {
            rec.tags = v.clone();
        }
    }
}

impl Record for Job {
    const KIND: EntityKind = EntityKind::Job;
    type Patch = JobPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn collection(snapshot: &CacheSnapshot) -> &Collection<Self> {
        &snapshot.jobs
    }

    fn collection_mut(snapshot: &mut CacheSnapshot) -> &mut Collection<Self> {
        &mut snapshot.jobs
    }

    fn rank_column(&self) -> Option<Rank> {
        Some(self.rank)
    }
}

impl Ranked for Job {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn set_rank(&mut self, rank: Rank) {
        self.rank = rank;
    }
}

/// Applicant attached to a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Stable candidate identifier.
    pub id: RecordId,
    /// Full name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Job applied to.
    pub job_id: RecordId,
    /// Pipeline stage.
    pub stage: CandidateStage,
}

/// Insert payload used to create a new [`Candidate`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CandidateDraft {
    /// Full name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Job applied to.
    pub job_id: RecordId,
    /// Initial stage.
    pub stage: CandidateStage,
}

/// Sparse candidate patch; a kanban move sets only `stage`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CandidatePatch {
    /// Optional replacement name.
    pub name: Option<String>,
    /// Optional replacement email.
    pub email: Option<String>,
    /// Optional replacement job.
    pub job_id: Option<RecordId>,
    /// Optional replacement stage.
    pub stage: Option<CandidateStage>,
}

impl RecordPatch<Candidate> for CandidatePatch {
    fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn apply_to(&self, rec: &mut Candidate) {
        if let Some(v) = &self.name {
            rec.name = v.clone();
        }
        if let Some(v) = &self.email {
            rec.email = v.clone();
        }
        if let Some(v) = &self.job_id {
            rec.job_id = v.clone();
        }
        if let Some(v) = self.stage {
            rec.stage = v;
        }
    }
}

impl Record for Candidate {
    const KIND: EntityKind = EntityKind::Candidate;
    type Patch = CandidatePatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn collection(snapshot: &CacheSnapshot) -> &Collection<Self> {
        &snapshot.candidates
    }

    fn collection_mut(snapshot: &mut CacheSnapshot) -> &mut Collection<Self> {
        &mut snapshot.candidates
    }
}

/// Assessment authored for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    /// Stable assessment identifier.
    pub id: RecordId,
    /// Job this assessment belongs to.
    pub job_id: RecordId,
    /// Display title.
    pub title: String,
    /// Question prompts, in order.
    pub questions: Vec<String>,
}

/// Sparse assessment patch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssessmentPatch {
    /// Optional replacement title.
    pub title: Option<String>,
    /// Optional replacement question list.
    pub questions: Option<Vec<String>>,
}

impl RecordPatch<Assessment> for AssessmentPatch {
    fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn apply_to(&self, rec: &mut Assessment) {
        if let Some(v) = &self.title {
            rec.title = v.clone();
        }
        if let Some(v) = &self.questions {
            rec.questions = v.clone();
        }
    }
}

impl Record for Assessment {
    const KIND: EntityKind = EntityKind::Assessment;
    type Patch = AssessmentPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn collection(snapshot: &CacheSnapshot) -> &Collection<Self> {
        &snapshot.assessments
    }

    fn collection_mut(snapshot: &mut CacheSnapshot) -> &mut Collection<Self> {
        &mut snapshot.assessments
    }
}

/// Lowercase, dash-separated slug of `title`.
pub fn slugify(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_dash = false;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}
