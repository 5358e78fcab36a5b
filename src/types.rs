//! Shared primitive IDs and hiring-board enums.

use serde::{Deserialize, Serialize};

/// Opaque record identifier, immutable after creation.
pub type RecordId = String;
/// One-based position of a record inside its ranked collection.
pub type Rank = u32;

/// Entity type; each kind is stored as its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Job postings.
    Job,
    /// Applicants attached to a job.
    Candidate,
    /// Per-job assessments.
    Assessment,
}

impl EntityKind {
    /// Every kind, in load order.
    pub const ALL: [EntityKind; 3] = [EntityKind::Job, EntityKind::Candidate, EntityKind::Assessment];

    /// Name of the backing table.
    pub fn table_name(self) -> &'static str {
        match self {
            EntityKind::Job => "jobs",
            EntityKind::Candidate => "candidates",
            EntityKind::Assessment => "assessments",
        }
    }
}

/// Job visibility. Archived jobs keep their rank slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Open and listed.
    #[default]
    Active,
    /// Hidden from the default board but still ranked.
    Archived,
}

impl JobStatus {
    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Active => "active",
            JobStatus::Archived => "archived",
        }
    }
}

/// Pipeline stage of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStage {
    /// Application received.
    #[default]
    Applied,
    /// Phone or recruiter screen.
    Screen,
    /// Technical interview loop.
    Tech,
    /// Offer extended.
    Offer,
    /// Offer accepted.
    Hired,
    /// Closed out.
    Rejected,
}

impl CandidateStage {
    /// Every stage, in pipeline order.
    pub const ALL: [CandidateStage; 6] = [
        CandidateStage::Applied,
        CandidateStage::Screen,
        CandidateStage::Tech,
        CandidateStage::Offer,
        CandidateStage::Hired,
        CandidateStage::Rejected,
    ];

    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateStage::Applied => "applied",
            CandidateStage::Screen => "screen",
            CandidateStage::Tech => "tech",
            CandidateStage::Offer => "offer",
            CandidateStage::Hired => "hired",
            CandidateStage::Rejected => "rejected",
        }
    }
}

/// Sort direction for page queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}
