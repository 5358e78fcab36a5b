//! Runtime event stream payloads.

use crate::types::{EntityKind, Rank, RecordId};

/// Events emitted from the single-writer board loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    /// A create or update reached the table and the cache.
    Committed {
        /// Table written.
        kind: EntityKind,
        /// Record written.
        id: RecordId,
    },
    /// A reorder reached the table and the cache.
    Reordered {
        /// Moved record.
        id: RecordId,
        /// Rank before the move.
        rank_from: Rank,
        /// Rank after the move.
        rank_to: Rank,
    },
    /// A write failed and the local view was restored.
    RolledBack {
        /// Table targeted.
        kind: EntityKind,
        /// Record targeted; `None` for a create, whose id is assigned on commit.
        id: Option<RecordId>,
        /// Human-readable failure.
        reason: String,
    },
    /// Every table was reseeded; cached data and local views were dropped.
    Reseeded {
        /// Jobs written.
        jobs: usize,
        /// Candidates written.
        candidates: usize,
        /// Assessments written.
        assessments: usize,
    },
}
