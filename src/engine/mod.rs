//! Optimistic write engine: dense-rank reorders and record mutations with rollback.

/// Reorder, create, and update paths over the unreliable channel.
pub mod sync;
/// Local views and operation snapshots.
pub mod view;

use thiserror::Error;

use crate::{
    channel::ChannelError,
    core::rank::RankError,
    persist::PersistError,
    types::{EntityKind, RecordId},
};

/// Outcome of any mutating operation.
///
/// Validation variants are raised before anything is touched. `RolledBack`
/// is returned only after the caller's local view has been restored.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("out of range: {0}")]
    OutOfRange(#[from] RankError),
    #[error("no {kind:?} with id {id}")]
    UnknownRecord { kind: EntityKind, id: RecordId },
    #[error("rolled back: {0}")]
    RolledBack(#[source] ChannelError),
    #[error(transparent)]
    Cache(#[from] PersistError),
}

impl WriteError {
    pub fn is_rolled_back(&self) -> bool {
        matches!(self, WriteError::RolledBack(_))
    }

    /// True when the rollback came from an injected failure rather than the backend.
    pub fn is_simulated(&self) -> bool {
        matches!(
            self,
            WriteError::RolledBack(ChannelError::Simulated { .. })
        )
    }
}

/// Reorders share the error type of every other write.
pub type ReorderError = WriteError;

/// Lifecycle of one optimistic write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePhase {
    #[default]
    Idle,
    Proposed,
    OptimisticallyApplied,
    Committed,
    RolledBack,
}

impl WritePhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, WritePhase::Committed | WritePhase::RolledBack)
    }

    pub fn can_advance_to(self, next: WritePhase) -> bool {
        use WritePhase::*;
        matches!(
            (self, next),
            (Idle | Proposed | Committed | RolledBack, Proposed)
                | (Proposed, Idle | OptimisticallyApplied)
                | (OptimisticallyApplied, Committed | RolledBack)
        )
    }
}
