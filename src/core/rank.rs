//! Dense-rank bookkeeping: for N records the ranks are exactly `1..=N`.

use hashbrown::HashMap;
use thiserror::Error;

use crate::{
    record::Ranked,
    types::{Rank, RecordId},
};

/// Why a move or density check was refused. Raised before any rank changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankError {
    /// A requested rank falls outside the collection.
    #[error("rank {rank} outside 1..={len}")]
    OutOfBounds { rank: Rank, len: usize },
    #[error("no ranked record with id {0}")]
    UnknownId(RecordId),
    /// The caller's `rank_from` disagrees with the record's current rank.
    #[error("record {id} holds rank {actual}, not {claimed}")]
    Mismatch {
        id: RecordId,
        claimed: Rank,
        actual: Rank,
    },
    /// Ranks are missing, duplicated, or out of range.
    #[error("rank {rank} is {problem}")]
    NotDense { rank: Rank, problem: &'static str },
}

/// One record's rank transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankShift {
    pub id: RecordId,
    /// Rank held before the move.
    pub from: Rank,
    /// Rank held after the move.
    pub to: Rank,
}

/// Every rank change needed to move one record, moved record included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    /// The record being moved.
    pub id: RecordId,
    pub rank_from: Rank,
    pub rank_to: Rank,
    /// In slice order; empty when `rank_from == rank_to`.
    pub shifts: Vec<RankShift>,
}

impl MovePlan {
    /// True when the move leaves every rank where it was.
    pub fn is_noop(&self) -> bool {
        self.shifts.is_empty()
    }
}

/// Verifies the ranks of `records` are exactly `1..=records.len()`.
pub fn check_dense<T: Ranked>(records: &[T]) -> Result<(), RankError> {
    let mut seen = vec![false; records.len()];
    for rec in records {
        let rank = rec.rank();
        let slot = (rank as usize).checked_sub(1).filter(|&i| i < seen.len());
        let Some(slot) = slot else {
            return Err(RankError::NotDense {
                rank,
                problem: "outside the collection",
            });
        };
        if seen[slot] {
            return Err(RankError::NotDense {
                rank,
                problem: "duplicated",
            });
        }
        seen[slot] = true;
    }
    Ok(())
}

/// Computes the shifts for moving `id` from `rank_from` to `rank_to`.
///
/// Moving later pulls every record in `(rank_from, rank_to]` up by one;
/// moving earlier pushes every record in `[rank_to, rank_from)` down by one.
/// Nothing is mutated; every error is raised before a caller can apply a
/// partial shift.
pub fn plan_move<T: Ranked>(
    records: &[T],
    id: &str,
    rank_from: Rank,
    rank_to: Rank,
) -> Result<MovePlan, RankError> {
    let len = records.len();
    for rank in [rank_from, rank_to] {
        if rank == 0 || rank as usize > len {
            return Err(RankError::OutOfBounds { rank, len });
        }
    }

    let moved = records
        .iter()
        .find(|r| r.id() == id)
        .ok_or_else(|| RankError::UnknownId(id.to_string()))?;
    if moved.rank() != rank_from {
        return Err(RankError::Mismatch {
            id: id.to_string(),
            claimed: rank_from,
            actual: moved.rank(),
        });
    }
    check_dense(records)?;

    let mut shifts = Vec::new();
    if rank_from == rank_to {
        return Ok(MovePlan {
            id: id.to_string(),
            rank_from,
            rank_to,
            shifts,
        });
    }

    for rec in records {
        let rank = rec.rank();
        let to = if rec.id() == id {
            rank_to
        } else if rank_from < rank_to && rank > rank_from && rank <= rank_to {
            rank - 1
        } else if rank_from > rank_to && rank >= rank_to && rank < rank_from {
            rank + 1
        } else {
            continue;
        };
        shifts.push(RankShift {
            id: rec.id().to_string(),
            from: rank,
            to,
        });
    }

    Ok(MovePlan {
        id: id.to_string(),
        rank_from,
        rank_to,
        shifts,
    })
}

/// Writes the plan's target ranks onto `records`; returns how many changed.
pub fn apply_shifts<T: Ranked>(records: &mut [T], plan: &MovePlan) -> usize {
    let targets: HashMap<&str, Rank> = plan
        .shifts
        .iter()
        .map(|s| (s.id.as_str(), s.to))
        .collect();

    let mut changed = 0;
    for rec in records.iter_mut() {
        if let Some(&to) = targets.get(rec.id()) {
            rec.set_rank(to);
            changed += 1;
        }
    }
    changed
}

/// Rank for a record appended to `records`.
pub fn next_rank<T: Ranked>(records: &[T]) -> Rank {
    Rank::try_from(records.len()).map_or(Rank::MAX, |n| n.saturating_add(1))
}

/// Ids of `records` ordered by ascending rank.
pub fn ids_by_rank<T: Ranked>(records: &[T]) -> Vec<RecordId> {
    let mut ranked: Vec<&T> = records.iter().collect();
    ranked.sort_by_key(|r| r.rank());
    ranked.into_iter().map(|r| r.id().to_string()).collect()
}
