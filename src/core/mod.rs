//! In-memory cache and dense-rank helpers.

/// Read-through snapshot of the persistent tables.
pub mod cache;
/// Dense-rank invariant checks and move planning.
pub mod rank;
