//! Optimistic, rank-preserving synchronization for a hiring board.
//!
//! Jobs carry a dense rank (`1..=N`) that drag-and-drop reorders must keep
//! gap-free. Writes are applied to the caller's [`engine::view::LocalView`]
//! first, confirmed over a simulated [`channel::UnreliableChannel`], and
//! then mirrored into the persistent tables and the
//! [`core::cache::ReadThroughCache`]. A failed confirmation restores the
//! view from its snapshot. Page queries ([`query::QueryEngine`]) read the
//! cache only.
//!
//! # Examples
//!
//! Pure page query over a slice:
//! ```
//! use hirelog::{
//!     query::{QueryParams, fields::JobField, paginate},
//!     record::Job,
//!     types::{JobStatus, SortDirection},
//! };
//!
//! let jobs: Vec<Job> = (1..=5)
//!     .map(|i| Job {
//!         id: format!("job-{i}"),
//!         title: format!("Engineer {i}"),
//!         slug: format!("engineer-{i}"),
//!         status: JobStatus::Active,
//!         tags: vec![],
//!         rank: i,
//!     })
//!     .collect();
//!
//! let params = QueryParams::page(1, 2).with_sort(JobField::Rank, SortDirection::Desc);
//! let page = paginate(&jobs, &params).expect("valid params");
//! assert_eq!(page.items[0].id, "job-5");
//! assert_eq!(page.total_pages, 3);
//! assert!(page.has_next);
//! ```
//!
//! Optimistic reorder against in-memory tables:
//! ```
//! use std::sync::Arc;
//!
//! use hirelog::{
//!     channel::{ChannelConfig, ScriptedFaults, UnreliableChannel},
//!     core::cache::ReadThroughCache,
//!     engine::sync::SyncEngine,
//!     persist::memory::MemoryTables,
//!     record::Job,
//!     seed::{self, SeedPlan},
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let cache = Arc::new(ReadThroughCache::new(Arc::new(MemoryTables::new())));
//! seed::reseed(&cache, &SeedPlan { jobs: 5, candidates: 0, assessments: 0, seed: 1 })
//!     .await
//!     .expect("seed");
//!
//! let channel = UnreliableChannel::new(
//!     ChannelConfig::instant(),
//!     Box::new(ScriptedFaults::always_pass()),
//! )
//! .expect("channel");
//! let mut engine = SyncEngine::new(Arc::clone(&cache), channel);
//! let mut jobs = engine.open_view::<Job>().await.expect("view");
//!
//! let first = jobs.ids_by_rank()[0].clone();
//! engine.reorder(&mut jobs, &first, 1, 4).await.expect("reorder");
//! assert_eq!(jobs.ids_by_rank()[3], first);
//! # }
//! ```

/// Simulated unreliable remote channel for writes.
pub mod channel;
/// Read-through cache and dense-rank helpers.
pub mod core;
/// Optimistic write engine with rollback.
pub mod engine;
/// Persistent table abstraction and implementations.
pub mod persist;
/// Search, filter, sort, and pagination.
pub mod query;
/// Hiring-board records and patches.
pub mod record;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Deterministic fixtures and reseeding.
pub mod seed;
/// Tracing subscriber setup.
pub mod telemetry;
/// Shared primitive types and enums.
pub mod types;
