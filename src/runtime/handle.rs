use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::{
    channel::UnreliableChannel,
    core::cache::ReadThroughCache,
    engine::{WriteError, sync::SyncEngine, view::LocalView},
    persist::PersistError,
    query::{
        QueryEngine, QueryError, QueryParams, QueryResult,
        fields::{AssessmentField, CandidateField, JobField},
    },
    record::{
        Assessment, Candidate, CandidateDraft, CandidatePatch, Job, JobDraft, JobPatch, Record,
    },
    seed::{self, SeedPlan},
    types::{CandidateStage, Rank, RecordId},
};

use super::events::BoardEvent;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("board runtime is gone")]
    ChannelClosed,
}

impl RuntimeError {
    /// True when a write was attempted, failed remotely, and was undone locally.
    pub fn is_rolled_back(&self) -> bool {
        matches!(self, RuntimeError::Write(err) if err.is_rolled_back())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub command_queue_bound: usize,
    pub event_queue_bound: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command_queue_bound: 64,
            event_queue_bound: 256,
        }
    }
}

/// Cloneable front door to the board loop.
///
/// Every command is handled to completion before the next is read, so at
/// most one write is ever in flight.
#[derive(Clone)]
pub struct BoardHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<BoardEvent>,
}

type Reply<T> = oneshot::Sender<Result<T, RuntimeError>>;

enum Command {
    QueryJobs {
        params: QueryParams<JobField>,
        resp: Reply<QueryResult<Job>>,
    },
    QueryCandidates {
        params: QueryParams<CandidateField>,
        resp: Reply<QueryResult<Candidate>>,
    },
    QueryAssessments {
        params: QueryParams<AssessmentField>,
        resp: Reply<QueryResult<Assessment>>,
    },
    JobsByRank {
        resp: Reply<Vec<RecordId>>,
    },
    CreateJob {
        draft: JobDraft,
        resp: Reply<Job>,
    },
    UpdateJob {
        id: RecordId,
        patch: JobPatch,
        resp: Reply<Job>,
    },
    ArchiveJob {
        id: RecordId,
        resp: Reply<Job>,
    },
    ReorderJob {
        id: RecordId,
        rank_from: Rank,
        rank_to: Rank,
        resp: Reply<()>,
    },
    CreateCandidate {
        draft: CandidateDraft,
        resp: Reply<Candidate>,
    },
    UpdateCandidate {
        id: RecordId,
        patch: CandidatePatch,
        resp: Reply<Candidate>,
    },
    MoveCandidate {
        id: RecordId,
        stage: CandidateStage,
        resp: Reply<Candidate>,
    },
    SaveAssessment {
        assessment: Assessment,
        resp: Reply<Assessment>,
    },
    Reseed {
        plan: SeedPlan,
        resp: Reply<seed::SeedReport>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

struct Board {
    engine: SyncEngine,
    queries: QueryEngine,
    jobs: Option<LocalView<Job>>,
    candidates: Option<LocalView<Candidate>>,
    assessments: Option<LocalView<Assessment>>,
}

pub fn spawn_board(
    cache: Arc<ReadThroughCache>,
    channel: UnreliableChannel,
    config: RuntimeConfig,
) -> BoardHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound.max(1));
    let (events_tx, _) = broadcast::channel::<BoardEvent>(config.event_queue_bound.max(1));

    let events_tx_loop = events_tx.clone();
    let mut board = Board {
        engine: SyncEngine::new(Arc::clone(&cache), channel),
        queries: QueryEngine::new(cache),
        jobs: None,
        candidates: None,
        assessments: None,
    };

    tokio::spawn(async move {
        while let Some(cmd) = cmd_rx.recv().await {
            if handle_command(cmd, &mut board, &events_tx_loop).await {
                break;
            }
        }
        tracing::debug!("board loop stopped");
    });

    BoardHandle { cmd_tx, events_tx }
}

impl BoardHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.events_tx.subscribe()
    }

    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn query_jobs(
        &self,
        params: QueryParams<JobField>,
    ) -> Result<QueryResult<Job>, RuntimeError> {
        self.call(|resp| Command::QueryJobs { params, resp }).await
    }

    pub async fn query_candidates(
        &self,
        params: QueryParams<CandidateField>,
    ) -> Result<QueryResult<Candidate>, RuntimeError> {
        self.call(|resp| Command::QueryCandidates { params, resp })
            .await
    }

    pub async fn query_assessments(
        &self,
        params: QueryParams<AssessmentField>,
    ) -> Result<QueryResult<Assessment>, RuntimeError> {
        self.call(|resp| Command::QueryAssessments { params, resp })
            .await
    }

    /// Job ids in the order of the board's local view.
    pub async fn jobs_by_rank(&self) -> Result<Vec<RecordId>, RuntimeError> {
        self.call(|resp| Command::JobsByRank { resp }).await
    }

    pub async fn create_job(&self, draft: JobDraft) -> Result<Job, RuntimeError> {
        self.call(|resp| Command::CreateJob { draft, resp }).await
    }

    pub async fn update_job(
        &self,
        id: impl Into<RecordId>,
        patch: JobPatch,
    ) -> Result<Job, RuntimeError> {
        let id = id.into();
        self.call(|resp| Command::UpdateJob { id, patch, resp })
            .await
    }

    pub async fn archive_job(&self, id: impl Into<RecordId>) -> Result<Job, RuntimeError> {
        let id = id.into();
        self.call(|resp| Command::ArchiveJob { id, resp }).await
    }

    pub async fn reorder_job(
        &self,
        id: impl Into<RecordId>,
        rank_from: Rank,
        rank_to: Rank,
    ) -> Result<(), RuntimeError> {
        let id = id.into();
        self.call(|resp| Command::ReorderJob {
            id,
            rank_from,
            rank_to,
            resp,
        })
        .await
    }

    pub async fn create_candidate(&self, draft: CandidateDraft) -> Result<Candidate, RuntimeError> {
        self.call(|resp| Command::CreateCandidate { draft, resp })
            .await
    }

    pub async fn update_candidate(
        &self,
        id: impl Into<RecordId>,
        patch: CandidatePatch,
    ) -> Result<Candidate, RuntimeError> {
        let id = id.into();
        self.call(|resp| Command::UpdateCandidate { id, patch, resp })
            .await
    }

    pub async fn move_candidate(
        &self,
        id: impl Into<RecordId>,
        stage: CandidateStage,
    ) -> Result<Candidate, RuntimeError> {
        let id = id.into();
        self.call(|resp| Command::MoveCandidate { id, stage, resp })
            .await
    }

    pub async fn save_assessment(&self, assessment: Assessment) -> Result<Assessment, RuntimeError> {
        self.call(|resp| Command::SaveAssessment { assessment, resp })
            .await
    }

    pub async fn reseed(&self, plan: SeedPlan) -> Result<seed::SeedReport, RuntimeError> {
        self.call(|resp| Command::Reseed { plan, resp }).await
    }

    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Shutdown { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }
}

async fn handle_command(
    cmd: Command,
    board: &mut Board,
    events_tx: &broadcast::Sender<BoardEvent>,
) -> bool {
    match cmd {
        Command::QueryJobs { params, resp } => {
            let res = board.queries.query_page::<Job>(&params).await.map_err(Into::into);
            let _ = resp.send(res);
        }
        Command::QueryCandidates { params, resp } => {
            let res = board.queries.query_page::<Candidate>(&params).await.map_err(Into::into);
            let _ = resp.send(res);
        }
        Command::QueryAssessments { params, resp } => {
            let res = board.queries.query_page::<Assessment>(&params).await.map_err(Into::into);
            let _ = resp.send(res);
        }
        Command::JobsByRank { resp } => {
            let res = ensure_view(&mut board.jobs, &board.engine)
                .await
                .map(|view| view.ids_by_rank())
                .map_err(Into::into);
            let _ = resp.send(res);
        }
        Command::CreateJob { draft, resp } => {
            let res = match ensure_view(&mut board.jobs, &board.engine).await {
                Ok(view) => board.engine.create_job(view, draft).await,
                Err(err) => Err(err),
            };
            let _ = resp.send(publish_record(events_tx, res, None));
        }
        Command::UpdateJob { id, patch, resp } => {
            let res = match ensure_view(&mut board.jobs, &board.engine).await {
                Ok(view) => board.engine.update(view, &id, patch).await,
                Err(err) => Err(err),
            };
            let _ = resp.send(publish_record(events_tx, res, Some(&id)));
        }
        Command::ArchiveJob { id, resp } => {
            let res = match ensure_view(&mut board.jobs, &board.engine).await {
                Ok(view) => board.engine.archive_job(view, &id).await,
                Err(err) => Err(err),
            };
            let _ = resp.send(publish_record(events_tx, res, Some(&id)));
        }
        Command::ReorderJob {
            id,
            rank_from,
            rank_to,
            resp,
        } => {
            let res = match ensure_view(&mut board.jobs, &board.engine).await {
                Ok(view) => board.engine.reorder(view, &id, rank_from, rank_to).await,
                Err(err) => Err(err),
            };
            match &res {
                Ok(()) if rank_from != rank_to => {
                    let _ = events_tx.send(BoardEvent::Reordered {
                        id: id.clone(),
                        rank_from,
                        rank_to,
                    });
                }
                Err(err) if err.is_rolled_back() => {
                    let _ = events_tx.send(BoardEvent::RolledBack {
                        kind: <Job as Record>::KIND,
                        id: Some(id.clone()),
                        reason: err.to_string(),
                    });
                }
                _ => {}
            }
            let _ = resp.send(res.map_err(Into::into));
        }
        Command::CreateCandidate { draft, resp } => {
            let res = match ensure_view(&mut board.candidates, &board.engine).await {
                Ok(view) => board.engine.create_candidate(view, draft).await,
                Err(err) => Err(err),
            };
            let _ = resp.send(publish_record(events_tx, res, None));
        }
        Command::UpdateCandidate { id, patch, resp } => {
            let res = match ensure_view(&mut board.candidates, &board.engine).await {
                Ok(view) => board.engine.update(view, &id, patch).await,
                Err(err) => Err(err),
            };
            let _ = resp.send(publish_record(events_tx, res, Some(&id)));
        }
        Command::MoveCandidate { id, stage, resp } => {
            let res = match ensure_view(&mut board.candidates, &board.engine).await {
                Ok(view) => board.engine.move_candidate(view, &id, stage).await,
                Err(err) => Err(err),
            };
            let _ = resp.send(publish_record(events_tx, res, Some(&id)));
        }
        Command::SaveAssessment { assessment, resp } => {
            let id = assessment.id.clone();
            let res = match ensure_view(&mut board.assessments, &board.engine).await {
                Ok(view) => board.engine.save_assessment(view, assessment).await,
                Err(err) => Err(err),
            };
            let _ = resp.send(publish_record(events_tx, res, Some(&id)));
        }
        Command::Reseed { plan, resp } => {
            let res = seed::reseed(board.engine.cache(), &plan).await;
            // Tables may be cleared even when the reseed fails.
            board.jobs = None;
            board.candidates = None;
            board.assessments = None;
            if let Ok(report) = &res {
                let _ = events_tx.send(BoardEvent::Reseeded {
                    jobs: report.jobs,
                    candidates: report.candidates,
                    assessments: report.assessments,
                });
            }
            let _ = resp.send(res.map_err(Into::into));
        }
        Command::Shutdown { resp } => {
            let _ = resp.send(());
            return true;
        }
    }

    false
}

async fn ensure_view<'a, T: Record>(
    slot: &'a mut Option<LocalView<T>>,
    engine: &SyncEngine,
) -> Result<&'a mut LocalView<T>, WriteError> {
    let view = match slot.take() {
        Some(view) => view,
        None => engine.open_view::<T>().await?,
    };
    Ok(slot.insert(view))
}

// `target` is `None` for creates, whose id is only known on success.
fn publish_record<T: Record>(
    events_tx: &broadcast::Sender<BoardEvent>,
    res: Result<T, WriteError>,
    target: Option<&RecordId>,
) -> Result<T, RuntimeError> {
    match &res {
        Ok(rec) => {
            let _ = events_tx.send(BoardEvent::Committed {
                kind: T::KIND,
                id: rec.id().to_string(),
            });
        }
        Err(err) if err.is_rolled_back() => {
            let _ = events_tx.send(BoardEvent::RolledBack {
                kind: T::KIND,
                id: target.cloned(),
                reason: err.to_string(),
            });
        }
        Err(_) => {}
    }
    res.map_err(Into::into)
}
