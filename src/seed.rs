//! Deterministic fixtures and the full-reseed operation.

use std::sync::Arc;

use rand::{Rng, SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::{
    core::cache::ReadThroughCache,
    persist::{self, PersistError, PersistResult, PersistentTable},
    record::{Assessment, Candidate, Job, slugify},
    types::{CandidateStage, EntityKind, JobStatus, Rank},
};

const LEVELS: &[&str] = &["Junior", "Senior", "Staff", "Lead", "Principal"];
const ROLES: &[&str] = &[
    "Frontend Engineer",
    "Backend Engineer",
    "Platform Engineer",
    "Data Engineer",
    "Product Designer",
    "Product Manager",
    "QA Analyst",
    "Site Reliability Engineer",
];
const TAGS: &[&str] = &["remote", "onsite", "hybrid", "full-time", "contract", "urgent"];
const FIRST_NAMES: &[&str] = &[
    "Ada", "Grace", "Linus", "Margaret", "Alan", "Barbara", "Ken", "Radia", "Dennis", "Frances",
];
const LAST_NAMES: &[&str] = &[
    "Lovelace", "Hopper", "Torvalds", "Hamilton", "Turing", "Liskov", "Thompson", "Perlman",
    "Ritchie", "Allen",
];
const QUESTIONS: &[&str] = &[
    "Describe a system you designed end to end.",
    "How do you approach code review?",
    "Explain a production incident you resolved.",
    "What is your preferred testing strategy?",
    "How would you estimate a feature with unclear scope?",
    "Rate your experience with distributed systems (1-5).",
    "Which tools do you use for profiling?",
    "Tell us about a disagreement with a teammate.",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedPlan {
    pub jobs: usize,
    pub candidates: usize,
    pub assessments: usize,
    pub seed: u64,
}

impl Default for SeedPlan {
    fn default() -> Self {
        Self {
            jobs: 25,
            candidates: 1000,
            assessments: 3,
            seed: 7,
        }
    }
}

/// Generated rows for every table.
#[derive(Debug, Clone, PartialEq)]
pub struct Fixtures {
    pub jobs: Vec<Job>,
    pub candidates: Vec<Candidate>,
    pub assessments: Vec<Assessment>,
}

impl SeedPlan {
    /// Same plan and seed always yield the same fixtures.
    pub fn generate(&self) -> Fixtures {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let jobs: Vec<Job> = (0..self.jobs)
            .map(|i| {
                let title = format!(
                    "{} {}",
                    pick(&mut rng, LEVELS),
                    pick(&mut rng, ROLES)
                );
                let slug = format!("{}-{}", slugify(&title), i + 1);
                let status = if rng.gen_bool(0.7) {
                    JobStatus::Active
                } else {
                    JobStatus::Archived
                };
                let tag_count = rng.gen_range(1..=3);
                let tags = TAGS
                    .choose_multiple(&mut rng, tag_count)
                    .map(|t| t.to_string())
                    .collect();
                Job {
                    id: seeded_id(&mut rng),
                    title,
                    slug,
                    status,
                    tags,
                    rank: (i + 1) as Rank,
                }
            })
            .collect();

        let candidates = if jobs.is_empty() {
            Vec::new()
        } else {
            (0..self.candidates)
                .map(|i| {
                    let first = pick(&mut rng, FIRST_NAMES);
                    let last = pick(&mut rng, LAST_NAMES);
                    let job = &jobs[rng.gen_range(0..jobs.len())];
                    let stage = CandidateStage::ALL[rng.gen_range(0..CandidateStage::ALL.len())];
                    Candidate {
                        id: seeded_id(&mut rng),
                        name: format!("{first} {last}"),
                        email: format!(
                            "{}.{}{}@example.com",
                            first.to_lowercase(),
                            last.to_lowercase(),
                            i + 1
                        ),
                        job_id: job.id.clone(),
                        stage,
                    }
                })
                .collect()
        };

        let assessments = jobs
            .iter()
            .take(self.assessments)
            .map(|job| {
                let count = rng.gen_range(3..=QUESTIONS.len());
                Assessment {
                    id: seeded_id(&mut rng),
                    job_id: job.id.clone(),
                    title: format!("{} Assessment", job.title),
                    questions: QUESTIONS
                        .choose_multiple(&mut rng, count)
                        .map(|q| q.to_string())
                        .collect(),
                }
            })
            .collect();

        Fixtures {
            jobs,
            candidates,
            assessments,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub jobs: usize,
    pub candidates: usize,
    pub assessments: usize,
}

/// Clears every table, writes fresh fixtures, and invalidates `cache`.
///
/// The cache is invalidated whether or not the writes succeed.
///
/// This bypasses the channel; it models an out-of-band reset of the backend.
pub async fn reseed(cache: &ReadThroughCache, plan: &SeedPlan) -> PersistResult<SeedReport> {
    let fixtures = plan.generate();
    let report = SeedReport {
        jobs: fixtures.jobs.len(),
        candidates: fixtures.candidates.len(),
        assessments: fixtures.assessments.len(),
    };

    let tables = Arc::clone(cache.tables());
    let written = tokio::task::spawn_blocking(move || write_fixtures(tables.as_ref(), &fixtures))
        .await
        .map_err(|e| PersistError::Message(format!("join error: {e}")))
        .and_then(|res| res);

    // A failed reseed can leave the tables cleared or half written; the old
    // snapshot must not outlive it either way.
    cache.invalidate().await;
    if let Err(err) = written {
        tracing::warn!(error = %err, seed = plan.seed, "reseed failed");
        return Err(err);
    }
    tracing::info!(
        jobs = report.jobs,
        candidates = report.candidates,
        assessments = report.assessments,
        seed = plan.seed,
        "tables reseeded"
    );
    Ok(report)
}

fn write_fixtures(tables: &dyn PersistentTable, fixtures: &Fixtures) -> PersistResult<()> {
    for kind in EntityKind::ALL {
        tables.clear(kind)?;
    }
    persist::store_all(tables, &fixtures.jobs)?;
    persist::store_all(tables, &fixtures.candidates)?;
    persist::store_all(tables, &fixtures.assessments)?;
    Ok(())
}

fn pick<'a>(rng: &mut ChaCha8Rng, values: &[&'a str]) -> &'a str {
    values[rng.gen_range(0..values.len())]
}

fn seeded_id(rng: &mut ChaCha8Rng) -> String {
    uuid::Builder::from_random_bytes(rng.r#gen::<[u8; 16]>())
        .into_uuid()
        .to_string()
}
