use std::sync::Arc;

use tempfile::tempdir;

use hirelog::{
    channel::{ChannelConfig, ScriptedFaults, UnreliableChannel},
    core::{cache::ReadThroughCache, rank},
    engine::{sync::SyncEngine, view::LocalView},
    persist::{
        self, PersistError, PersistentTable, ROW_FORMAT_VERSION, StoredRow, sqlite::SqliteTables,
    },
    record::{Candidate, Job},
    seed::{self, SeedPlan},
    types::{CandidateStage, EntityKind, JobStatus},
};

fn job(i: u32) -> Job {
    Job {
        id: format!("job-{i}"),
        title: format!("Role {i}"),
        slug: format!("role-{i}"),
        status: JobStatus::Active,
        tags: vec!["remote".to_string()],
        rank: i,
    }
}

#[test]
fn rows_keep_insertion_order_across_upserts() {
    let tables = SqliteTables::open_in_memory().expect("open");
    persist::store_all(&tables, &[job(3), job(1), job(2)]).expect("bulk");

    let mut moved = job(1);
    moved.rank = 9;
    moved.title = "Moved".to_string();
    persist::store_one(&tables, &moved).expect("put");

    let all: Vec<Job> = persist::load_all(&tables).expect("load");
    let ids: Vec<&str> = all.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, vec!["job-3", "job-1", "job-2"]);
    assert_eq!(all[1], moved);

    let row = tables
        .get_by_id(EntityKind::Job, "job-1")
        .expect("get")
        .expect("row");
    assert_eq!(row.rank, Some(9));
    assert!(
        tables
            .get_by_id(EntityKind::Job, "job-404")
            .expect("get")
            .is_none()
    );
}

#[test]
fn tables_are_independent_and_clear_only_their_kind() {
    let tables = SqliteTables::open_in_memory().expect("open");
    persist::store_all(&tables, &[job(1), job(2)]).expect("jobs");
    let candidate = Candidate {
        id: "cand-1".to_string(),
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        job_id: "job-1".to_string(),
        stage: CandidateStage::Screen,
    };
    persist::store_one(&tables, &candidate).expect("candidate");

    let row = tables
        .get_by_id(EntityKind::Candidate, "cand-1")
        .expect("get")
        .expect("row");
    assert_eq!(row.rank, None);

    tables.clear(EntityKind::Job).expect("clear");
    assert!(tables.get_all(EntityKind::Job).expect("jobs").is_empty());
    let candidates: Vec<Candidate> = persist::load_all(&tables).expect("candidates");
    assert_eq!(candidates, vec![candidate]);
}

#[test]
fn legacy_rows_decode_and_future_formats_are_refused() {
    let tables = SqliteTables::open_in_memory().expect("open");
    let bare = job(4);
    tables
        .put(
            EntityKind::Job,
            StoredRow {
                id: bare.id.clone(),
                rank: Some(bare.rank),
                payload: serde_json::to_vec(&bare).expect("encode"),
            },
        )
        .expect("put legacy");
    let loaded: Option<Job> = persist::load_one(&tables, "job-4").expect("decode legacy");
    assert_eq!(loaded, Some(bare));

    let future = serde_json::json!({
        "format_version": ROW_FORMAT_VERSION + 8,
        "record": job(5),
    });
    tables
        .put(
            EntityKind::Job,
            StoredRow {
                id: "job-5".to_string(),
                rank: Some(5),
                payload: serde_json::to_vec(&future).expect("encode"),
            },
        )
        .expect("put future");
    let err = persist::load_one::<Job>(&tables, "job-5").expect_err("unsupported");
    assert!(matches!(err, PersistError::UnsupportedFormat(9)));
}

#[tokio::test]
async fn committed_reorder_survives_reopen() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("board.sqlite");
    let plan = SeedPlan {
        jobs: 6,
        candidates: 10,
        assessments: 1,
        seed: 3,
    };

    let expected = {
        let tables: Arc<dyn PersistentTable> = Arc::new(SqliteTables::open(&path).expect("open"));
        let cache = Arc::new(ReadThroughCache::new(tables));
        seed::reseed(&cache, &plan).await.expect("seed");

        let channel = UnreliableChannel::new(
            ChannelConfig::instant(),
            Box::new(ScriptedFaults::always_pass()),
        )
        .expect("channel");
        let mut engine = SyncEngine::new(Arc::clone(&cache), channel);
        let mut view: LocalView<Job> = engine.open_view().await.expect("view");
        let last = view.ids_by_rank()[5].clone();
        engine
            .reorder(&mut view, &last, 6, 1)
            .await
            .expect("reorder");
        view.ids_by_rank()
    };

    let reopened: Arc<dyn PersistentTable> = Arc::new(SqliteTables::open(&path).expect("reopen"));
    let cache = ReadThroughCache::new(reopened);
    let snapshot = cache.load().await.expect("load");
    let jobs = snapshot.jobs.as_slice();

    rank::check_dense(jobs).expect("dense");
    assert_eq!(rank::ids_by_rank(jobs), expected);
    assert_eq!(snapshot.candidates.len(), 10);
    assert_eq!(snapshot.assessments.len(), 1);
}

#[test]
fn envelope_version_is_checked_before_the_record_shape() {
    let reshaped = StoredRow {
        id: "job-7".to_string(),
        rank: Some(7),
        payload: serde_json::to_vec(&serde_json::json!({
            "format_version": ROW_FORMAT_VERSION + 1,
            "record": { "headline": "Role 7", "position": 7 },
        }))
        .expect("encode"),
    };
    assert!(matches!(
        reshaped.decode::<Job>(),
        Err(PersistError::UnsupportedFormat(v)) if v == ROW_FORMAT_VERSION + 1
    ));

    let malformed = StoredRow {
        id: "job-8".to_string(),
        rank: Some(8),
        payload: serde_json::to_vec(&serde_json::json!({
            "format_version": ROW_FORMAT_VERSION,
            "record": { "id": "job-8", "title": 42 },
        }))
        .expect("encode"),
    };
    let err = malformed.decode::<Job>().expect_err("bad record");
    assert!(matches!(err, PersistError::Serde(_)));
    assert!(err.to_string().contains("invalid type"), "{err}");

    let current = StoredRow::encode(&job(9)).expect("encode");
    assert_eq!(current.decode::<Job>().expect("decode"), job(9));
}

#[test]
fn out_of_range_rank_column_is_an_error_not_a_wrap() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("ranks.sqlite");
    drop(SqliteTables::open(&path).expect("create schema"));

    let payload = serde_json::to_vec(&job(1)).expect("encode");
    let conn = rusqlite::Connection::open(&path).expect("raw open");
    conn.execute(
        "INSERT INTO jobs(id, rank, payload) VALUES (?1, ?2, ?3)",
        rusqlite::params!["job-1", i64::from(u32::MAX) + 1, payload],
    )
    .expect("raw insert");
    drop(conn);

    let tables = SqliteTables::open(&path).expect("reopen");
    assert!(matches!(
        tables.get_all(EntityKind::Job),
        Err(PersistError::Sqlite(_))
    ));
    assert!(matches!(
        tables.get_by_id(EntityKind::Job, "job-1"),
        Err(PersistError::Sqlite(_))
    ));
}
