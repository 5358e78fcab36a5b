use std::sync::Arc;

use proptest::prelude::*;

use hirelog::{
    core::cache::ReadThroughCache,
    persist::{PersistentTable, memory::MemoryTables},
    query::{
        QueryEngine, QueryError, QueryParams, QueryResult,
        fields::{CandidateField, JobField},
        paginate,
    },
    record::{Candidate, Job, Record},
    seed::{self, SeedPlan},
    types::{JobStatus, Rank, SortDirection},
};

fn job(i: Rank, title: &str, status: JobStatus, tags: &[&str]) -> Job {
    Job {
        id: format!("job-{i}"),
        title: title.to_string(),
        slug: format!("job-{i}"),
        status,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        rank: i,
    }
}

fn seeded_jobs(count: usize, seed: u64) -> Vec<Job> {
    SeedPlan {
        jobs: count,
        candidates: 0,
        assessments: 0,
        seed,
    }
    .generate()
    .jobs
}

fn ids<T: Record>(result: &QueryResult<T>) -> Vec<String> {
    result.items.iter().map(|r| r.id().to_string()).collect()
}

fn everything<F>() -> QueryParams<F> {
    QueryParams::page(1, 10_000)
}

#[test]
fn filtered_search_reports_full_count_but_one_page() {
    let jobs = seeded_jobs(25, 7);
    let params = QueryParams::page(1, 2)
        .with_search("Engineer")
        .with_filter(JobField::Status, "active");
    let result = paginate(&jobs, &params).expect("query");

    let expected = jobs
        .iter()
        .filter(|j| j.status == JobStatus::Active)
        .filter(|j| {
            j.title.to_lowercase().contains("engineer")
                || j.tags.iter().any(|t| t.to_lowercase().contains("engineer"))
        })
        .count();

    assert!(result.items.len() <= 2);
    assert_eq!(result.total, expected);
    assert_eq!(result.has_next, result.total > 2);
    assert!(!result.has_prev);
    assert!(result.items.iter().all(|j| j.status == JobStatus::Active));
}

#[test]
fn search_without_matches_is_an_empty_first_page() {
    let jobs = seeded_jobs(25, 7);
    let params = QueryParams::page(1, 10).with_search("no-such-role-anywhere");
    let result = paginate(&jobs, &params).expect("query");

    assert!(result.items.is_empty());
    assert_eq!(result.total, 0);
    assert_eq!(result.total_pages, 0);
    assert!(!result.has_next);
    assert!(!result.has_prev);
}

#[test]
fn zero_page_or_page_size_is_invalid() {
    let jobs = seeded_jobs(3, 1);
    assert!(matches!(
        paginate(&jobs, &QueryParams::<JobField>::page(0, 10)),
        Err(QueryError::InvalidArgument(_))
    ));
    assert!(matches!(
        paginate(&jobs, &QueryParams::<JobField>::page(1, 0)),
        Err(QueryError::InvalidArgument(_))
    ));
}

#[test]
fn page_past_the_end_is_empty_not_an_error() {
    let jobs = seeded_jobs(5, 3);
    let result = paginate(&jobs, &QueryParams::<JobField>::page(9, 2)).expect("query");
    assert!(result.items.is_empty());
    assert_eq!(result.total, 5);
    assert_eq!(result.total_pages, 3);
    assert!(!result.has_next);
    assert!(result.has_prev);
}

#[test]
fn sort_is_stable_in_both_directions() {
    let jobs = vec![
        job(1, "b", JobStatus::Archived, &[]),
        job(2, "a", JobStatus::Active, &[]),
        job(3, "c", JobStatus::Archived, &[]),
        job(4, "d", JobStatus::Active, &[]),
    ];

    let asc = paginate(
        &jobs,
        &everything().with_sort(JobField::Status, SortDirection::Asc),
    )
    .expect("asc");
    assert_eq!(ids(&asc), vec!["job-2", "job-4", "job-1", "job-3"]);

    let desc = paginate(
        &jobs,
        &everything().with_sort(JobField::Status, SortDirection::Desc),
    )
    .expect("desc");
    assert_eq!(ids(&desc), vec!["job-1", "job-3", "job-2", "job-4"]);
}

#[test]
fn text_sort_ignores_case_and_rank_sort_is_numeric() {
    let jobs = vec![
        job(10, "beta", JobStatus::Active, &[]),
        job(2, "Alpha", JobStatus::Active, &[]),
        job(1, "gamma", JobStatus::Active, &[]),
    ];

    let by_title = paginate(&jobs, &everything().with_sort(JobField::Title, SortDirection::Asc))
        .expect("title");
    assert_eq!(ids(&by_title), vec!["job-2", "job-10", "job-1"]);

    let by_rank = paginate(&jobs, &everything().with_sort(JobField::Rank, SortDirection::Asc))
        .expect("rank");
    assert_eq!(ids(&by_rank), vec!["job-1", "job-2", "job-10"]);
}

#[test]
fn search_is_case_insensitive_over_text_and_list_fields() {
    let jobs = vec![
        job(1, "Platform Engineer", JobStatus::Active, &["onsite"]),
        job(2, "Designer", JobStatus::Active, &["Remote"]),
        job(3, "Analyst", JobStatus::Active, &["contract"]),
    ];

    let by_title = paginate(&jobs, &everything().with_search("ENGINEER")).expect("title");
    assert_eq!(ids(&by_title), vec!["job-1"]);

    let by_tag = paginate(&jobs, &everything().with_search("remo")).expect("tag");
    assert_eq!(ids(&by_tag), vec!["job-2"]);

    let by_tag_filter = paginate(&jobs, &everything().with_filter(JobField::Tags, "contract"))
        .expect("tag filter");
    assert_eq!(ids(&by_tag_filter), vec!["job-3"]);
}

#[test]
fn candidate_queries_filter_by_stage_and_search_email() {
    let fixtures = SeedPlan {
        jobs: 4,
        candidates: 120,
        assessments: 0,
        seed: 5,
    }
    .generate();

    let hired = paginate(
        &fixtures.candidates,
        &QueryParams::page(1, 500).with_filter(CandidateField::Stage, "hired"),
    )
    .expect("hired");
    let expected = fixtures
        .candidates
        .iter()
        .filter(|c| c.stage.as_str() == "hired")
        .count();
    assert_eq!(hired.total, expected);

    let target = &fixtures.candidates[17];
    let by_email = paginate(
        &fixtures.candidates,
        &QueryParams::page(1, 10).with_search(target.email.to_uppercase()),
    )
    .expect("email");
    assert_eq!(ids(&by_email), vec![target.id.clone()]);
}

#[test]
fn params_deserialize_from_board_query_json() {
    let params: QueryParams<JobField> = serde_json::from_str(
        r#"{"search":"eng","filter":{"field":"status","value":"active"},
            "sort":{"key":"rank","direction":"desc"},"page":2,"pageSize":5}"#,
    )
    .expect("parse");
    assert_eq!(params.page, 2);
    assert_eq!(params.page_size, 5);
    assert_eq!(params.search.as_deref(), Some("eng"));
    assert_eq!(
        params.sort.map(|s| (s.key, s.direction)),
        Some((JobField::Rank, SortDirection::Desc))
    );

    let defaults: QueryParams<CandidateField> = serde_json::from_str("{}").expect("parse");
    assert_eq!(defaults, QueryParams::default());
    assert_eq!((defaults.page, defaults.page_size), (1, 10));
}

#[tokio::test]
async fn engine_pages_from_cache_and_validates_before_loading() {
    let tables: Arc<dyn PersistentTable> = Arc::new(MemoryTables::new());
    let cache = Arc::new(ReadThroughCache::new(tables));
    seed::reseed(&cache, &SeedPlan::default()).await.expect("seed");
    let engine = QueryEngine::new(Arc::clone(&cache));

    let err = engine
        .query_page::<Job>(&QueryParams::page(0, 10))
        .await
        .expect_err("invalid page");
    assert!(matches!(err, QueryError::InvalidArgument(_)));
    assert!(!cache.is_loaded().await);

    let page = engine
        .query_page::<Candidate>(&QueryParams::page(3, 25))
        .await
        .expect("page");
    assert!(cache.is_loaded().await);
    assert_eq!(page.total, 1000);
    assert_eq!(page.total_pages, 40);
    assert_eq!(page.items.len(), 25);
    assert!(page.has_next && page.has_prev);

    let first = page.items[0].clone();
    let fetched = engine.get::<Candidate>(&first.id).await.expect("get");
    assert_eq!(fetched, Some(first));
}

fn status_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("active"), Just("archived")]
}

fn search_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("engineer"),
        Just("senior"),
        Just("remote"),
        Just("a"),
        Just("zzz"),
        Just("")
    ]
}

proptest! {
    #[test]
    fn pagination_boundary_laws(
        n in 0u32..60,
        page in 1u32..15,
        page_size in 1u32..12,
    ) {
        let jobs: Vec<Job> = (1..=n).map(|i| job(i, "Role", JobStatus::Active, &[])).collect();
        let result = paginate(&jobs, &QueryParams::<JobField>::page(page, page_size)).expect("query");

        prop_assert_eq!(result.total, n as usize);
        prop_assert_eq!(result.total_pages == 0, result.total == 0);
        prop_assert_eq!(result.has_prev, page > 1);
        if page as usize >= result.total_pages {
            prop_assert!(!result.has_next);
        }
        if page as usize > result.total_pages {
            prop_assert!(result.items.is_empty());
        }

        let start = ((page - 1) * page_size) as usize;
        let expected_len = (n as usize).saturating_sub(start).min(page_size as usize);
        prop_assert_eq!(result.items.len(), expected_len);
    }

    #[test]
    fn filter_and_search_compose_as_intersection(
        seed in 0u64..500,
        status in status_strategy(),
        search in search_strategy(),
    ) {
        let jobs = seeded_jobs(40, seed);

        let filtered = paginate(&jobs, &everything().with_filter(JobField::Status, status)).expect("filter");
        let searched = paginate(&jobs, &everything().with_search(search)).expect("search");
        let both = paginate(
            &jobs,
            &everything().with_search(search).with_filter(JobField::Status, status),
        )
        .expect("both");

        let filtered_ids = ids(&filtered);
        let intersection: Vec<String> = ids(&searched)
            .into_iter()
            .filter(|id| filtered_ids.contains(id))
            .collect();
        prop_assert_eq!(ids(&both), intersection);
    }
}
