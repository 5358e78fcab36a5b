use proptest::prelude::*;

use hirelog::{
    core::rank::{RankError, apply_shifts, check_dense, ids_by_rank, next_rank, plan_move},
    record::Job,
    types::{JobStatus, Rank},
};

fn job(i: Rank) -> Job {
    Job {
        id: format!("job-{i}"),
        title: format!("Role {i}"),
        slug: format!("role-{i}"),
        status: JobStatus::Active,
        tags: vec![],
        rank: i,
    }
}

// Storage order is rotated so positions never line up with ranks.
fn ranked_jobs(n: Rank, rotate: usize) -> Vec<Job> {
    let mut jobs: Vec<Job> = (1..=n).map(job).collect();
    if !jobs.is_empty() {
        let k = rotate % jobs.len();
        jobs.rotate_left(k);
    }
    jobs
}

fn rank_of(jobs: &[Job], id: &str) -> Rank {
    jobs.iter().find(|j| j.id == id).map(|j| j.rank).expect("present")
}

fn id_at(jobs: &[Job], rank: Rank) -> String {
    jobs.iter()
        .find(|j| j.rank == rank)
        .map(|j| j.id.clone())
        .expect("rank present")
}

#[test]
fn moving_first_to_fourth_pulls_the_range_up() {
    let mut jobs = ranked_jobs(5, 0);
    let plan = plan_move(&jobs, "job-1", 1, 4).expect("plan");
    assert_eq!(plan.shifts.len(), 4);
    apply_shifts(&mut jobs, &plan);

    assert_eq!(rank_of(&jobs, "job-1"), 4);
    assert_eq!(rank_of(&jobs, "job-2"), 1);
    assert_eq!(rank_of(&jobs, "job-3"), 2);
    assert_eq!(rank_of(&jobs, "job-4"), 3);
    assert_eq!(rank_of(&jobs, "job-5"), 5);
    check_dense(&jobs).expect("dense");
}

#[test]
fn moving_earlier_pushes_the_range_down() {
    let mut jobs = ranked_jobs(6, 2);
    let plan = plan_move(&jobs, "job-5", 5, 2).expect("plan");
    apply_shifts(&mut jobs, &plan);

    assert_eq!(
        ids_by_rank(&jobs),
        vec!["job-1", "job-5", "job-2", "job-3", "job-4", "job-6"]
    );
    check_dense(&jobs).expect("dense");
}

#[test]
fn same_rank_move_is_a_noop() {
    let jobs = ranked_jobs(5, 1);
    let plan = plan_move(&jobs, "job-3", 3, 3).expect("plan");
    assert!(plan.is_noop());

    let mut after = jobs.clone();
    assert_eq!(apply_shifts(&mut after, &plan), 0);
    assert_eq!(after, jobs);
}

#[test]
fn invalid_moves_are_rejected_before_any_shift() {
    let jobs = ranked_jobs(5, 0);

    assert_eq!(
        plan_move(&jobs, "job-1", 0, 2),
        Err(RankError::OutOfBounds { rank: 0, len: 5 })
    );
    assert_eq!(
        plan_move(&jobs, "job-1", 1, 6),
        Err(RankError::OutOfBounds { rank: 6, len: 5 })
    );
    assert_eq!(
        plan_move(&jobs, "missing", 1, 2),
        Err(RankError::UnknownId("missing".to_string()))
    );
    assert_eq!(
        plan_move(&jobs, "job-2", 1, 3),
        Err(RankError::Mismatch {
            id: "job-2".to_string(),
            claimed: 1,
            actual: 2,
        })
    );
    assert!(matches!(
        plan_move(&Vec::<Job>::new(), "job-1", 1, 1),
        Err(RankError::OutOfBounds { rank: 1, len: 0 })
    ));
}

#[test]
fn gapped_or_duplicated_ranks_are_not_dense() {
    let mut jobs = ranked_jobs(4, 0);
    jobs[3].rank = 3;
    assert!(matches!(
        check_dense(&jobs),
        Err(RankError::NotDense { rank: 3, .. })
    ));

    jobs[3].rank = 9;
    assert!(matches!(
        check_dense(&jobs),
        Err(RankError::NotDense { rank: 9, .. })
    ));
    assert!(plan_move(&jobs, "job-1", 1, 2).is_err());
}

#[test]
fn next_rank_appends_after_the_last() {
    assert_eq!(next_rank(&Vec::<Job>::new()), 1);
    assert_eq!(next_rank(&ranked_jobs(7, 3)), 8);
}

proptest! {
    #[test]
    fn any_valid_move_keeps_ranks_dense_and_relative_order(
        n in 1u32..40,
        from_seed in any::<u32>(),
        to_seed in any::<u32>(),
        rotate in 0usize..40,
    ) {
        let mut jobs = ranked_jobs(n, rotate);
        let from = from_seed % n + 1;
        let to = to_seed % n + 1;
        let id = id_at(&jobs, from);

        let before: Vec<String> = ids_by_rank(&jobs).into_iter().filter(|x| *x != id).collect();
        let plan = plan_move(&jobs, &id, from, to).expect("valid move");
        apply_shifts(&mut jobs, &plan);

        prop_assert!(check_dense(&jobs).is_ok());
        prop_assert_eq!(rank_of(&jobs, &id), to);
        let after: Vec<String> = ids_by_rank(&jobs).into_iter().filter(|x| *x != id).collect();
        prop_assert_eq!(before, after);

        let lo = from.min(to);
        let hi = from.max(to);
        for shift in &plan.shifts {
            prop_assert!(shift.from >= lo && shift.from <= hi);
        }
        prop_assert_eq!(plan.shifts.len() as u32, if from == to { 0 } else { hi - lo + 1 });
    }

    #[test]
    fn sequences_of_moves_stay_dense(
        n in 1u32..25,
        moves in prop::collection::vec((any::<u32>(), any::<u32>()), 1..60),
    ) {
        let mut jobs = ranked_jobs(n, 0);
        for (a, b) in moves {
            let from = a % n + 1;
            let to = b % n + 1;
            let id = id_at(&jobs, from);
            let plan = plan_move(&jobs, &id, from, to).expect("valid move");
            apply_shifts(&mut jobs, &plan);
            prop_assert!(check_dense(&jobs).is_ok());
        }
    }
}
