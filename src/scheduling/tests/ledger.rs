use chrono::NaiveTime;

use super::common::{date, time, MONDAY};
use crate::scheduling::domain::{Job, JobId, JobStatus, WorkerId};
use crate::scheduling::ledger::{
    active_job_count, consumed_slots, slots_consumed_by, transition,
};
use crate::scheduling::slots::SlotSet;
use crate::scheduling::SchedulingError;

fn job(id: &str, status: JobStatus, scheduled_time: Option<NaiveTime>) -> Job {
    Job {
        id: JobId(id.to_string()),
        worker_id: WorkerId("w-1".to_string()),
        quote_id: None,
        customer_name: "Sam Carter".to_string(),
        customer_phone: "07700 900456".to_string(),
        address: None,
        postcode: None,
        description: "Boiler service".to_string(),
        status,
        scheduled_date: date(MONDAY),
        scheduled_time,
        booked_slot: None,
        payout_pence: None,
    }
}

#[test]
fn morning_job_consumes_am() {
    let job = job("job-1", JobStatus::Pending, Some(time("09:30")));
    assert_eq!(slots_consumed_by(&job), SlotSet::AM);
}

#[test]
fn noon_job_consumes_pm() {
    let job = job("job-1", JobStatus::Pending, Some(time("12:00")));
    assert_eq!(slots_consumed_by(&job), SlotSet::PM);
}

#[test]
fn job_without_time_consumes_whole_day() {
    let job = job("job-1", JobStatus::Pending, None);
    assert_eq!(slots_consumed_by(&job), SlotSet::ALL);
}

#[test]
fn finished_jobs_release_their_slots() {
    let jobs = vec![
        job("job-1", JobStatus::Completed, Some(time("09:30"))),
        job("job-2", JobStatus::Cancelled, None),
        job("job-3", JobStatus::Accepted, Some(time("14:00"))),
    ];
    assert_eq!(consumed_slots(&jobs), SlotSet::PM);
    assert_eq!(active_job_count(&jobs), 1);
}

#[test]
fn status_machine_permits_only_forward_moves() {
    use JobStatus::*;

    assert!(Pending.can_transition_to(Accepted));
    assert!(Pending.can_transition_to(Cancelled));
    assert!(Accepted.can_transition_to(InProgress));
    assert!(Accepted.can_transition_to(Cancelled));
    assert!(InProgress.can_transition_to(Completed));

    assert!(!InProgress.can_transition_to(Cancelled));
    assert!(!Completed.can_transition_to(Pending));
    assert!(!Cancelled.can_transition_to(Pending));
    assert!(!Pending.can_transition_to(Completed));
}

#[test]
fn transition_applies_valid_moves() {
    let mut job = job("job-1", JobStatus::Pending, None);
    transition(&mut job, JobStatus::Accepted).expect("pending -> accepted");
    assert_eq!(job.status, JobStatus::Accepted);
}

#[test]
fn transition_rejects_invalid_moves() {
    let mut job = job("job-1", JobStatus::Completed, None);
    let err = transition(&mut job, JobStatus::Cancelled).expect_err("completed is terminal");
    match err {
        SchedulingError::InvalidTransition { from, to, .. } => {
            assert_eq!(from, JobStatus::Completed);
            assert_eq!(to, JobStatus::Cancelled);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(job.status, JobStatus::Completed);
}
