//! Job ledger helpers: which slots booked jobs consume, and the job status
//! state machine.

use super::domain::{Job, JobStatus};
use super::slots::{slot_for_time, SlotSet};
use super::SchedulingError;

/// Slot tokens a single job consumes for its worker. A job scheduled before
/// noon consumes `am`, at or after noon `pm`; a job with no scheduled time
/// conservatively consumes the entire day.
pub fn slots_consumed_by(job: &Job) -> SlotSet {
    match job.scheduled_time {
        Some(time) => [slot_for_time(time)].into_iter().collect(),
        None => SlotSet::ALL,
    }
}

/// Union of slots consumed by all active jobs in `jobs`. Completed and
/// cancelled jobs no longer hold time.
pub fn consumed_slots(jobs: &[Job]) -> SlotSet {
    jobs.iter()
        .filter(|job| job.is_active())
        .fold(SlotSet::EMPTY, |acc, job| acc.union(slots_consumed_by(job)))
}

pub fn active_job_count(jobs: &[Job]) -> usize {
    jobs.iter().filter(|job| job.is_active()).count()
}

/// Move a job to `next`, enforcing the one-directional status machine.
pub fn transition(job: &mut Job, next: JobStatus) -> Result<(), SchedulingError> {
    if !job.status.can_transition_to(next) {
        return Err(SchedulingError::InvalidTransition {
            job: job.id.clone(),
            from: job.status,
            to: next,
        });
    }
    job.status = next;
    Ok(())
}
