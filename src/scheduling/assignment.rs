//! The assignment engine: best-fit worker selection when a customer confirms
//! a booking, plus the symmetric cancel and reassign paths.
//!
//! Assignment failures are soft. The booking flow must never fail because
//! automatic assignment did, so unexpected errors are logged and reported as
//! a structured rejection; an operator can assign manually afterward.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveTime};
use tracing::{error, info};

use super::availability::AvailabilityEngine;
use super::domain::{
    AssignmentOutcome, BookingRequest, Job, JobId, JobStatus, OverrideOrigin, QuoteId,
    RejectionReason, ServiceId, WorkerDateOverride, WorkerId, WorkerSlots,
};
use super::ledger;
use super::slots::{
    scheduled_time_for, slot_for_time, slots_from_range, Slot, SlotKind, SlotSet, DAY_END,
    DAY_START, MIDDAY,
};
use super::store::{SchedulingStore, SlotLocks, StoreError};
use super::SchedulingError;

/// What the lead/quote subsystem knows about a quote at assignment time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteSummary {
    pub customer_name: String,
    pub customer_phone: String,
    pub address: Option<String>,
    pub postcode: Option<String>,
    pub job_description: String,
    pub service_ids: Vec<ServiceId>,
    pub payout_pence: Option<u32>,
}

/// Error enumeration for quote lookups.
#[derive(Debug, thiserror::Error)]
pub enum QuoteDirectoryError {
    #[error("quote directory unavailable: {0}")]
    Unavailable(String),
}

/// Outbound dependency on the lead/quote subsystem: resolves customer
/// identity, job description, and required services for a quote.
pub trait QuoteDirectory: Send + Sync {
    fn resolve(&self, quote: &QuoteId) -> Result<Option<QuoteSummary>, QuoteDirectoryError>;
}

/// Quote directory backed by a map, used by the service binary and tests.
#[derive(Default)]
pub struct InMemoryQuoteDirectory {
    quotes: Mutex<HashMap<QuoteId, QuoteSummary>>,
}

impl InMemoryQuoteDirectory {
    pub fn insert(&self, id: QuoteId, summary: QuoteSummary) {
        if let Ok(mut quotes) = self.quotes.lock() {
            quotes.insert(id, summary);
        }
    }
}

impl QuoteDirectory for InMemoryQuoteDirectory {
    fn resolve(&self, quote: &QuoteId) -> Result<Option<QuoteSummary>, QuoteDirectoryError> {
        let quotes = self
            .quotes
            .lock()
            .map_err(|_| QuoteDirectoryError::Unavailable("quote map poisoned".to_string()))?;
        Ok(quotes.get(quote).cloned())
    }
}

static JOB_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_job_id() -> JobId {
    let id = JOB_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    JobId(format!("job-{id:06}"))
}

/// Write side of the scheduling core. The only path that mutates worker
/// availability and the job ledger together, serialized per (worker, date).
pub struct AssignmentEngine<S, Q> {
    store: Arc<S>,
    quotes: Arc<Q>,
    availability: AvailabilityEngine<S>,
    locks: SlotLocks,
}

impl<S, Q> AssignmentEngine<S, Q>
where
    S: SchedulingStore + 'static,
    Q: QuoteDirectory + 'static,
{
    pub fn new(store: Arc<S>, quotes: Arc<Q>) -> Self {
        let availability = AvailabilityEngine::new(store.clone());
        Self {
            store,
            quotes,
            availability,
            locks: SlotLocks::default(),
        }
    }

    /// Resolve a quote and run assignment for it. Unknown quotes are a hard
    /// not-found error; assignment itself only ever reports soft outcomes.
    pub fn assign_for_quote(
        &self,
        quote_id: &QuoteId,
        date: NaiveDate,
        slot: SlotKind,
        exact_time: Option<NaiveTime>,
    ) -> Result<AssignmentOutcome, SchedulingError> {
        let summary = self
            .quotes
            .resolve(quote_id)
            .map_err(|err| SchedulingError::QuoteDirectory(err.to_string()))?
            .ok_or_else(|| SchedulingError::QuoteNotFound(quote_id.clone()))?;

        let request = BookingRequest {
            quote_id: Some(quote_id.clone()),
            customer_name: summary.customer_name,
            customer_phone: summary.customer_phone,
            address: summary.address,
            postcode: summary.postcode,
            description: summary.job_description,
            date,
            slot,
            exact_time,
            service_ids: summary.service_ids,
            payout_pence: summary.payout_pence,
        };

        Ok(self.assign(&request))
    }

    /// Select the best-fit worker for a confirmed booking, create the job,
    /// and consume the booked slot.
    pub fn assign(&self, request: &BookingRequest) -> AssignmentOutcome {
        match self.try_assign(request) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(date = %request.date, error = %err, "automatic assignment failed");
                AssignmentOutcome::Rejected {
                    reason: RejectionReason::AssignmentError,
                }
            }
        }
    }

    fn try_assign(&self, request: &BookingRequest) -> Result<AssignmentOutcome, SchedulingError> {
        let candidates = self
            .availability
            .candidates_for(request.date, &request.service_ids)?;
        if candidates.is_empty() {
            return Ok(AssignmentOutcome::Rejected {
                reason: RejectionReason::NoContractorsAvailable,
            });
        }

        let mut eligible: Vec<&WorkerSlots> = candidates
            .iter()
            .filter(|c| c.slots.satisfies(request.slot))
            .collect();
        if eligible.is_empty() {
            return Ok(AssignmentOutcome::Rejected {
                reason: RejectionReason::NoContractorsForSlot,
            });
        }

        // Spread work evenly: fewest jobs on the date first, worker id as the
        // deterministic tie-break.
        let mut load: HashMap<&WorkerId, usize> = HashMap::new();
        for candidate in &eligible {
            let jobs = self
                .store
                .jobs_for_worker_on(&candidate.worker_id, request.date)?;
            load.insert(&candidate.worker_id, ledger::active_job_count(&jobs));
        }
        eligible.sort_by(|a, b| {
            let load_a = load.get(&a.worker_id).copied().unwrap_or(0);
            let load_b = load.get(&b.worker_id).copied().unwrap_or(0);
            load_a.cmp(&load_b).then(a.worker_id.cmp(&b.worker_id))
        });

        for candidate in eligible {
            let cell = self.locks.cell(&candidate.worker_id, request.date)?;
            let _slot_guard = cell
                .lock()
                .map_err(|_| StoreError::Unavailable("slot lock poisoned".to_string()))?;

            // Re-check under the lock: a concurrent booking may have taken
            // the slot between ranking and serialization.
            let current = self.current_slots(&candidate.worker_id, request.date)?;
            if !current.satisfies(request.slot) {
                continue;
            }

            let job = Job {
                id: next_job_id(),
                worker_id: candidate.worker_id.clone(),
                quote_id: request.quote_id.clone(),
                customer_name: request.customer_name.clone(),
                customer_phone: request.customer_phone.clone(),
                address: request.address.clone(),
                postcode: request.postcode.clone(),
                description: request.description.clone(),
                status: JobStatus::Pending,
                scheduled_date: request.date,
                scheduled_time: Some(scheduled_time_for(request.slot, request.exact_time)),
                booked_slot: Some(request.slot),
                payout_pence: request.payout_pence,
            };
            let job_id = job.id.clone();
            self.store.insert_job(job)?;
            self.block_slot(
                &candidate.worker_id,
                request.date,
                request.slot,
                request.exact_time,
            )?;

            info!(
                job = %job_id,
                worker = %candidate.worker_id,
                date = %request.date,
                "assigned booking"
            );
            return Ok(AssignmentOutcome::Assigned {
                job_id,
                worker_id: candidate.worker_id.clone(),
                worker_name: candidate.worker_name.clone(),
            });
        }

        Ok(AssignmentOutcome::Rejected {
            reason: RejectionReason::NoContractorsForSlot,
        })
    }

    /// Cancel a job and release the availability it was holding.
    pub fn cancel(&self, job_id: &JobId) -> Result<Job, SchedulingError> {
        let mut job = self
            .store
            .job(job_id)?
            .ok_or_else(|| SchedulingError::JobNotFound(job_id.clone()))?;

        let cell = self.locks.cell(&job.worker_id, job.scheduled_date)?;
        let _slot_guard = cell
            .lock()
            .map_err(|_| StoreError::Unavailable("slot lock poisoned".to_string()))?;

        ledger::transition(&mut job, JobStatus::Cancelled)?;
        self.store.update_job(job.clone())?;
        self.release_slot(&job.worker_id, job.scheduled_date)?;

        info!(job = %job.id, worker = %job.worker_id, "cancelled job and released slot");
        Ok(job)
    }

    /// Move a job to another worker: release the displaced worker's block,
    /// apply a fresh one to the new worker, and reset the job to pending.
    pub fn reassign(&self, job_id: &JobId, new_worker: &WorkerId) -> Result<Job, SchedulingError> {
        let mut job = self
            .store
            .job(job_id)?
            .ok_or_else(|| SchedulingError::JobNotFound(job_id.clone()))?;
        if self.store.worker(new_worker)?.is_none() {
            return Err(SchedulingError::WorkerNotFound(new_worker.clone()));
        }
        if !job.is_active() {
            return Err(SchedulingError::InvalidTransition {
                job: job.id.clone(),
                from: job.status,
                to: JobStatus::Pending,
            });
        }

        let previous_worker = job.worker_id.clone();
        let date = job.scheduled_date;

        // Lock both cells in a stable order so concurrent reassignments
        // cannot deadlock.
        let mut ordered = vec![previous_worker.clone(), new_worker.clone()];
        ordered.sort();
        ordered.dedup();
        let mut cells = Vec::with_capacity(ordered.len());
        for worker in &ordered {
            cells.push(self.locks.cell(worker, date)?);
        }
        let mut guards = Vec::with_capacity(cells.len());
        for cell in &cells {
            guards.push(
                cell.lock()
                    .map_err(|_| StoreError::Unavailable("slot lock poisoned".to_string()))?,
            );
        }

        job.worker_id = new_worker.clone();
        job.status = JobStatus::Pending;
        self.store.update_job(job.clone())?;

        self.release_slot(&previous_worker, date)?;
        let (kind, exact) = booked_shape(&job);
        self.block_slot(new_worker, date, kind, exact)?;

        info!(
            job = %job.id,
            from = %previous_worker,
            to = %new_worker,
            "reassigned job"
        );
        Ok(job)
    }

    /// Worker slots as currently stored, bypassing any snapshot taken before
    /// the per-(worker, date) lock was acquired.
    fn current_slots(&self, worker: &WorkerId, date: NaiveDate) -> Result<SlotSet, SchedulingError> {
        let offered = match self.store.date_override(worker, date)? {
            Some(entry) if !entry.is_available => return Ok(SlotSet::EMPTY),
            Some(entry) => slots_from_range(
                entry.start_time.unwrap_or(DAY_START),
                entry.end_time.unwrap_or(DAY_END),
            ),
            None => {
                let day = super::domain::day_of_week(date);
                match self.store.weekly_pattern(worker, day)? {
                    Some(pattern) if pattern.is_active => {
                        slots_from_range(pattern.start_time, pattern.end_time)
                    }
                    _ => return Ok(SlotSet::EMPTY),
                }
            }
        };
        let jobs = self.store.jobs_for_worker_on(worker, date)?;
        Ok(offered.subtract(ledger::consumed_slots(&jobs)))
    }

    /// Consume the booked slot in the worker availability store. A whole-day
    /// booking takes the worker off the date; a half booking narrows the
    /// remaining window, or takes the day when the window was already limited
    /// to the booked half.
    fn block_slot(
        &self,
        worker: &WorkerId,
        date: NaiveDate,
        kind: SlotKind,
        exact_time: Option<NaiveTime>,
    ) -> Result<(), SchedulingError> {
        let half = match kind {
            SlotKind::Full => None,
            SlotKind::Am => Some(Slot::Am),
            SlotKind::Pm => Some(Slot::Pm),
            SlotKind::Exact => Some(slot_for_time(scheduled_time_for(kind, exact_time))),
        };

        let Some(half) = half else {
            self.store.put_date_override(WorkerDateOverride {
                worker_id: worker.clone(),
                date,
                is_available: false,
                start_time: None,
                end_time: None,
                notes: Some("Booked (full day)".to_string()),
                origin: OverrideOrigin::Booking,
            })?;
            return Ok(());
        };

        let existing = self.store.date_override(worker, date)?;
        let (base_start, base_end) = match &existing {
            Some(entry) => (
                entry.start_time.unwrap_or(DAY_START),
                entry.end_time.unwrap_or(DAY_END),
            ),
            None => match self
                .store
                .weekly_pattern(worker, super::domain::day_of_week(date))?
            {
                Some(pattern) if pattern.is_active => (pattern.start_time, pattern.end_time),
                _ => (DAY_START, DAY_END),
            },
        };

        let offered = slots_from_range(base_start, base_end);
        let remaining = offered.subtract([half].into_iter().collect());

        if remaining.is_empty() {
            self.store.put_date_override(WorkerDateOverride {
                worker_id: worker.clone(),
                date,
                is_available: false,
                start_time: None,
                end_time: None,
                notes: Some(format!("Booked ({})", half.label())),
                origin: OverrideOrigin::Booking,
            })?;
            return Ok(());
        }

        let (start_time, end_time) = match half {
            Slot::Am => (MIDDAY, base_end),
            _ => (base_start, MIDDAY),
        };
        self.store.put_date_override(WorkerDateOverride {
            worker_id: worker.clone(),
            date,
            is_available: true,
            start_time: Some(start_time),
            end_time: Some(end_time),
            notes: Some(format!("Partial booking ({} booked)", half.label())),
            origin: OverrideOrigin::Booking,
        })?;
        Ok(())
    }

    /// Undo booking-managed availability for a (worker, date): drop the
    /// booking override and re-apply blocks for whatever active jobs remain.
    /// Worker-entered overrides are left untouched.
    fn release_slot(&self, worker: &WorkerId, date: NaiveDate) -> Result<(), SchedulingError> {
        match self.store.date_override(worker, date)? {
            Some(entry) if entry.origin == OverrideOrigin::Booking => {
                self.store.delete_date_override(worker, date)?;
            }
            _ => return Ok(()),
        }

        let mut remaining = self.store.jobs_for_worker_on(worker, date)?;
        remaining.retain(Job::is_active);
        for job in &remaining {
            let (kind, exact) = booked_shape(job);
            self.block_slot(worker, date, kind, exact)?;
        }
        Ok(())
    }
}

/// The slot shape a job is holding, for re-applying or moving its block.
/// Manually created jobs without a recorded shape fall back to the ledger
/// convention: no scheduled time means the whole day, otherwise the half the
/// start time lands in.
fn booked_shape(job: &Job) -> (SlotKind, Option<NaiveTime>) {
    match (job.booked_slot, job.scheduled_time) {
        (Some(kind), time) => (kind, time),
        (None, None) => (SlotKind::Full, None),
        (None, Some(time)) => (SlotKind::Exact, Some(time)),
    }
}
