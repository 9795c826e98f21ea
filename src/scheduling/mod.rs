//! The scheduling core: master calendar rules, worker availability, the job
//! ledger, the availability aggregator, and the assignment engine.

pub mod assignment;
pub mod availability;
pub mod calendar;
pub mod domain;
pub mod ledger;
pub mod router;
pub mod slots;
pub mod store;

#[cfg(test)]
mod tests;

pub use assignment::{AssignmentEngine, InMemoryQuoteDirectory, QuoteDirectory, QuoteSummary};
pub use availability::{AvailabilityEngine, AvailabilityQuery};
pub use domain::{
    day_of_week, is_weekend, AdminCalendarDay, AssignmentOutcome, AvailabilityReason,
    BookingRequest, DateAvailability, DateRange, Job, JobId, JobStatus, MasterBlockedDate,
    MasterDayPattern, OverrideOrigin, QuoteId, RejectionReason, ServiceId, SlotCounts,
    WorkerDateOverride, WorkerId, WorkerProfile, WorkerSchedule, WorkerSlots, WorkerStatus,
    WorkerWeeklyPattern,
};
pub use router::{scheduling_router, SchedulingApi};
pub use slots::{Slot, SlotKind, SlotSet};
pub use store::{MemoryStore, ScheduleSnapshot, SchedulingStore, SlotLocks, StoreError};

/// Error raised by the scheduling core. Validation problems are rejected
/// before any mutation; missing records get their own distinct signals.
#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("day of week {0} is out of range (expected 0-6, Sunday first)")]
    InvalidDayOfWeek(u8),
    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("invalid month '{0}': expected YYYY-MM")]
    InvalidMonth(String),
    #[error("invalid time '{0}': expected HH:MM")]
    InvalidTime(String),
    #[error("requested window of {requested} days exceeds the {max}-day cap")]
    WindowTooLarge { requested: u32, max: u32 },
    #[error("worker {0} not found")]
    WorkerNotFound(WorkerId),
    #[error("job {0} not found")]
    JobNotFound(JobId),
    #[error("quote {0} not found")]
    QuoteNotFound(QuoteId),
    #[error("job {job} cannot move from {from} to {to}")]
    InvalidTransition {
        job: JobId,
        from: JobStatus,
        to: JobStatus,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("quote directory unavailable: {0}")]
    QuoteDirectory(String),
}

impl SchedulingError {
    /// Whether the error is a caller mistake rather than an internal fault.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SchedulingError::InvalidDayOfWeek(_)
                | SchedulingError::InvalidDate(_)
                | SchedulingError::InvalidMonth(_)
                | SchedulingError::InvalidTime(_)
                | SchedulingError::WindowTooLarge { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SchedulingError::WorkerNotFound(_)
                | SchedulingError::JobNotFound(_)
                | SchedulingError::QuoteNotFound(_)
        )
    }
}
