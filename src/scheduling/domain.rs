//! Data model shared across the scheduling core: the master calendar, worker
//! schedules, the job ledger, and the computed availability views.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::slots::{SlotKind, SlotSet, DAY_END, DAY_START};

/// Identifier wrapper for workers (field technicians).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(pub String);

/// Identifier wrapper for ledger jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

/// Identifier wrapper for quotes supplied by the lead/quote subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

/// Identifier wrapper for service SKUs in the skill registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceId(pub String);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for QuoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusive date range used by every range query in the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Range covering `days` days starting at `start`.
    pub fn days_from(start: NaiveDate, days: u32) -> Self {
        let span = days.saturating_sub(1);
        Self {
            start,
            end: start + Duration::days(i64::from(span)),
        }
    }

    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }
}

/// Day-of-week index in calendar convention: 0 = Sunday through 6 = Saturday.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(day_of_week(date), 0 | 6)
}

/// Business-wide weekly operating pattern, one record per weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterDayPattern {
    pub day_of_week: u8,
    pub is_active: bool,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
}

impl MasterDayPattern {
    /// The documented fallback when no record exists: active Monday through
    /// Friday 09:00-17:00, inactive on weekends.
    pub fn default_for(day_of_week: u8) -> Self {
        Self {
            day_of_week,
            is_active: (1..=5).contains(&day_of_week),
            start_time: DAY_START,
            end_time: DAY_END,
        }
    }
}

/// An admin-blocked calendar date. `blocked_slots` absent means the whole day
/// is closed; present means only those tokens are closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterBlockedDate {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_slots: Option<SlotSet>,
}

/// A worker's recurring weekly default for one weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerWeeklyPattern {
    pub worker_id: WorkerId,
    pub day_of_week: u8,
    pub is_active: bool,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
}

/// Who created a date override. Booking-managed rows may be rebuilt when the
/// underlying job is cancelled or reassigned; worker-entered rows are never
/// touched by the assignment engine's release path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideOrigin {
    #[default]
    Manual,
    Booking,
}

/// A one-off exception to a worker's weekly pattern. When present it always
/// wins over the pattern for that date, whether it grants or revokes time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerDateOverride {
    pub worker_id: WorkerId,
    pub date: NaiveDate,
    pub is_available: bool,
    #[serde(default, with = "hhmm_opt", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm_opt", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub origin: OverrideOrigin,
}

/// Profile-level availability toggle maintained outside the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Available,
    Busy,
    Offline,
}

/// A field technician tracked by the engine, with the skill set used for
/// service matching. Skills come from the external service registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerProfile {
    pub id: WorkerId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkerStatus>,
    #[serde(default)]
    pub skills: Vec<ServiceId>,
}

impl WorkerProfile {
    /// Workers are bookable when marked available or when no status is set.
    pub fn is_bookable(&self) -> bool {
        matches!(self.status, None | Some(WorkerStatus::Available))
    }

    /// Union skill match: any overlap with the required services qualifies.
    pub fn matches_services(&self, required: &[ServiceId]) -> bool {
        required.is_empty() || required.iter().any(|s| self.skills.contains(s))
    }
}

/// Lifecycle states for a ledger job. Transitions are one-directional:
/// `pending -> {accepted, cancelled}`, `accepted -> {in_progress, cancelled}`,
/// `in_progress -> completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Accepted => "accepted",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Active jobs consume worker time; completed and cancelled ones do not.
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            JobStatus::Pending | JobStatus::Accepted | JobStatus::InProgress
        )
    }

    pub const fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Accepted)
                | (JobStatus::Pending, JobStatus::Cancelled)
                | (JobStatus::Accepted, JobStatus::InProgress)
                | (JobStatus::Accepted, JobStatus::Cancelled)
                | (JobStatus::InProgress, JobStatus::Completed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A persisted booking. A job with no `scheduled_time` consumes its worker's
/// entire day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub worker_id: WorkerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_id: Option<QuoteId>,
    pub customer_name: String,
    pub customer_phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    pub description: String,
    pub status: JobStatus,
    pub scheduled_date: NaiveDate,
    #[serde(default, with = "hhmm_opt", skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<NaiveTime>,
    /// The slot shape the customer booked, recorded so cancel/reassign can
    /// release exactly what was blocked. Absent on manually created jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booked_slot: Option<SlotKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_pence: Option<u32>,
}

impl Job {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Why a date is or is not bookable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityReason {
    MasterBlocked,
    DayInactive,
    NoContractors,
    Available,
}

/// Computed per-date availability answer. Never persisted; recomputed on
/// every query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateAvailability {
    pub date: NaiveDate,
    pub is_available: bool,
    pub reason: AvailabilityReason,
    pub slots: SlotSet,
    pub contractor_count: usize,
    pub is_weekend: bool,
}

/// One worker's contribution to a date, after overrides and booked jobs are
/// applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerSlots {
    pub worker_id: WorkerId,
    pub worker_name: String,
    pub date: NaiveDate,
    pub slots: SlotSet,
}

/// Per-half headcount shown on the admin calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotCounts {
    pub am: usize,
    pub pm: usize,
}

/// One admin-calendar cell: master state plus booking load for a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminCalendarDay {
    pub date: NaiveDate,
    pub master_blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_blocked_reason: Option<String>,
    pub day_active: bool,
    pub contractor_count: usize,
    pub booking_count: usize,
    pub slots: SlotCounts,
}

/// A worker-facing view of their own schedule for a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerSchedule {
    pub weekly_pattern: Vec<WorkerWeeklyPattern>,
    pub date_overrides: Vec<WorkerDateOverride>,
    pub jobs: Vec<Job>,
}

/// A confirmed booking handed to the assignment engine. Customer identity and
/// the job description come from the quote subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub quote_id: Option<QuoteId>,
    pub customer_name: String,
    pub customer_phone: String,
    pub address: Option<String>,
    pub postcode: Option<String>,
    pub description: String,
    pub date: NaiveDate,
    pub slot: SlotKind,
    pub exact_time: Option<NaiveTime>,
    pub service_ids: Vec<ServiceId>,
    pub payout_pence: Option<u32>,
}

/// Soft rejection codes surfaced alongside a successful booking response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    NoContractorsAvailable,
    NoContractorsForSlot,
    AssignmentError,
}

/// Outcome of automatic assignment. Rejections are reported, never raised, so
/// the customer-facing booking flow can still confirm and fall back to manual
/// assignment by an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssignmentOutcome {
    Assigned {
        job_id: JobId,
        worker_id: WorkerId,
        worker_name: String,
    },
    Rejected {
        reason: RejectionReason,
    },
}

/// Serde helpers for the `HH:MM` wire format used for times of day.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// `Option<NaiveTime>` variant of [`hhmm`].
pub mod hhmm_opt {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => super::hhmm::serialize(time, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|value| {
            NaiveTime::parse_from_str(&value, super::hhmm::FORMAT)
                .map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}
