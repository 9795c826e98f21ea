//! The availability aggregator: reconciles master calendar rules, per-worker
//! schedules, and booked jobs into a day-by-day availability answer.

use std::sync::Arc;

use chrono::{Duration, Months, NaiveDate};

use super::calendar::{self, BlockCheck};
use super::domain::{
    day_of_week, is_weekend, AdminCalendarDay, AvailabilityReason, DateAvailability, DateRange,
    ServiceId, SlotCounts, WorkerProfile, WorkerSlots,
};
use super::ledger;
use super::slots::{slots_from_range, Slot, SlotSet, DAY_END, DAY_START};
use super::store::{ScheduleSnapshot, SchedulingStore};
use super::SchedulingError;

/// Parameters for a public availability scan.
#[derive(Debug, Clone)]
pub struct AvailabilityQuery {
    pub start: NaiveDate,
    pub days: u32,
    /// Accepted for forward compatibility; not used to filter workers by
    /// distance. All eligible workers are treated as in range.
    pub postcode: Option<String>,
    pub service_ids: Vec<ServiceId>,
}

impl AvailabilityQuery {
    pub fn range(&self) -> DateRange {
        DateRange::days_from(self.start, self.days.max(1))
    }
}

/// Read side of the scheduling core. All queries batch-fetch a snapshot for
/// the whole range up front and then evaluate each date as a pure function.
pub struct AvailabilityEngine<S> {
    store: Arc<S>,
}

impl<S> Clone for AvailabilityEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: SchedulingStore> AvailabilityEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Day-by-day availability for the queried window, in date order.
    pub fn availability(
        &self,
        query: &AvailabilityQuery,
    ) -> Result<Vec<DateAvailability>, SchedulingError> {
        let range = query.range();
        let snapshot = self.store.snapshot(range)?;
        Ok(range
            .iter()
            .map(|date| date_availability(&snapshot, date, &query.service_ids))
            .collect())
    }

    /// Per-worker candidate list for a single date, after overrides, booked
    /// jobs, and the skill filter. Workers left with no slots are dropped.
    pub fn candidates_for(
        &self,
        date: NaiveDate,
        service_ids: &[ServiceId],
    ) -> Result<Vec<WorkerSlots>, SchedulingError> {
        let snapshot = self.store.snapshot(DateRange::single(date))?;
        Ok(candidate_slots(&snapshot, date, service_ids))
    }

    /// Admin calendar for a month given as `YYYY-MM`.
    pub fn admin_calendar(&self, month: &str) -> Result<Vec<AdminCalendarDay>, SchedulingError> {
        let range = month_range(month)?;
        let snapshot = self.store.snapshot(range)?;
        Ok(range
            .iter()
            .map(|date| admin_calendar_day(&snapshot, date))
            .collect())
    }
}

/// The seven-step per-date pipeline: weekday gate, full-block gate, candidate
/// enumeration, per-worker slot subtraction, union, partial-block subtraction,
/// and the final reason code.
pub fn date_availability(
    snapshot: &ScheduleSnapshot,
    date: NaiveDate,
    service_ids: &[ServiceId],
) -> DateAvailability {
    let weekend = is_weekend(date);

    if !calendar::is_day_active(snapshot, date) {
        return DateAvailability {
            date,
            is_available: false,
            reason: AvailabilityReason::DayInactive,
            slots: SlotSet::EMPTY,
            contractor_count: 0,
            is_weekend: weekend,
        };
    }

    let block = calendar::block_for(snapshot, date);
    if block.is_full_block() {
        return DateAvailability {
            date,
            is_available: false,
            reason: AvailabilityReason::MasterBlocked,
            slots: SlotSet::EMPTY,
            contractor_count: 0,
            is_weekend: weekend,
        };
    }

    let candidates = candidate_slots(snapshot, date, service_ids);
    if candidates.is_empty() {
        return DateAvailability {
            date,
            is_available: false,
            reason: AvailabilityReason::NoContractors,
            slots: SlotSet::EMPTY,
            contractor_count: 0,
            is_weekend: weekend,
        };
    }

    let union = candidates
        .iter()
        .fold(SlotSet::EMPTY, |acc, c| acc.union(c.slots));

    let slots = match &block {
        BlockCheck::Partial { blocked, .. } => union.subtract(*blocked),
        _ => union,
    };

    // Candidates existed, so an empty result here can only come from the
    // partial master block.
    let reason = if slots.is_empty() {
        AvailabilityReason::MasterBlocked
    } else {
        AvailabilityReason::Available
    };

    DateAvailability {
        date,
        is_available: !slots.is_empty(),
        reason,
        slots,
        contractor_count: candidates.len(),
        is_weekend: weekend,
    }
}

/// Resolve one worker's slots for a date: a date override wins outright over
/// the weekly pattern, in both directions; booked jobs are then subtracted.
pub fn resolve_worker_slots(
    snapshot: &ScheduleSnapshot,
    worker: &WorkerProfile,
    date: NaiveDate,
) -> SlotSet {
    let offered = match snapshot.date_override(&worker.id, date) {
        Some(entry) if !entry.is_available => return SlotSet::EMPTY,
        Some(entry) => slots_from_range(
            entry.start_time.unwrap_or(DAY_START),
            entry.end_time.unwrap_or(DAY_END),
        ),
        None => match snapshot.weekly_pattern(&worker.id, day_of_week(date)) {
            Some(pattern) if pattern.is_active => {
                slots_from_range(pattern.start_time, pattern.end_time)
            }
            _ => return SlotSet::EMPTY,
        },
    };

    let consumed = ledger::consumed_slots(snapshot.jobs_for(&worker.id, date));
    offered.subtract(consumed)
}

/// Candidate enumeration shared with the assignment engine.
pub fn candidate_slots(
    snapshot: &ScheduleSnapshot,
    date: NaiveDate,
    service_ids: &[ServiceId],
) -> Vec<WorkerSlots> {
    snapshot
        .workers
        .iter()
        .filter(|worker| worker.is_bookable() && worker.matches_services(service_ids))
        .filter_map(|worker| {
            let slots = resolve_worker_slots(snapshot, worker, date);
            if slots.is_empty() {
                return None;
            }
            Some(WorkerSlots {
                worker_id: worker.id.clone(),
                worker_name: worker.name.clone(),
                date,
                slots,
            })
        })
        .collect()
}

fn admin_calendar_day(snapshot: &ScheduleSnapshot, date: NaiveDate) -> AdminCalendarDay {
    let block = calendar::block_for(snapshot, date);
    let candidates = candidate_slots(snapshot, date, &[]);

    let mut counts = SlotCounts { am: 0, pm: 0 };
    for candidate in &candidates {
        if candidate.slots.contains(Slot::Am) || candidate.slots.contains(Slot::Full) {
            counts.am += 1;
        }
        if candidate.slots.contains(Slot::Pm) || candidate.slots.contains(Slot::Full) {
            counts.pm += 1;
        }
    }

    AdminCalendarDay {
        date,
        master_blocked: block.is_full_block(),
        master_blocked_reason: block.reason().map(str::to_string),
        day_active: calendar::is_day_active(snapshot, date),
        contractor_count: candidates.len(),
        booking_count: snapshot.jobs_on(date).count(),
        slots: counts,
    }
}

/// Inclusive range covering the calendar month given as `YYYY-MM`.
pub fn month_range(month: &str) -> Result<DateRange, SchedulingError> {
    let start = NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .map_err(|_| SchedulingError::InvalidMonth(month.to_string()))?;
    let end = start
        .checked_add_months(Months::new(1))
        .map(|next| next - Duration::days(1))
        .ok_or_else(|| SchedulingError::InvalidMonth(month.to_string()))?;
    Ok(DateRange::new(start, end))
}
