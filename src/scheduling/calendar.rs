//! Master calendar rules: the business-wide weekly operating pattern and the
//! list of explicitly blocked dates.

use chrono::NaiveDate;

use super::domain::{day_of_week, MasterBlockedDate, MasterDayPattern};
use super::slots::SlotSet;
use super::store::{ScheduleSnapshot, SchedulingStore};
use super::SchedulingError;

/// Weekday indexes run Sunday (0) through Saturday (6).
pub fn validate_day_of_week(day: u8) -> Result<(), SchedulingError> {
    if day > 6 {
        return Err(SchedulingError::InvalidDayOfWeek(day));
    }
    Ok(())
}

/// The operating pattern for a date's weekday, falling back to the documented
/// default (active Mon-Fri 09:00-17:00) when no record exists.
pub fn day_pattern(snapshot: &ScheduleSnapshot, date: NaiveDate) -> MasterDayPattern {
    let day = day_of_week(date);
    snapshot
        .day_patterns
        .get(day as usize)
        .and_then(|p| p.clone())
        .unwrap_or_else(|| MasterDayPattern::default_for(day))
}

pub fn is_day_active(snapshot: &ScheduleSnapshot, date: NaiveDate) -> bool {
    day_pattern(snapshot, date).is_active
}

/// Master-level block state for one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockCheck {
    Open,
    /// The whole day is closed.
    Full { reason: Option<String> },
    /// Only the listed slot tokens are closed.
    Partial {
        reason: Option<String>,
        blocked: SlotSet,
    },
}

impl BlockCheck {
    pub fn is_full_block(&self) -> bool {
        matches!(self, BlockCheck::Full { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            BlockCheck::Open => None,
            BlockCheck::Full { reason } | BlockCheck::Partial { reason, .. } => reason.as_deref(),
        }
    }
}

pub fn block_for(snapshot: &ScheduleSnapshot, date: NaiveDate) -> BlockCheck {
    match snapshot.blocked.get(&date) {
        None => BlockCheck::Open,
        Some(MasterBlockedDate {
            reason,
            blocked_slots: Some(blocked),
            ..
        }) => BlockCheck::Partial {
            reason: reason.clone(),
            blocked: *blocked,
        },
        Some(MasterBlockedDate { reason, .. }) => BlockCheck::Full {
            reason: reason.clone(),
        },
    }
}

/// Write the default weekly pattern into an empty store so admin screens have
/// a full set of weekday rows to edit. No-op when any pattern exists.
pub fn seed_default_master_pattern<S: SchedulingStore>(store: &S) -> Result<(), SchedulingError> {
    if !store.master_patterns()?.is_empty() {
        return Ok(());
    }
    for day in 0..=6u8 {
        store.upsert_master_pattern(MasterDayPattern::default_for(day))?;
    }
    Ok(())
}
