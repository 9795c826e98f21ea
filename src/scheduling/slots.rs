//! Slot arithmetic: the `am`/`pm`/`full` tokens that represent bookable time
//! within a single day, and the rules for deriving them from hour ranges.

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The unit of bookable time within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Am,
    Pm,
    Full,
}

impl Slot {
    pub const fn label(self) -> &'static str {
        match self {
            Slot::Am => "am",
            Slot::Pm => "pm",
            Slot::Full => "full",
        }
    }
}

/// Slot shape requested at booking time. `Exact` carries its time in the
/// accompanying request field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Am,
    Pm,
    Full,
    Exact,
}

/// Compact set of slot tokens.
///
/// `full` is only meaningful when the whole day is open: any subtraction that
/// removes a half also removes `full`. Serialized as an array of tokens in
/// `full`, `am`, `pm` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotSet {
    am: bool,
    pm: bool,
    full: bool,
}

impl SlotSet {
    pub const EMPTY: SlotSet = SlotSet {
        am: false,
        pm: false,
        full: false,
    };

    /// The fully open day: `{full, am, pm}`.
    pub const ALL: SlotSet = SlotSet {
        am: true,
        pm: true,
        full: true,
    };

    pub const AM: SlotSet = SlotSet {
        am: true,
        pm: false,
        full: false,
    };

    pub const PM: SlotSet = SlotSet {
        am: false,
        pm: true,
        full: false,
    };

    pub fn contains(self, slot: Slot) -> bool {
        match slot {
            Slot::Am => self.am,
            Slot::Pm => self.pm,
            Slot::Full => self.full,
        }
    }

    pub fn insert(&mut self, slot: Slot) {
        match slot {
            Slot::Am => self.am = true,
            Slot::Pm => self.pm = true,
            Slot::Full => self.full = true,
        }
    }

    pub fn is_empty(self) -> bool {
        !self.am && !self.pm && !self.full
    }

    pub fn union(self, other: SlotSet) -> SlotSet {
        SlotSet {
            am: self.am || other.am,
            pm: self.pm || other.pm,
            full: self.full || other.full,
        }
    }

    /// Remove the tokens in `other`. Losing either half also drops `full`,
    /// so a half-day booking narrows availability to the complementary half
    /// and never leaves a stale whole-day token behind.
    pub fn subtract(self, other: SlotSet) -> SlotSet {
        SlotSet {
            am: self.am && !other.am,
            pm: self.pm && !other.pm,
            full: self.full && !other.full && !other.am && !other.pm,
        }
    }

    /// Whether a worker holding this set can take a booking of `kind`.
    pub fn satisfies(self, kind: SlotKind) -> bool {
        match kind {
            SlotKind::Full => self.full || (self.am && self.pm),
            SlotKind::Am => self.am || self.full,
            SlotKind::Pm => self.pm || self.full,
            SlotKind::Exact => !self.is_empty(),
        }
    }

    pub fn to_vec(self) -> Vec<Slot> {
        let mut slots = Vec::with_capacity(3);
        if self.full {
            slots.push(Slot::Full);
        }
        if self.am {
            slots.push(Slot::Am);
        }
        if self.pm {
            slots.push(Slot::Pm);
        }
        slots
    }
}

impl FromIterator<Slot> for SlotSet {
    fn from_iter<I: IntoIterator<Item = Slot>>(iter: I) -> Self {
        let mut set = SlotSet::EMPTY;
        for slot in iter {
            set.insert(slot);
        }
        set
    }
}

impl Serialize for SlotSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_vec().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SlotSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let slots = Vec::<Slot>::deserialize(deserializer)?;
        Ok(slots.into_iter().collect())
    }
}

/// Noon splits the day into its two bookable halves.
pub const MIDDAY: NaiveTime = match NaiveTime::from_hms_opt(12, 0, 0) {
    Some(time) => time,
    None => unreachable!(),
};

/// Derive slot tokens from a working-hours range.
///
/// The hour thresholds (`< 12`, `<= 13`, `>= 12`) are the documented business
/// rules, checked in order; ranges that fit none of them fall back to the
/// whole day. The whole-day check runs first, so a range ending in the 13:00
/// hour spans the day; the morning clause only catches ranges ending at noon
/// or earlier.
pub fn slots_from_range(start: NaiveTime, end: NaiveTime) -> SlotSet {
    let start_hour = chrono::Timelike::hour(&start);
    let end_hour = chrono::Timelike::hour(&end);

    if start_hour < 12 && end_hour > 12 {
        return SlotSet::ALL;
    }
    if start_hour < 12 && end_hour <= 13 {
        return SlotSet::AM;
    }
    if start_hour >= 12 {
        return SlotSet::PM;
    }
    SlotSet::ALL
}

/// Which half of the day a scheduled start time lands in.
pub fn slot_for_time(time: NaiveTime) -> Slot {
    if time < MIDDAY {
        Slot::Am
    } else {
        Slot::Pm
    }
}

/// Scheduled start time recorded on a job for the requested slot shape.
/// Morning and whole-day bookings start the day; afternoons start at 13:00.
pub fn scheduled_time_for(kind: SlotKind, exact: Option<NaiveTime>) -> NaiveTime {
    match kind {
        SlotKind::Exact => exact.unwrap_or(DAY_START),
        SlotKind::Pm => AFTERNOON_START,
        SlotKind::Am | SlotKind::Full => DAY_START,
    }
}

pub const DAY_START: NaiveTime = match NaiveTime::from_hms_opt(9, 0, 0) {
    Some(time) => time,
    None => unreachable!(),
};

pub const DAY_END: NaiveTime = match NaiveTime::from_hms_opt(17, 0, 0) {
    Some(time) => time,
    None => unreachable!(),
};

pub const AFTERNOON_START: NaiveTime = match NaiveTime::from_hms_opt(13, 0, 0) {
    Some(time) => time,
    None => unreachable!(),
};
