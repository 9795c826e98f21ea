use super::common::time;
use crate::scheduling::slots::{
    scheduled_time_for, slot_for_time, slots_from_range, Slot, SlotKind, SlotSet,
};

#[test]
fn range_spanning_noon_offers_whole_day() {
    let slots = slots_from_range(time("09:00"), time("17:00"));
    assert_eq!(slots, SlotSet::ALL);
}

#[test]
fn morning_range_offers_am_only() {
    assert_eq!(slots_from_range(time("09:00"), time("12:00")), SlotSet::AM);
    assert_eq!(slots_from_range(time("08:00"), time("11:30")), SlotSet::AM);
}

#[test]
fn range_ending_in_the_thirteen_hour_spans_the_day() {
    // The whole-day check wins before the morning clause sees end hour 13.
    assert_eq!(slots_from_range(time("08:00"), time("13:00")), SlotSet::ALL);
    assert_eq!(slots_from_range(time("09:00"), time("13:30")), SlotSet::ALL);
}

#[test]
fn afternoon_range_offers_pm_only() {
    assert_eq!(slots_from_range(time("12:00"), time("17:00")), SlotSet::PM);
    assert_eq!(slots_from_range(time("13:00"), time("16:00")), SlotSet::PM);
}

#[test]
fn thresholds_compare_whole_hours() {
    // 12:30 has end hour 12, so the range reads as morning-only; an end an
    // hour later tips it over into the whole day.
    assert_eq!(slots_from_range(time("09:00"), time("12:30")), SlotSet::AM);
    assert_eq!(slots_from_range(time("09:00"), time("14:00")), SlotSet::ALL);
}

#[test]
fn subtracting_a_half_also_drops_full() {
    let remaining = SlotSet::ALL.subtract(SlotSet::AM);
    assert_eq!(remaining, SlotSet::PM);
    assert!(!remaining.contains(Slot::Full));
}

#[test]
fn subtracting_whole_day_empties_the_set() {
    assert!(SlotSet::ALL.subtract(SlotSet::ALL).is_empty());
    assert!(SlotSet::AM.subtract(SlotSet::ALL).is_empty());
}

#[test]
fn union_of_opposite_halves_does_not_invent_full() {
    let union = SlotSet::AM.union(SlotSet::PM);
    assert!(union.contains(Slot::Am));
    assert!(union.contains(Slot::Pm));
    assert!(!union.contains(Slot::Full));
}

#[test]
fn satisfies_matches_booking_shapes() {
    assert!(SlotSet::ALL.satisfies(SlotKind::Full));
    assert!(SlotSet::ALL.satisfies(SlotKind::Am));
    assert!(SlotSet::AM.satisfies(SlotKind::Am));
    assert!(!SlotSet::AM.satisfies(SlotKind::Full));
    assert!(!SlotSet::AM.satisfies(SlotKind::Pm));
    assert!(SlotSet::AM.satisfies(SlotKind::Exact));
    assert!(!SlotSet::EMPTY.satisfies(SlotKind::Exact));
}

#[test]
fn slot_for_time_splits_at_noon() {
    assert_eq!(slot_for_time(time("09:30")), Slot::Am);
    assert_eq!(slot_for_time(time("11:59")), Slot::Am);
    assert_eq!(slot_for_time(time("12:00")), Slot::Pm);
}

#[test]
fn scheduled_times_follow_slot_shape() {
    assert_eq!(scheduled_time_for(SlotKind::Am, None), time("09:00"));
    assert_eq!(scheduled_time_for(SlotKind::Full, None), time("09:00"));
    assert_eq!(scheduled_time_for(SlotKind::Pm, None), time("13:00"));
    assert_eq!(
        scheduled_time_for(SlotKind::Exact, Some(time("10:15"))),
        time("10:15")
    );
}

#[test]
fn slot_set_serializes_as_token_array() {
    let json = serde_json::to_value(SlotSet::ALL).expect("serialize");
    assert_eq!(json, serde_json::json!(["full", "am", "pm"]));

    let parsed: SlotSet = serde_json::from_value(serde_json::json!(["am"])).expect("deserialize");
    assert_eq!(parsed, SlotSet::AM);
}

#[test]
fn unknown_slot_token_is_rejected() {
    let result: Result<SlotSet, _> = serde_json::from_value(serde_json::json!(["evening"]));
    assert!(result.is_err());
}
