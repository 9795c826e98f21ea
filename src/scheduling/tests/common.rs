use std::sync::Arc;

use axum::response::Response;
use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;

use crate::scheduling::assignment::{
    AssignmentEngine, InMemoryQuoteDirectory, QuoteDirectory, QuoteDirectoryError, QuoteSummary,
};
use crate::scheduling::availability::AvailabilityEngine;
use crate::scheduling::calendar::seed_default_master_pattern;
use crate::scheduling::domain::{
    BookingRequest, QuoteId, ServiceId, WorkerId, WorkerProfile, WorkerStatus, WorkerWeeklyPattern,
};
use crate::scheduling::slots::SlotKind;
use crate::scheduling::store::{MemoryStore, SchedulingStore};

pub(super) const MONDAY: &str = "2025-03-03";
pub(super) const TUESDAY: &str = "2025-03-04";
pub(super) const SATURDAY: &str = "2025-03-08";

pub(super) fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid fixture date")
}

pub(super) fn time(raw: &str) -> NaiveTime {
    NaiveTime::parse_from_str(raw, "%H:%M").expect("valid fixture time")
}

/// Store with the default master pattern (active Mon-Fri 09:00-17:00).
pub(super) fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    seed_default_master_pattern(store.as_ref()).expect("seed master pattern");
    store
}

pub(super) fn worker(id: &str, name: &str, skills: &[&str]) -> WorkerProfile {
    WorkerProfile {
        id: WorkerId(id.to_string()),
        name: name.to_string(),
        postcode: Some("LS1 4AP".to_string()),
        status: Some(WorkerStatus::Available),
        skills: skills.iter().map(|s| ServiceId(s.to_string())).collect(),
    }
}

/// Register a worker with an active weekday pattern covering the given hours.
pub(super) fn add_weekday_worker(
    store: &MemoryStore,
    id: &str,
    name: &str,
    skills: &[&str],
    start: &str,
    end: &str,
) -> WorkerId {
    let profile = worker(id, name, skills);
    let worker_id = profile.id.clone();
    store.upsert_worker(profile).expect("store worker");
    for day in 1..=5u8 {
        store
            .upsert_weekly_pattern(WorkerWeeklyPattern {
                worker_id: worker_id.clone(),
                day_of_week: day,
                is_active: true,
                start_time: time(start),
                end_time: time(end),
            })
            .expect("store weekly pattern");
    }
    worker_id
}

pub(super) fn quote_directory() -> Arc<InMemoryQuoteDirectory> {
    let quotes = Arc::new(InMemoryQuoteDirectory::default());
    quotes.insert(
        QuoteId("q-100".to_string()),
        QuoteSummary {
            customer_name: "Jordan Hale".to_string(),
            customer_phone: "07700 900123".to_string(),
            address: Some("12 Mill Lane".to_string()),
            postcode: Some("LS2 7EW".to_string()),
            job_description: "Replace kitchen tap".to_string(),
            service_ids: vec![ServiceId("plumbing".to_string())],
            payout_pence: Some(8500),
        },
    );
    quotes
}

pub(super) fn engines(
    store: Arc<MemoryStore>,
) -> (
    AvailabilityEngine<MemoryStore>,
    AssignmentEngine<MemoryStore, InMemoryQuoteDirectory>,
) {
    let quotes = quote_directory();
    (
        AvailabilityEngine::new(store.clone()),
        AssignmentEngine::new(store, quotes),
    )
}

pub(super) fn booking(date_raw: &str, slot: SlotKind) -> BookingRequest {
    BookingRequest {
        quote_id: Some(QuoteId("q-100".to_string())),
        customer_name: "Jordan Hale".to_string(),
        customer_phone: "07700 900123".to_string(),
        address: Some("12 Mill Lane".to_string()),
        postcode: Some("LS2 7EW".to_string()),
        description: "Replace kitchen tap".to_string(),
        date: date(date_raw),
        slot,
        exact_time: None,
        service_ids: Vec::new(),
        payout_pence: Some(8500),
    }
}

/// Quote directory that always fails, for exercising soft error handling.
pub(super) struct UnavailableQuotes;

impl QuoteDirectory for UnavailableQuotes {
    fn resolve(&self, _quote: &QuoteId) -> Result<Option<QuoteSummary>, QuoteDirectoryError> {
        Err(QuoteDirectoryError::Unavailable("offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    serde_json::from_slice(&bytes).expect("json body")
}
