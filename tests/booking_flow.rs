//! End-to-end booking flow over the HTTP surface: availability shrinks when a
//! booking is assigned and comes back when the job is cancelled.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::NaiveTime;
use serde_json::{json, Value};
use tower::ServiceExt;

use fieldops::scheduling::{
    calendar, scheduling_router, InMemoryQuoteDirectory, MemoryStore, QuoteId, QuoteSummary,
    SchedulingApi, SchedulingStore, ServiceId, WorkerId, WorkerProfile, WorkerStatus,
    WorkerWeeklyPattern,
};

const MONDAY: &str = "2025-03-03";

fn hhmm(raw: &str) -> NaiveTime {
    NaiveTime::parse_from_str(raw, "%H:%M").expect("valid time")
}

fn build_app() -> Router {
    let store = Arc::new(MemoryStore::new());
    calendar::seed_default_master_pattern(store.as_ref()).expect("seed master pattern");

    store
        .upsert_worker(WorkerProfile {
            id: WorkerId("w-1".to_string()),
            name: "Alex Reid".to_string(),
            postcode: Some("LS1 4AP".to_string()),
            status: Some(WorkerStatus::Available),
            skills: vec![ServiceId("plumbing".to_string())],
        })
        .expect("store worker");
    for day in 1..=5u8 {
        store
            .upsert_weekly_pattern(WorkerWeeklyPattern {
                worker_id: WorkerId("w-1".to_string()),
                day_of_week: day,
                is_active: true,
                start_time: hhmm("09:00"),
                end_time: hhmm("17:00"),
            })
            .expect("store weekly pattern");
    }

    let quotes = Arc::new(InMemoryQuoteDirectory::default());
    quotes.insert(
        QuoteId("q-900".to_string()),
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

    scheduling_router(Arc::new(SchedulingApi::new(store, quotes)))
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    serde_json::from_slice(&bytes).expect("json body")
}

async fn public_slots(app: &Router) -> Value {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/availability/public?start={MONDAY}&days=1"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    body["dates"][0]["slots"].clone()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn booking_consumes_availability_and_cancellation_restores_it() {
    let app = build_app();

    assert_eq!(public_slots(&app).await, json!(["full", "am", "pm"]));

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/bookings/select",
            json!({ "quote_id": "q-900", "date": MONDAY, "slot": "am" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["assignment"]["status"], "assigned");
    assert_eq!(body["assignment"]["worker_id"], "w-1");
    let job_id = body["assignment"]["job_id"]
        .as_str()
        .expect("job id")
        .to_string();

    // The morning is gone, and a second morning request fails softly.
    assert_eq!(public_slots(&app).await, json!(["pm"]));

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/bookings/select",
            json!({ "quote_id": "q-900", "date": MONDAY, "slot": "am" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["assignment"]["status"], "rejected");
    assert_eq!(body["assignment"]["reason"], "no_contractors_for_slot");

    let response = app
        .clone()
        .oneshot(post_json(&format!("/api/jobs/{job_id}/cancel"), json!({})))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["job"]["status"], "cancelled");

    assert_eq!(public_slots(&app).await, json!(["full", "am", "pm"]));
}
