//! HTTP contracts for the scheduling core: the public availability feed, the
//! admin master-calendar screens, worker self-service schedules, and the
//! booking-selection endpoint that triggers assignment.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{Duration, Local, NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::json;

use super::assignment::{AssignmentEngine, QuoteDirectory};
use super::availability::{AvailabilityEngine, AvailabilityQuery};
use super::calendar;
use super::domain::{
    hhmm_opt, DateRange, JobId, MasterBlockedDate, MasterDayPattern, OverrideOrigin, QuoteId,
    ServiceId, WorkerDateOverride, WorkerId, WorkerSchedule, WorkerWeeklyPattern,
};
use super::slots::{SlotKind, SlotSet};
use super::store::SchedulingStore;
use super::SchedulingError;

/// Shared state for the scheduling routes.
pub struct SchedulingApi<S, Q> {
    pub store: Arc<S>,
    pub availability: AvailabilityEngine<S>,
    pub assignment: AssignmentEngine<S, Q>,
    pub window_days: u32,
    pub max_window_days: u32,
}

impl<S, Q> SchedulingApi<S, Q>
where
    S: SchedulingStore + 'static,
    Q: QuoteDirectory + 'static,
{
    pub fn new(store: Arc<S>, quotes: Arc<Q>) -> Self {
        Self::with_window(store, quotes, 28, 90)
    }

    pub fn with_window(
        store: Arc<S>,
        quotes: Arc<Q>,
        window_days: u32,
        max_window_days: u32,
    ) -> Self {
        Self {
            availability: AvailabilityEngine::new(store.clone()),
            assignment: AssignmentEngine::new(store.clone(), quotes),
            store,
            window_days,
            max_window_days,
        }
    }
}

/// Router builder exposing the scheduling endpoints.
pub fn scheduling_router<S, Q>(api: Arc<SchedulingApi<S, Q>>) -> Router
where
    S: SchedulingStore + 'static,
    Q: QuoteDirectory + 'static,
{
    Router::new()
        .route(
            "/api/availability/public",
            get(public_availability_handler::<S, Q>),
        )
        .route(
            "/api/availability/admin/calendar",
            get(admin_calendar_handler::<S, Q>),
        )
        .route(
            "/api/availability/admin/master",
            get(master_pattern_handler::<S, Q>),
        )
        .route(
            "/api/availability/admin/master/:day_of_week",
            put(update_master_pattern_handler::<S, Q>),
        )
        .route(
            "/api/availability/admin/blocked",
            get(blocked_dates_handler::<S, Q>).post(add_blocked_date_handler::<S, Q>),
        )
        .route(
            "/api/availability/admin/blocked/:date",
            delete(remove_blocked_date_handler::<S, Q>),
        )
        .route(
            "/api/availability/admin/blocked/toggle",
            post(toggle_blocked_date_handler::<S, Q>),
        )
        .route(
            "/api/availability/worker/:worker_id",
            get(worker_schedule_handler::<S, Q>),
        )
        .route(
            "/api/availability/worker/:worker_id/weekly/:day_of_week",
            put(worker_weekly_handler::<S, Q>),
        )
        .route(
            "/api/availability/worker/:worker_id/date",
            post(worker_override_handler::<S, Q>),
        )
        .route(
            "/api/availability/worker/:worker_id/date/:date",
            delete(delete_worker_override_handler::<S, Q>),
        )
        .route("/api/bookings/select", post(select_booking_handler::<S, Q>))
        .route("/api/jobs/:job_id/cancel", post(cancel_job_handler::<S, Q>))
        .route(
            "/api/jobs/:job_id/reassign",
            post(reassign_job_handler::<S, Q>),
        )
        .with_state(api)
}

fn error_response(err: SchedulingError) -> Response {
    let status = if err.is_validation() {
        StatusCode::BAD_REQUEST
    } else if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else if matches!(err, SchedulingError::InvalidTransition { .. }) {
        StatusCode::CONFLICT
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn parse_date(raw: &str) -> Result<NaiveDate, SchedulingError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| SchedulingError::InvalidDate(raw.to_string()))
}

#[derive(Debug, Deserialize)]
pub(crate) struct PublicAvailabilityParams {
    days: Option<u32>,
    start: Option<String>,
    postcode: Option<String>,
    /// Comma-separated service SKU ids.
    service_ids: Option<String>,
}

pub(crate) async fn public_availability_handler<S, Q>(
    State(api): State<Arc<SchedulingApi<S, Q>>>,
    Query(params): Query<PublicAvailabilityParams>,
) -> Response
where
    S: SchedulingStore + 'static,
    Q: QuoteDirectory + 'static,
{
    let days = params.days.unwrap_or(api.window_days);
    if days > api.max_window_days {
        return error_response(SchedulingError::WindowTooLarge {
            requested: days,
            max: api.max_window_days,
        });
    }

    let start = match params.start.as_deref() {
        Some(raw) => match parse_date(raw) {
            Ok(date) => date,
            Err(err) => return error_response(err),
        },
        None => Local::now().date_naive(),
    };

    let service_ids = params
        .service_ids
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| ServiceId(s.to_string()))
                .collect()
        })
        .unwrap_or_default();

    let query = AvailabilityQuery {
        start,
        days,
        postcode: params.postcode,
        service_ids,
    };

    match api.availability.availability(&query) {
        Ok(dates) => (StatusCode::OK, Json(json!({ "dates": dates }))).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdminCalendarParams {
    month: Option<String>,
}

pub(crate) async fn admin_calendar_handler<S, Q>(
    State(api): State<Arc<SchedulingApi<S, Q>>>,
    Query(params): Query<AdminCalendarParams>,
) -> Response
where
    S: SchedulingStore + 'static,
    Q: QuoteDirectory + 'static,
{
    let month = params
        .month
        .unwrap_or_else(|| Local::now().date_naive().format("%Y-%m").to_string());

    match api.availability.admin_calendar(&month) {
        Ok(dates) => (StatusCode::OK, Json(json!({ "dates": dates }))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn master_pattern_handler<S, Q>(
    State(api): State<Arc<SchedulingApi<S, Q>>>,
) -> Response
where
    S: SchedulingStore + 'static,
    Q: QuoteDirectory + 'static,
{
    if let Err(err) = calendar::seed_default_master_pattern(api.store.as_ref()) {
        return error_response(err);
    }
    match api.store.master_patterns() {
        Ok(pattern) => (StatusCode::OK, Json(json!({ "pattern": pattern }))).into_response(),
        Err(err) => error_response(err.into()),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MasterPatternUpdate {
    is_active: Option<bool>,
    #[serde(default, with = "hhmm_opt")]
    start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm_opt")]
    end_time: Option<NaiveTime>,
}

pub(crate) async fn update_master_pattern_handler<S, Q>(
    State(api): State<Arc<SchedulingApi<S, Q>>>,
    Path(day_of_week): Path<u8>,
    Json(update): Json<MasterPatternUpdate>,
) -> Response
where
    S: SchedulingStore + 'static,
    Q: QuoteDirectory + 'static,
{
    if let Err(err) = calendar::validate_day_of_week(day_of_week) {
        return error_response(err);
    }

    let result = api.store.master_pattern(day_of_week).map(|existing| {
        let mut pattern = existing.unwrap_or_else(|| MasterDayPattern::default_for(day_of_week));
        if let Some(is_active) = update.is_active {
            pattern.is_active = is_active;
        }
        if let Some(start_time) = update.start_time {
            pattern.start_time = start_time;
        }
        if let Some(end_time) = update.end_time {
            pattern.end_time = end_time;
        }
        pattern
    });

    match result.and_then(|pattern| api.store.upsert_master_pattern(pattern)) {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(err) => error_response(err.into()),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct BlockedRangeParams {
    start: Option<String>,
    end: Option<String>,
}

pub(crate) async fn blocked_dates_handler<S, Q>(
    State(api): State<Arc<SchedulingApi<S, Q>>>,
    Query(params): Query<BlockedRangeParams>,
) -> Response
where
    S: SchedulingStore + 'static,
    Q: QuoteDirectory + 'static,
{
    let range = match parse_range(params.start.as_deref(), params.end.as_deref()) {
        Ok(range) => range,
        Err(err) => return error_response(err),
    };
    match api.store.blocked_dates_in(range) {
        Ok(blocked) => {
            (StatusCode::OK, Json(json!({ "blocked_dates": blocked }))).into_response()
        }
        Err(err) => error_response(err.into()),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct BlockedDateBody {
    date: NaiveDate,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    blocked_slots: Option<SlotSet>,
}

pub(crate) async fn add_blocked_date_handler<S, Q>(
    State(api): State<Arc<SchedulingApi<S, Q>>>,
    Json(body): Json<BlockedDateBody>,
) -> Response
where
    S: SchedulingStore + 'static,
    Q: QuoteDirectory + 'static,
{
    let blocked = MasterBlockedDate {
        date: body.date,
        reason: body.reason,
        blocked_slots: body.blocked_slots,
    };
    match api.store.put_blocked_date(blocked) {
        Ok(()) => (StatusCode::CREATED, Json(json!({ "success": true }))).into_response(),
        Err(err) => error_response(err.into()),
    }
}

pub(crate) async fn remove_blocked_date_handler<S, Q>(
    State(api): State<Arc<SchedulingApi<S, Q>>>,
    Path(date): Path<String>,
) -> Response
where
    S: SchedulingStore + 'static,
    Q: QuoteDirectory + 'static,
{
    let date = match parse_date(&date) {
        Ok(date) => date,
        Err(err) => return error_response(err),
    };
    match api.store.remove_blocked_date(date) {
        Ok(true) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no blocked date on {date}") })),
        )
            .into_response(),
        Err(err) => error_response(err.into()),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToggleBlockedBody {
    date: NaiveDate,
    #[serde(default)]
    reason: Option<String>,
}

pub(crate) async fn toggle_blocked_date_handler<S, Q>(
    State(api): State<Arc<SchedulingApi<S, Q>>>,
    Json(body): Json<ToggleBlockedBody>,
) -> Response
where
    S: SchedulingStore + 'static,
    Q: QuoteDirectory + 'static,
{
    let existing = match api.store.blocked_date(body.date) {
        Ok(existing) => existing,
        Err(err) => return error_response(err.into()),
    };

    let result = if existing.is_some() {
        api.store
            .remove_blocked_date(body.date)
            .map(|_| json!({ "blocked": false, "action": "unblocked" }))
    } else {
        api.store
            .put_blocked_date(MasterBlockedDate {
                date: body.date,
                reason: body.reason,
                blocked_slots: None,
            })
            .map(|()| json!({ "blocked": true, "action": "blocked" }))
    };

    match result {
        Ok(payload) => (StatusCode::OK, Json(payload)).into_response(),
        Err(err) => error_response(err.into()),
    }
}

pub(crate) async fn worker_schedule_handler<S, Q>(
    State(api): State<Arc<SchedulingApi<S, Q>>>,
    Path(worker_id): Path<String>,
    Query(params): Query<BlockedRangeParams>,
) -> Response
where
    S: SchedulingStore + 'static,
    Q: QuoteDirectory + 'static,
{
    let worker_id = WorkerId(worker_id);
    let range = match parse_range(params.start.as_deref(), params.end.as_deref()) {
        Ok(range) => range,
        Err(err) => return error_response(err),
    };

    let schedule = (|| -> Result<WorkerSchedule, SchedulingError> {
        if api.store.worker(&worker_id)?.is_none() {
            return Err(SchedulingError::WorkerNotFound(worker_id.clone()));
        }
        Ok(WorkerSchedule {
            weekly_pattern: api.store.weekly_patterns_for(&worker_id)?,
            date_overrides: api.store.overrides_for(&worker_id, range)?,
            jobs: api.store.jobs_in_range(Some(&worker_id), range)?,
        })
    })();

    match schedule {
        Ok(schedule) => (StatusCode::OK, Json(schedule)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn worker_weekly_handler<S, Q>(
    State(api): State<Arc<SchedulingApi<S, Q>>>,
    Path((worker_id, day_of_week)): Path<(String, u8)>,
    Json(update): Json<MasterPatternUpdate>,
) -> Response
where
    S: SchedulingStore + 'static,
    Q: QuoteDirectory + 'static,
{
    let worker_id = WorkerId(worker_id);
    if let Err(err) = calendar::validate_day_of_week(day_of_week) {
        return error_response(err);
    }

    let result = (|| -> Result<(), SchedulingError> {
        if api.store.worker(&worker_id)?.is_none() {
            return Err(SchedulingError::WorkerNotFound(worker_id.clone()));
        }
        let mut pattern = api
            .store
            .weekly_pattern(&worker_id, day_of_week)?
            .unwrap_or(WorkerWeeklyPattern {
                worker_id: worker_id.clone(),
                day_of_week,
                is_active: true,
                start_time: super::slots::DAY_START,
                end_time: super::slots::DAY_END,
            });
        if let Some(is_active) = update.is_active {
            pattern.is_active = is_active;
        }
        if let Some(start_time) = update.start_time {
            pattern.start_time = start_time;
        }
        if let Some(end_time) = update.end_time {
            pattern.end_time = end_time;
        }
        api.store.upsert_weekly_pattern(pattern)?;
        Ok(())
    })();

    match result {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkerOverrideBody {
    date: NaiveDate,
    is_available: bool,
    #[serde(default, with = "hhmm_opt")]
    start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm_opt")]
    end_time: Option<NaiveTime>,
    #[serde(default)]
    notes: Option<String>,
}

pub(crate) async fn worker_override_handler<S, Q>(
    State(api): State<Arc<SchedulingApi<S, Q>>>,
    Path(worker_id): Path<String>,
    Json(body): Json<WorkerOverrideBody>,
) -> Response
where
    S: SchedulingStore + 'static,
    Q: QuoteDirectory + 'static,
{
    let worker_id = WorkerId(worker_id);
    let result = (|| -> Result<(), SchedulingError> {
        if api.store.worker(&worker_id)?.is_none() {
            return Err(SchedulingError::WorkerNotFound(worker_id.clone()));
        }
        api.store.put_date_override(WorkerDateOverride {
            worker_id: worker_id.clone(),
            date: body.date,
            is_available: body.is_available,
            start_time: body.start_time,
            end_time: body.end_time,
            notes: body.notes,
            origin: OverrideOrigin::Manual,
        })?;
        Ok(())
    })();

    match result {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_worker_override_handler<S, Q>(
    State(api): State<Arc<SchedulingApi<S, Q>>>,
    Path((worker_id, date)): Path<(String, String)>,
) -> Response
where
    S: SchedulingStore + 'static,
    Q: QuoteDirectory + 'static,
{
    let worker_id = WorkerId(worker_id);
    let date = match parse_date(&date) {
        Ok(date) => date,
        Err(err) => return error_response(err),
    };
    match api.store.delete_date_override(&worker_id, date) {
        Ok(true) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no override for {worker_id} on {date}") })),
        )
            .into_response(),
        Err(err) => error_response(err.into()),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SelectBookingBody {
    quote_id: String,
    date: NaiveDate,
    slot: SlotKind,
    #[serde(default, with = "hhmm_opt")]
    exact_time: Option<NaiveTime>,
}

pub(crate) async fn select_booking_handler<S, Q>(
    State(api): State<Arc<SchedulingApi<S, Q>>>,
    Json(body): Json<SelectBookingBody>,
) -> Response
where
    S: SchedulingStore + 'static,
    Q: QuoteDirectory + 'static,
{
    let quote_id = QuoteId(body.quote_id);
    match api
        .assignment
        .assign_for_quote(&quote_id, body.date, body.slot, body.exact_time)
    {
        Ok(assignment) => (
            StatusCode::OK,
            Json(json!({
                "quote_id": quote_id,
                "date": body.date,
                "slot": body.slot,
                "assignment": assignment,
            })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn cancel_job_handler<S, Q>(
    State(api): State<Arc<SchedulingApi<S, Q>>>,
    Path(job_id): Path<String>,
) -> Response
where
    S: SchedulingStore + 'static,
    Q: QuoteDirectory + 'static,
{
    match api.assignment.cancel(&JobId(job_id)) {
        Ok(job) => (StatusCode::OK, Json(json!({ "job": job }))).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReassignBody {
    worker_id: String,
}

pub(crate) async fn reassign_job_handler<S, Q>(
    State(api): State<Arc<SchedulingApi<S, Q>>>,
    Path(job_id): Path<String>,
    Json(body): Json<ReassignBody>,
) -> Response
where
    S: SchedulingStore + 'static,
    Q: QuoteDirectory + 'static,
{
    match api
        .assignment
        .reassign(&JobId(job_id), &WorkerId(body.worker_id))
    {
        Ok(job) => (StatusCode::OK, Json(json!({ "job": job }))).into_response(),
        Err(err) => error_response(err),
    }
}

/// Default worker/admin range: today through 90 days out, matching the
/// longest date-picker window the UIs request.
fn parse_range(start: Option<&str>, end: Option<&str>) -> Result<DateRange, SchedulingError> {
    let start = match start {
        Some(raw) => parse_date(raw)?,
        None => Local::now().date_naive(),
    };
    let end = match end {
        Some(raw) => parse_date(raw)?,
        None => start + Duration::days(90),
    };
    Ok(DateRange::new(start, end))
}
