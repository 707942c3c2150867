// src/server.rs
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::auth::{self, AuthContext, AuthService, Role};
use crate::dates::{parse_iso_date, DateParseError};
use crate::holidays::{HolidayCalendar, HolidayRecord};
use crate::logs::{validate_hours, DailyLogEntry, LogEntryError, LogStatus};
use crate::overlay::{self, BulkValidationOutcome, OverlayError};
use crate::progress::{compute_progress, ProgressSnapshot};
use crate::reports::logs_to_csv;
use crate::schedule::{ScheduleConfig, ScheduleConfigError};
use crate::store::{StoreError, TrackerStore, UserAccount, UserId};
use crate::workdays::is_working_day;

// --- Application State ---

#[derive(Clone)]
pub struct AppState {
    pub store: TrackerStore,
    pub auth: AuthService,
    pub calendar: Arc<HolidayCalendar>,
}

/// The service clock. Kept in one place so every handler agrees on what
/// "today" means.
fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// --- Error Handling ---

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("supervisor role required")]
    Forbidden,
    #[error(transparent)]
    BadDate(#[from] DateParseError),
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    InvalidSchedule(#[from] ScheduleConfigError),
    #[error(transparent)]
    InvalidLogEntry(#[from] LogEntryError),
    #[error("{date} is not a working day under the current schedule; a supervisor can mark it as a special workday")]
    NotWorkingDay { date: NaiveDate },
    #[error("{date} is before the schedule start date {start_date}")]
    BeforeStartDate {
        date: NaiveDate,
        start_date: NaiveDate,
    },
    #[error("no log entry for {date}")]
    LogNotFound { date: NaiveDate },
    #[error("no such user: {user_id}")]
    UnknownUser { user_id: String },
    #[error(transparent)]
    Conflict(#[from] StoreError),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<OverlayError> for ApiError {
    fn from(err: OverlayError) -> Self {
        match err {
            OverlayError::EntryNotFound { date, .. } => ApiError::LogNotFound { date },
            OverlayError::InvalidHours(e) => ApiError::InvalidLogEntry(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthorized | ApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            ApiError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::BadDate(_) | ApiError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::InvalidSchedule(_)
            | ApiError::InvalidLogEntry(_)
            | ApiError::NotWorkingDay { .. }
            | ApiError::BeforeStartDate { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            ApiError::LogNotFound { .. } | ApiError::UnknownUser { .. } => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::Internal(err) => {
                error!("Internal error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        if status.is_client_error() {
            warn!("Request rejected ({}): {}", status.as_u16(), message);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

// --- Auth Middleware ---

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or(ApiError::Unauthorized)?;
    let ctx = state.auth.verify(token).ok_or(ApiError::Unauthorized)?;
    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

fn require_supervisor(ctx: &AuthContext) -> Result<(), ApiError> {
    if ctx.role != Role::Supervisor {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

fn resolve_user(state: &AppState, user_id: &str) -> Result<UserAccount, ApiError> {
    state.store.get_user(user_id).ok_or_else(|| ApiError::UnknownUser {
        user_id: user_id.to_string(),
    })
}

// --- Request / Response Bodies ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<UserAccount> for UserProfile {
    fn from(account: UserAccount) -> Self {
        UserProfile {
            id: account.id,
            name: account.name,
            email: account.email,
            role: account.role,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    name: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    token: String,
    expires_at: DateTime<Utc>,
    user: UserProfile,
}

#[derive(Debug, Deserialize)]
struct LogRangeQuery {
    from: Option<String>,
    to: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertLogRequest {
    hours_worked: Option<Decimal>,
    tasks: Option<String>,
    status: Option<LogStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressQuery {
    as_of: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HolidayQuery {
    year: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HolidayYearResponse {
    year: i32,
    covered: bool,
    holidays: Vec<HolidayRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateRequest {
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvalidateRequest {
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpecialWorkdayRequest {
    reason: String,
    hours_worked: Option<Decimal>,
    tasks: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchValidationRequest {
    entries: Vec<BatchValidationItem>,
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchValidationItem {
    user_id: UserId,
    date: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchValidationResponse {
    validated: usize,
    failed: usize,
    outcomes: Vec<BulkValidationOutcome>,
}

// --- Auth Handlers ---

async fn handle_register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }
    let email = body.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(ApiError::BadRequest(format!(
            "'{}' is not a valid email address",
            email
        )));
    }
    if body.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let salt = auth::generate_salt();
    let account = UserAccount {
        id: auth::generate_id("usr"),
        name,
        email,
        role: Role::Trainee,
        password_hash: auth::hash_password(&body.password, &salt),
        salt,
        created_at: Utc::now(),
    };
    state.store.insert_user(account.clone())?;
    info!("Registered trainee {} ({})", account.id, account.email);

    let (token, expires_at) = state.auth.issue_token(&account.id, account.role);
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            token,
            expires_at,
            user: account.into(),
        }),
    ))
}

async fn handle_login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let account = state
        .store
        .find_user_by_email(body.email.trim())
        .ok_or(ApiError::InvalidCredentials)?;
    if !auth::verify_password(&body.password, &account.salt, &account.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }
    let (token, expires_at) = state.auth.issue_token(&account.id, account.role);
    info!("Login: {} ({:?})", account.id, account.role);
    Ok(Json(SessionResponse {
        token,
        expires_at,
        user: account.into(),
    }))
}

async fn handle_logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = bearer_token(&headers).ok_or(ApiError::Unauthorized)?;
    state.auth.revoke(token);
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_me(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<UserProfile>, ApiError> {
    // A session can outlive its account only if the snapshot was swapped
    // out from under the service; treat it as not signed in.
    let account = state.store.get_user(&ctx.user_id).ok_or(ApiError::Unauthorized)?;
    Ok(Json(account.into()))
}

// --- Schedule Handlers ---

async fn handle_get_schedule(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<ScheduleConfig>, ApiError> {
    Ok(Json(state.store.get_or_create_schedule(&ctx.user_id, today())))
}

async fn handle_put_schedule(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(config): Json<ScheduleConfig>,
) -> Result<Json<ScheduleConfig>, ApiError> {
    config.validate()?;
    state.store.put_schedule(&ctx.user_id, config.clone());
    info!("Schedule updated for {}", ctx.user_id);
    Ok(Json(config))
}

async fn handle_trainee_get_schedule(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(user_id): Path<String>,
) -> Result<Json<ScheduleConfig>, ApiError> {
    require_supervisor(&ctx)?;
    resolve_user(&state, &user_id)?;
    Ok(Json(state.store.get_or_create_schedule(&user_id, today())))
}

async fn handle_trainee_put_schedule(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(user_id): Path<String>,
    Json(config): Json<ScheduleConfig>,
) -> Result<Json<ScheduleConfig>, ApiError> {
    require_supervisor(&ctx)?;
    resolve_user(&state, &user_id)?;
    config.validate()?;
    state.store.put_schedule(&user_id, config.clone());
    info!("Schedule updated for {} by {}", user_id, ctx.user_id);
    Ok(Json(config))
}

// --- Log Handlers ---

fn parse_range(query: &LogRangeQuery) -> Result<(Option<NaiveDate>, Option<NaiveDate>), ApiError> {
    let from = query.from.as_deref().map(parse_iso_date).transpose()?;
    let to = query.to.as_deref().map(parse_iso_date).transpose()?;
    Ok((from, to))
}

async fn handle_list_logs(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<LogRangeQuery>,
) -> Result<Json<Vec<DailyLogEntry>>, ApiError> {
    let (from, to) = parse_range(&query)?;
    Ok(Json(state.store.logs_in_range(&ctx.user_id, from, to)))
}

fn upsert_log_for(
    state: &AppState,
    user_id: &str,
    date: NaiveDate,
    body: UpsertLogRequest,
) -> Result<DailyLogEntry, ApiError> {
    let config = state.store.get_or_create_schedule(user_id, today());
    if date < config.start_date {
        return Err(ApiError::BeforeStartDate {
            date,
            start_date: config.start_date,
        });
    }

    let existing = state.store.get_log(user_id, date);
    let is_special = existing
        .as_ref()
        .map_or(false, |entry| entry.is_special_workday);
    if !is_special
        && !is_working_day(date, &config.work_days, config.exclude_holidays, &state.calendar)
    {
        return Err(ApiError::NotWorkingDay { date });
    }

    let hours = body
        .hours_worked
        .unwrap_or_else(|| Decimal::from(config.hours_per_day));
    validate_hours(hours)?;

    let mut entry = existing
        .unwrap_or_else(|| DailyLogEntry::new(date, hours, LogStatus::Completed));
    entry.hours_worked = hours;
    entry.status = body.status.unwrap_or(LogStatus::Completed);
    entry.tasks = body.tasks;
    // The previously validated content no longer exists, so the stamp goes.
    entry.clear_validation();

    Ok(state.store.upsert_log(user_id, entry))
}

async fn handle_upsert_log(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(date): Path<String>,
    Json(body): Json<UpsertLogRequest>,
) -> Result<Json<DailyLogEntry>, ApiError> {
    let date = parse_iso_date(&date)?;
    let entry = upsert_log_for(&state, &ctx.user_id, date, body)?;
    Ok(Json(entry))
}

async fn handle_delete_log(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(date): Path<String>,
) -> Result<StatusCode, ApiError> {
    let date = parse_iso_date(&date)?;
    state
        .store
        .delete_log(&ctx.user_id, date)
        .ok_or(ApiError::LogNotFound { date })?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Progress Handlers ---

fn progress_for(state: &AppState, user_id: &str, as_of: NaiveDate) -> ProgressSnapshot {
    let config = state.store.get_or_create_schedule(user_id, today());
    let entries = state.store.logs_in_range(user_id, None, None);
    compute_progress(&config, &entries, &state.calendar, as_of)
}

async fn handle_get_progress(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ProgressQuery>,
) -> Result<Json<ProgressSnapshot>, ApiError> {
    let as_of = match query.as_of.as_deref() {
        Some(raw) => parse_iso_date(raw)?,
        None => today(),
    };
    Ok(Json(progress_for(&state, &ctx.user_id, as_of)))
}

// --- Holiday Handler ---

async fn handle_list_holidays(
    State(state): State<AppState>,
    Query(query): Query<HolidayQuery>,
) -> Result<Json<HolidayYearResponse>, ApiError> {
    let year = query.year.unwrap_or_else(|| today().year());
    let start = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| ApiError::BadRequest(format!("year {} is out of range", year)))?;
    let end = NaiveDate::from_ymd_opt(year, 12, 31)
        .ok_or_else(|| ApiError::BadRequest(format!("year {} is out of range", year)))?;
    let holidays = state
        .calendar
        .in_range(start, end)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(HolidayYearResponse {
        year,
        covered: state.calendar.covers_year(year),
        holidays,
    }))
}

// --- Report Handlers ---

type CsvResponse = ([(HeaderName, String); 2], Vec<u8>);

fn csv_response_for(
    state: &AppState,
    user_id: &str,
    query: &LogRangeQuery,
) -> Result<CsvResponse, ApiError> {
    let (from, to) = parse_range(query)?;
    let entries = state.store.logs_in_range(user_id, from, to);
    let bytes = logs_to_csv(&entries)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"work-logs-{}.csv\"", user_id),
            ),
        ],
        bytes,
    ))
}

async fn handle_export_csv(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<LogRangeQuery>,
) -> Result<CsvResponse, ApiError> {
    csv_response_for(&state, &ctx.user_id, &query)
}

// --- Supervisor Handlers ---

async fn handle_list_trainees(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    require_supervisor(&ctx)?;
    let trainees = state
        .store
        .list_users_with_role(Role::Trainee)
        .into_iter()
        .map(UserProfile::from)
        .collect();
    Ok(Json(trainees))
}

async fn handle_trainee_logs(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(user_id): Path<String>,
    Query(query): Query<LogRangeQuery>,
) -> Result<Json<Vec<DailyLogEntry>>, ApiError> {
    require_supervisor(&ctx)?;
    resolve_user(&state, &user_id)?;
    let (from, to) = parse_range(&query)?;
    Ok(Json(state.store.logs_in_range(&user_id, from, to)))
}

async fn handle_trainee_progress(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(user_id): Path<String>,
    Query(query): Query<ProgressQuery>,
) -> Result<Json<ProgressSnapshot>, ApiError> {
    require_supervisor(&ctx)?;
    resolve_user(&state, &user_id)?;
    let as_of = match query.as_of.as_deref() {
        Some(raw) => parse_iso_date(raw)?,
        None => today(),
    };
    Ok(Json(progress_for(&state, &user_id, as_of)))
}

async fn handle_trainee_csv(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(user_id): Path<String>,
    Query(query): Query<LogRangeQuery>,
) -> Result<CsvResponse, ApiError> {
    require_supervisor(&ctx)?;
    resolve_user(&state, &user_id)?;
    csv_response_for(&state, &user_id, &query)
}

async fn handle_validate_log(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path((user_id, date)): Path<(String, String)>,
    Json(body): Json<ValidateRequest>,
) -> Result<Json<DailyLogEntry>, ApiError> {
    require_supervisor(&ctx)?;
    resolve_user(&state, &user_id)?;
    let date = parse_iso_date(&date)?;
    let entry = overlay::validate_entry(
        &state.store,
        &user_id,
        date,
        &ctx.user_id,
        body.notes,
        Utc::now(),
    )?;
    Ok(Json(entry))
}

async fn handle_invalidate_log(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path((user_id, date)): Path<(String, String)>,
    Json(body): Json<InvalidateRequest>,
) -> Result<Json<DailyLogEntry>, ApiError> {
    require_supervisor(&ctx)?;
    resolve_user(&state, &user_id)?;
    let date = parse_iso_date(&date)?;
    let entry =
        overlay::invalidate_entry(&state.store, &user_id, date, &ctx.user_id, body.reason)?;
    Ok(Json(entry))
}

async fn handle_mark_special_workday(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path((user_id, date)): Path<(String, String)>,
    Json(body): Json<SpecialWorkdayRequest>,
) -> Result<Json<DailyLogEntry>, ApiError> {
    require_supervisor(&ctx)?;
    resolve_user(&state, &user_id)?;
    let date = parse_iso_date(&date)?;
    let reason = body.reason.trim().to_string();
    if reason.is_empty() {
        return Err(ApiError::BadRequest(
            "a special workday needs a reason".to_string(),
        ));
    }
    let config = state.store.get_or_create_schedule(&user_id, today());
    let entry = overlay::mark_special_workday(
        &state.store,
        &user_id,
        date,
        reason,
        body.hours_worked,
        body.tasks,
        Decimal::from(config.hours_per_day),
    )?;
    Ok(Json(entry))
}

async fn handle_remove_special_workday(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path((user_id, date)): Path<(String, String)>,
) -> Result<Json<DailyLogEntry>, ApiError> {
    require_supervisor(&ctx)?;
    resolve_user(&state, &user_id)?;
    let date = parse_iso_date(&date)?;
    let entry = overlay::remove_special_workday(&state.store, &user_id, date)?;
    Ok(Json(entry))
}

async fn handle_validate_batch(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(body): Json<BatchValidationRequest>,
) -> Result<Json<BatchValidationResponse>, ApiError> {
    require_supervisor(&ctx)?;
    let mut items = Vec::with_capacity(body.entries.len());
    for item in &body.entries {
        items.push((item.user_id.clone(), parse_iso_date(&item.date)?));
    }
    let outcomes = overlay::bulk_validate(&state.store, &items, &ctx.user_id, body.notes, Utc::now());
    let validated = outcomes.iter().filter(|o| o.validated).count();
    Ok(Json(BatchValidationResponse {
        validated,
        failed: outcomes.len() - validated,
        outcomes,
    }))
}

// --- Health ---

async fn handle_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "users": state.store.user_count(),
        "activeSessions": state.auth.active_sessions(),
        "holidayTableEntries": state.calendar.len(),
    }))
}

// --- Router ---

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/me", get(handle_me))
        .route("/schedule", get(handle_get_schedule).put(handle_put_schedule))
        .route("/logs", get(handle_list_logs))
        .route("/logs/{date}", put(handle_upsert_log).delete(handle_delete_log))
        .route("/progress", get(handle_get_progress))
        .route("/holidays", get(handle_list_holidays))
        .route("/reports/logs.csv", get(handle_export_csv))
        .route("/trainees", get(handle_list_trainees))
        .route(
            "/trainees/{id}/schedule",
            get(handle_trainee_get_schedule).put(handle_trainee_put_schedule),
        )
        .route("/trainees/{id}/logs", get(handle_trainee_logs))
        .route("/trainees/{id}/progress", get(handle_trainee_progress))
        .route("/trainees/{id}/reports/logs.csv", get(handle_trainee_csv))
        .route(
            "/trainees/{id}/logs/{date}/validate",
            post(handle_validate_log),
        )
        .route(
            "/trainees/{id}/logs/{date}/invalidate",
            post(handle_invalidate_log),
        )
        .route(
            "/trainees/{id}/special-workdays/{date}",
            put(handle_mark_special_workday).delete(handle_remove_special_workday),
        )
        .route("/validate-batch", post(handle_validate_batch));

    let protected = Router::new()
        .nest("/api", api)
        .route("/auth/logout", post(handle_logout))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(handle_health))
        .route("/auth/register", post(handle_register))
        .route("/auth/login", post(handle_login))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
