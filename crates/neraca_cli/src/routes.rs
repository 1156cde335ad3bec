use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use neraca_ir::{Account, FinancialReport, Journal, JournalAccount, Period};
use neraca_plugins::finance::{ClosingResult, Ledger, close_books, create_journal, general_ledger};
use neraca_runtime::auth::SharedSecret;
use neraca_runtime::dashboard::{DashboardEngine, DashboardSummary};
use neraca_runtime::datastore::DataStore;
use neraca_runtime::errors::RuntimeError;
use neraca_runtime::{queries, report};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::security::security_headers;

#[derive(Clone)]
pub struct AppState {
    pub datastore: Arc<dyn DataStore>,
    pub secret: Arc<SharedSecret>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// HTTP face of a [`RuntimeError`]. Server-side failures are logged and
/// answered with `fallback` instead of the internal message.
#[derive(Debug)]
pub struct ApiError {
    error: RuntimeError,
    fallback: &'static str,
}

impl ApiError {
    fn with_fallback(error: RuntimeError, fallback: &'static str) -> Self {
        Self { error, fallback }
    }
}

impl From<RuntimeError> for ApiError {
    fn from(error: RuntimeError) -> Self {
        Self::with_fallback(error, "Server Error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.error {
            RuntimeError::ValidationError(_) => StatusCode::BAD_REQUEST,
            RuntimeError::NotFound(_) => StatusCode::NOT_FOUND,
            RuntimeError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            RuntimeError::DataStoreError(_) | RuntimeError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = if self.error.is_server_error() {
            tracing::error!(error = %self.error, "request failed");
            self.fallback.to_string()
        } else {
            self.error.message().to_string()
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub period: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosingRequest {
    pub period_code: Option<String>,
    pub previous_period_code: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/accounts/{category}", get(accounts_by_category))
        .route("/api/periods", get(list_periods))
        .route("/api/reports/{report_id}", get(get_report))
        .route("/api/journal", get(list_journals).post(post_journal))
        .route("/api/journal-accounts", get(list_journal_accounts))
        .route("/api/ledger/{account_id}", get(get_ledger))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/closing", post(post_closing))
        .with_state(state)
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}

async fn accounts_by_category(State(state): State<AppState>, Path(category): Path<String>) -> ApiResult<Vec<Account>> {
    let accounts = queries::accounts_by_category(state.datastore.as_ref(), &category).await?;
    Ok(Json(accounts))
}

async fn list_periods(State(state): State<AppState>) -> ApiResult<Vec<Period>> {
    let periods = queries::list_periods(state.datastore.as_ref()).await?;
    Ok(Json(periods))
}

async fn get_report(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<FinancialReport> {
    let report = report::assemble_report(state.datastore.as_ref(), &report_id, query.period.as_deref()).await?;
    Ok(Json(report))
}

async fn list_journals(State(state): State<AppState>, Query(range): Query<DateRangeQuery>) -> ApiResult<Vec<Journal>> {
    let journals = queries::list_journals(
        state.datastore.as_ref(),
        range.start_date.as_deref(),
        range.end_date.as_deref(),
    )
    .await
    .map_err(|e| ApiError::with_fallback(e, "Failed to fetch journals"))?;
    Ok(Json(journals))
}

async fn post_journal(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(payload) =
        payload.map_err(|_| ApiError::from(RuntimeError::ValidationError("Invalid journal payload".to_string())))?;

    let id = create_journal(state.datastore.as_ref(), &state.secret, &payload, chrono::Utc::now())
        .await
        .map_err(|e| ApiError::with_fallback(e, "Failed to create journal"))?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn list_journal_accounts(State(state): State<AppState>) -> ApiResult<Vec<JournalAccount>> {
    let accounts = queries::list_journal_accounts(state.datastore.as_ref()).await?;
    Ok(Json(accounts))
}

async fn get_ledger(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Query(range): Query<DateRangeQuery>,
) -> ApiResult<Ledger> {
    let ledger = general_ledger(
        state.datastore.as_ref(),
        &account_id,
        range.start_date.as_deref(),
        range.end_date.as_deref(),
    )
    .await?;
    Ok(Json(ledger))
}

async fn get_dashboard(State(state): State<AppState>, Query(query): Query<PeriodQuery>) -> ApiResult<DashboardSummary> {
    let summary = DashboardEngine::new()
        .evaluate(state.datastore.as_ref(), query.period.as_deref())
        .await?;
    Ok(Json(summary))
}

async fn post_closing(
    State(state): State<AppState>,
    payload: Result<Json<ClosingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ClosingResult>), ApiError> {
    let request = payload.ok().map(|Json(r)| r);
    let period_code = request
        .as_ref()
        .and_then(|r| r.period_code.as_deref())
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| RuntimeError::ValidationError("periodCode wajib diisi".to_string()))?;
    let previous = request.as_ref().and_then(|r| r.previous_period_code.as_deref());

    let result = close_books(state.datastore.as_ref(), period_code, previous).await;
    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(result)))
}
