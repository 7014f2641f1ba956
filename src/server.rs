//! HTTP server exposing the analysis and report operations.
//!
//! Every handler validates its query, hands the work to the blocking pool
//! and maps the engine's typed errors onto status codes:
//! validation failures are 400, source failures 502 and export failures 500.
//!
//! # Architecture
//!
//! ```text
//! client ──→ GET /analysis/* ──┐
//!        ──→ /report/*       ──┼──→ AnalyticsService ──→ EventSource
//!                              │            ↓
//!                              └──── JSON / CSV response
//! ```

use crate::error::ReportError;
use crate::report::{ExportFormat, PatientInfo, ReportRequest};
use crate::service::AnalyticsService;
use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequestParts, Query, State,
    },
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
}

impl ServerConfig {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

/// Shared server state
pub struct ServerState {
    service: AnalyticsService,
}

impl ServerState {
    pub fn new(service: AnalyticsService) -> Self {
        Self { service }
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, message: String) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            code: code.to_string(),
            message,
        }),
    )
}

impl From<ReportError> for ErrorResponse {
    fn from(err: ReportError) -> Self {
        let code = match &err {
            ReportError::Validation(_) => "VALIDATION_ERROR",
            ReportError::Source(_) => "SOURCE_ERROR",
            ReportError::Export(_) => "EXPORT_ERROR",
        };
        Self {
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

fn bad_request(message: String) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
}

fn map_error(err: ReportError) -> ApiError {
    let status = match &err {
        ReportError::Validation(_) => StatusCode::BAD_REQUEST,
        ReportError::Source(e) => {
            tracing::error!("Event source failed: {}", e);
            StatusCode::BAD_GATEWAY
        }
        ReportError::Export(e) => {
            tracing::error!("Export failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(err.into()))
}

/// Run a service call on the blocking pool and map its error.
async fn run_blocking<T, F>(state: Arc<ServerState>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&AnalyticsService) -> Result<T, ReportError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&state.service))
        .await
        .map_err(|e| {
            tracing::error!("Analysis task failed: {}", e);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "TASK_ERROR",
                format!("Analysis task failed: {}", e),
            )
        })?
        .map_err(map_error)
}

/// Query string extractor whose parse failures use the JSON error body.
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: QueryRejection| bad_request(rejection.body_text()))?;
        Ok(Self(value))
    }
}

fn default_owner() -> String {
    "default".to_string()
}

fn default_days() -> i64 {
    7
}

fn default_trend_days() -> i64 {
    30
}

fn default_doctor_days() -> i64 {
    7
}

#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    #[serde(default = "default_owner")]
    pub owner: String,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct WeeklyQuery {
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default)]
    pub week_offset: u32,
}

#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default = "default_days")]
    pub days: i64,
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default = "default_trend_days")]
    pub days: i64,
}

#[derive(Debug, Deserialize)]
pub struct DoctorQuery {
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default = "default_doctor_days")]
    pub days: i64,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    #[serde(default = "default_owner")]
    pub owner: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportBody {
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(flatten)]
    pub request: ReportRequest,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default = "default_owner")]
    pub owner: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub device_id: Option<String>,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /analysis/daily
async fn daily(
    State(state): State<Arc<ServerState>>,
    ApiQuery(q): ApiQuery<DailyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = run_blocking(state, move |svc| svc.daily(&q.owner, q.date)).await?;
    Ok(Json(stats))
}

/// GET /analysis/weekly
async fn weekly(
    State(state): State<Arc<ServerState>>,
    ApiQuery(q): ApiQuery<WeeklyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let trend = run_blocking(state, move |svc| svc.weekly(&q.owner, q.week_offset)).await?;
    Ok(Json(trend))
}

/// GET /analysis/severity-distribution
async fn severity_distribution(
    State(state): State<Arc<ServerState>>,
    ApiQuery(q): ApiQuery<DaysQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let dist = run_blocking(state, move |svc| {
        svc.severity_distribution(&q.owner, q.days)
    })
    .await?;
    Ok(Json(dist))
}

/// GET /analysis/hourly-distribution
async fn hourly_distribution(
    State(state): State<Arc<ServerState>>,
    ApiQuery(q): ApiQuery<DaysQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let dist = run_blocking(state, move |svc| svc.hourly_distribution(&q.owner, q.days)).await?;
    Ok(Json(dist))
}

/// GET /analysis/summary
async fn summary(
    State(state): State<Arc<ServerState>>,
    ApiQuery(q): ApiQuery<DaysQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = run_blocking(state, move |svc| svc.summary(&q.owner, q.days)).await?;
    Ok(Json(summary))
}

/// GET /analysis/trend
async fn trend(
    State(state): State<Arc<ServerState>>,
    ApiQuery(q): ApiQuery<TrendQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let series = run_blocking(state, move |svc| svc.trend(&q.owner, q.days)).await?;
    Ok(Json(series))
}

/// POST /report/generate
async fn generate_report(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<ReportBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body.map_err(|rejection| bad_request(rejection.body_text()))?;
    let report = run_blocking(state, move |svc| {
        svc.generate_report(&body.owner, &body.request)
    })
    .await?;
    Ok(Json(report))
}

async fn export(
    state: Arc<ServerState>,
    q: ExportQuery,
    format: ExportFormat,
) -> Result<Response, ApiError> {
    let file = run_blocking(state, move |svc| {
        let request = ReportRequest::custom(q.start_date, q.end_date);
        svc.export(&q.owner, &request, q.device_id.as_deref(), format)
    })
    .await?;

    let disposition = HeaderValue::from_str(&file.content_disposition()).map_err(|e| {
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "EXPORT_ERROR",
            format!("Invalid export filename: {}", e),
        )
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(file.content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.body,
    )
        .into_response())
}

/// GET /report/export/csv
async fn export_csv(
    State(state): State<Arc<ServerState>>,
    ApiQuery(q): ApiQuery<ExportQuery>,
) -> Result<Response, ApiError> {
    export(state, q, ExportFormat::Csv).await
}

/// GET /report/export/json
async fn export_json(
    State(state): State<Arc<ServerState>>,
    ApiQuery(q): ApiQuery<ExportQuery>,
) -> Result<Response, ApiError> {
    export(state, q, ExportFormat::Json).await
}

/// GET /report/summary/doctor
async fn doctor_summary(
    State(state): State<Arc<ServerState>>,
    ApiQuery(q): ApiQuery<DoctorQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = run_blocking(state, move |svc| {
        let patient = PatientInfo {
            owner_id: q.owner.clone(),
            display_name: q.display_name,
        };
        svc.doctor_summary(&q.owner, patient, q.days)
    })
    .await?;
    Ok(Json(summary))
}

/// GET /report/quick-stats
async fn quick_stats(
    State(state): State<Arc<ServerState>>,
    ApiQuery(q): ApiQuery<OwnerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = run_blocking(state, move |svc| svc.quick_stats(&q.owner)).await?;
    Ok(Json(stats))
}

/// Build the router over a service.
pub fn router(service: AnalyticsService) -> Router {
    let state = Arc::new(ServerState::new(service));

    Router::new()
        .route("/health", get(health))
        .route("/analysis/daily", get(daily))
        .route("/analysis/weekly", get(weekly))
        .route("/analysis/severity-distribution", get(severity_distribution))
        .route("/analysis/hourly-distribution", get(hourly_distribution))
        .route("/analysis/summary", get(summary))
        .route("/analysis/trend", get(trend))
        .route("/report/generate", post(generate_report))
        .route("/report/export/csv", get(export_csv))
        .route("/report/export/json", get(export_json))
        .route("/report/summary/doctor", get(doctor_summary))
        .route("/report/quick-stats", get(quick_stats))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
    service: AnalyticsService,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(service);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Tremor analytics server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
