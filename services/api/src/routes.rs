use crate::infra::AppState;
use admission::admissions::{admission_router, AdmissionService, MeritReport, ReportWriter, StorageBackend};
use admission::error::AppError;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub(crate) struct MeritListResponse {
    pub(crate) generated_at: DateTime<Utc>,
    pub(crate) total: usize,
    pub(crate) selected: usize,
    #[serde(flatten)]
    pub(crate) report: MeritReport,
}

pub(crate) fn with_admission_routes<B, W>(service: Arc<AdmissionService<B, W>>) -> axum::Router
where
    B: StorageBackend + 'static,
    W: ReportWriter + 'static,
{
    let merit_list = axum::Router::new()
        .route(
            "/api/merit-list",
            axum::routing::get(merit_list_endpoint::<B, W>),
        )
        .with_state(service.clone());

    admission_router(service)
        .merge(merit_list)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Merit order of the stored population as it stands, without running an allocation.
pub(crate) async fn merit_list_endpoint<B, W>(
    State(service): State<Arc<AdmissionService<B, W>>>,
) -> Result<Json<MeritListResponse>, AppError>
where
    B: StorageBackend + 'static,
    W: ReportWriter + 'static,
{
    let report = tokio::task::spawn_blocking(move || service.merit_list())
        .await
        .map_err(axum::Error::new)??;
    Ok(Json(MeritListResponse {
        generated_at: Utc::now(),
        total: report.lines.len(),
        selected: report.selected(),
        report,
    }))
}
