use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tracing::error;

use super::domain::ApplicantId;
use super::intake::{ApplicantUpdate, Registration};
use super::report::ReportWriter;
use super::service::{AdmissionService, AllocationError, AllocationSummary, ApplicantServiceError};
use super::store::{StorageBackend, StoreError};
use crate::error::store_status;

/// Router builder exposing applicant records and the allocation trigger.
pub fn admission_router<B, W>(service: Arc<AdmissionService<B, W>>) -> Router
where
    B: StorageBackend + 'static,
    W: ReportWriter + 'static,
{
    Router::new()
        .route("/api/applicants", get(list_handler::<B, W>))
        .route(
            "/api/applicants/:id",
            get(get_handler::<B, W>).put(update_handler::<B, W>),
        )
        .route("/api/applicants/:id/merit", get(merit_handler::<B, W>))
        .route("/api/register", post(register_handler::<B, W>))
        .route("/api/generate-merit", post(generate_merit_handler::<B, W>))
        .with_state(service)
}

/// Runs a store-touching service call on the blocking pool; file I/O, fsync, and the
/// writer locks must not stall the async workers.
pub(crate) async fn run_blocking<B, W, T, F>(
    service: Arc<AdmissionService<B, W>>,
    job: F,
) -> Result<T, Response>
where
    B: StorageBackend + 'static,
    W: ReportWriter + 'static,
    T: Send + 'static,
    F: FnOnce(&AdmissionService<B, W>) -> T + Send + 'static,
{
    tokio::task::spawn_blocking(move || job(&service))
        .await
        .map_err(|err| {
            error!(error = %err, "admission task did not complete");
            let payload = json!({ "error": "admission task did not complete" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        })
}

pub(crate) async fn generate_merit_handler<B, W>(
    State(service): State<Arc<AdmissionService<B, W>>>,
) -> Response
where
    B: StorageBackend + 'static,
    W: ReportWriter + 'static,
{
    let outcome = match run_blocking(service.clone(), |service| service.run_allocation()).await {
        Ok(outcome) => outcome,
        Err(response) => return response,
    };

    match outcome {
        Ok(summary) => {
            let payload = json!({
                "success": true,
                "message": "Merit list generated",
                "summary": summary,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(AllocationError::EmptyPopulation) => {
            let codes = service
                .repository()
                .roster()
                .departments()
                .iter()
                .map(|department| department.code.clone());
            let payload = json!({
                "success": false,
                "error": AllocationError::EmptyPopulation.to_string(),
                "summary": AllocationSummary::empty(codes),
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Err(AllocationError::Store(error)) => store_error_response(&error),
    }
}

pub(crate) async fn register_handler<B, W>(
    State(service): State<Arc<AdmissionService<B, W>>>,
    axum::Json(registration): axum::Json<Registration>,
) -> Response
where
    B: StorageBackend + 'static,
    W: ReportWriter + 'static,
{
    match run_blocking(service, move |service| service.register(registration)).await {
        Ok(Ok(view)) => {
            let payload = json!({
                "success": true,
                "id": view.id,
                "student": view,
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Ok(Err(error)) => applicant_error_response(error),
        Err(response) => response,
    }
}

pub(crate) async fn update_handler<B, W>(
    State(service): State<Arc<AdmissionService<B, W>>>,
    Path(id): Path<u32>,
    axum::Json(update): axum::Json<ApplicantUpdate>,
) -> Response
where
    B: StorageBackend + 'static,
    W: ReportWriter + 'static,
{
    match run_blocking(service, move |service| service.update(ApplicantId(id), update)).await {
        Ok(Ok(view)) => {
            let payload = json!({ "success": true, "student": view });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(Err(error)) => applicant_error_response(error),
        Err(response) => response,
    }
}

pub(crate) async fn list_handler<B, W>(
    State(service): State<Arc<AdmissionService<B, W>>>,
) -> Response
where
    B: StorageBackend + 'static,
    W: ReportWriter + 'static,
{
    match run_blocking(service, |service| service.list()).await {
        Ok(Ok(views)) => (StatusCode::OK, axum::Json(views)).into_response(),
        Ok(Err(error)) => applicant_error_response(error),
        Err(response) => response,
    }
}

pub(crate) async fn get_handler<B, W>(
    State(service): State<Arc<AdmissionService<B, W>>>,
    Path(id): Path<u32>,
) -> Response
where
    B: StorageBackend + 'static,
    W: ReportWriter + 'static,
{
    match run_blocking(service, move |service| service.get(ApplicantId(id))).await {
        Ok(Ok(view)) => (StatusCode::OK, axum::Json(view)).into_response(),
        Ok(Err(error)) => applicant_error_response(error),
        Err(response) => response,
    }
}

pub(crate) async fn merit_handler<B, W>(
    State(service): State<Arc<AdmissionService<B, W>>>,
    Path(id): Path<u32>,
) -> Response
where
    B: StorageBackend + 'static,
    W: ReportWriter + 'static,
{
    match run_blocking(service, move |service| service.merit_position(ApplicantId(id))).await {
        Ok(Ok(position)) => (StatusCode::OK, axum::Json(position)).into_response(),
        Ok(Err(error)) => applicant_error_response(error),
        Err(response) => response,
    }
}

fn applicant_error_response(error: ApplicantServiceError) -> Response {
    match error {
        ApplicantServiceError::Invalid(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        ApplicantServiceError::NotFound(id) => {
            let payload = json!({ "error": "applicant not found", "id": id });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        ApplicantServiceError::Store(error) => store_error_response(&error),
    }
}

fn store_error_response(error: &StoreError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (store_status(error), axum::Json(payload)).into_response()
}
