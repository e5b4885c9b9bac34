use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::mpsc;
use std::sync::Arc;
use tower::ServiceExt;

use crate::admissions::domain::{DepartmentRoster, UNALLOCATED};
use crate::admissions::report::MemoryReportWriter;
use crate::admissions::router::{
    admission_router, generate_merit_handler, get_handler, register_handler,
};
use crate::admissions::service::AdmissionService;
use crate::admissions::store::{ApplicantRepository, StoreError};

const PREFS: [&str; 4] = ["CSE", "IT", "TT", "APM"];

fn json_request(method: &str, uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(payload).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn generate_merit_route_returns_summary() {
    let (service, reports) = build_service(
        &[
            applicant(1000, 1, 50, ["CSE", "IT", "", ""]),
            applicant(1001, 2, 50, ["CSE", "IT", "", ""]),
            applicant(1002, 3, 50, ["CSE", "IT", "", ""]),
        ],
        roster(&[("CSE", 1), ("IT", 1)]),
    );

    let response = admission_router(service)
        .oneshot(
            Request::post("/api/generate-merit")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["success"], json!(true));
    assert_eq!(payload["summary"]["total"], json!(3));
    assert_eq!(payload["summary"]["allocated"], json!(2));
    assert_eq!(payload["summary"]["waiting"], json!(1));
    assert_eq!(payload["summary"]["seats"], json!({ "CSE": 1, "IT": 1 }));
    assert_eq!(payload["summary"]["report_written"], json!(true));
    assert!(reports.last().is_some());
}

#[tokio::test]
async fn generate_merit_handler_reports_empty_population() {
    let (service, reports) = build_service(&[], DepartmentRoster::standard());

    let response = generate_merit_handler::<_, MemoryReportWriter>(State(service)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["success"], json!(false));
    assert_eq!(payload["error"], json!("no applicants found"));
    assert_eq!(payload["summary"]["total"], json!(0));
    assert_eq!(
        payload["summary"]["seats"],
        json!({ "APM": 0, "CSE": 0, "IT": 0, "TT": 0 })
    );
    assert!(reports.last().is_none());
}

#[tokio::test]
async fn generate_merit_handler_returns_conflict_over_capacity() {
    let population = [applicant(1000, 1, 50, PREFS), applicant(1001, 2, 50, PREFS)];
    let repository = memory_repository(&population, DepartmentRoster::standard(), 1);
    let service = Arc::new(AdmissionService::new(
        repository,
        Arc::new(MemoryReportWriter::default()),
    ));

    let response = generate_merit_handler(State(service)).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn generate_merit_handler_returns_internal_error_on_storage_failure() {
    let repository = Arc::new(ApplicantRepository::new(
        FlakyBackend::failing(&[applicant(1000, 1, 50, PREFS)]),
        DepartmentRoster::standard(),
        10,
    ));
    let service = Arc::new(AdmissionService::new(
        repository,
        Arc::new(MemoryReportWriter::default()),
    ));

    let response = generate_merit_handler(State(service)).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .contains("disk full"));
}

#[tokio::test]
async fn register_route_creates_applicant() {
    let (service, _) = build_service(&[], DepartmentRoster::standard());
    let router = admission_router(service.clone());

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/register",
            &json!({
                "name": "Tanvir Alam",
                "password": "secret1",
                "category": "GEN",
                "pref": ["IT", "CSE", "TT", "APM"],
                "marks": 88,
                "jee_rank": 42
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["id"], json!(1000));
    assert_eq!(payload["student"]["department"], json!(UNALLOCATED));
    assert_eq!(payload["student"]["status"], json!("WAITING"));
    assert!(payload["student"].get("password").is_none());
    assert_eq!(service.list().expect("lists").len(), 1);
}

#[tokio::test]
async fn register_route_rejects_short_preference_list() {
    let (service, _) = build_service(&[], DepartmentRoster::standard());

    let response = admission_router(service.clone())
        .oneshot(json_request(
            "POST",
            "/api/register",
            &json!({
                "name": "Tanvir Alam",
                "password": "secret1",
                "category": "GEN",
                "pref": ["IT"],
                "marks": 88,
                "jee_rank": 42
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(service.list().expect("lists").is_empty());
}

#[tokio::test]
async fn update_route_replaces_preferences() {
    let (service, _) = build_service(&[applicant(1000, 1, 50, PREFS)], DepartmentRoster::standard());

    let response = admission_router(service)
        .oneshot(json_request(
            "PUT",
            "/api/applicants/1000",
            &json!({ "pref": ["TT", "APM", "IT", "CSE"] }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["student"]["pref"][0], json!("TT"));
}

#[tokio::test]
async fn get_handler_returns_not_found() {
    let (service, _) = build_service(&[applicant(1000, 1, 50, PREFS)], DepartmentRoster::standard());

    let response = get_handler(State(service), Path(4242)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload["id"], json!(4242));
}

#[tokio::test]
async fn merit_route_reports_position() {
    let (service, _) = build_service(
        &[applicant(1000, 9, 50, PREFS), applicant(1001, 2, 50, PREFS)],
        DepartmentRoster::standard(),
    );

    let response = admission_router(service)
        .oneshot(
            Request::get("/api/applicants/1000/merit")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["position"], json!(2));
    assert_eq!(payload["total"], json!(2));
}

#[tokio::test]
async fn waiting_for_the_writer_does_not_stall_the_runtime() {
    let (service, _) = build_service(&[], DepartmentRoster::standard());
    let (held_tx, held_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let holder = {
        let service = Arc::clone(&service);
        std::thread::spawn(move || {
            service
                .repository()
                .transaction(|_| {
                    held_tx.send(()).expect("signal held");
                    release_rx.recv().expect("release signal");
                    Ok::<_, StoreError>(())
                })
                .expect("holder transaction");
        })
    };
    held_rx.recv().expect("writer held");

    let pending = tokio::spawn(register_handler(
        State(service.clone()),
        axum::Json(registration("Queued Applicant", 3)),
    ));
    // This test runs on a single-threaded runtime; the queued registration must leave it free.
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(!pending.is_finished());

    release_tx.send(()).expect("release writer");
    let response = pending.await.expect("handler task");
    assert_eq!(response.status(), StatusCode::CREATED);
    holder.join().expect("holder finished");
}
