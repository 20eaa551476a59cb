use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::hiring::hiring_router;

fn router() -> (Router, Arc<TestLifecycle>) {
    let (lifecycle, _, _) = build_lifecycle();
    let lifecycle = Arc::new(lifecycle);
    (hiring_router(lifecycle.clone()), lifecycle)
}

fn json_request(method: Method, uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&payload).expect("serialize")))
        .expect("request")
}

fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn start_route_creates_an_application() {
    let (router, lifecycle) = router();

    let response = router
        .oneshot(empty_request(Method::POST, "/api/v1/applications"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "STARTED");
    assert_eq!(body["current_step"], "personal-info");
    assert_eq!(lifecycle.store().len(), 1);
}

#[tokio::test]
async fn step_route_reports_validation_errors() {
    let (router, lifecycle) = router();
    let id = lifecycle.start_application().expect("starts").application_id;

    let response = router
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/applications/{id}/steps"),
            json!({"currentStep": "personal-info", "firstName": "Asha"}),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["field"], "lastName");
    assert_eq!(body["step_id"], "personal-info");
}

#[tokio::test]
async fn approval_route_maps_domain_errors() {
    let (router, lifecycle) = router();
    let id = lifecycle.start_application().expect("starts").application_id;

    let invalid_role = router
        .clone()
        .oneshot(empty_request(
            Method::POST,
            &format!("/api/v1/applications/{id}/approve/ceo"),
        ))
        .await
        .expect("response");
    assert_eq!(invalid_role.status(), StatusCode::BAD_REQUEST);

    let out_of_order = router
        .clone()
        .oneshot(empty_request(
            Method::POST,
            &format!("/api/v1/applications/{id}/approve/hr"),
        ))
        .await
        .expect("response");
    assert_eq!(out_of_order.status(), StatusCode::CONFLICT);

    let missing = router
        .oneshot(empty_request(
            Method::POST,
            "/api/v1/applications/APP-missing/approve/hr",
        ))
        .await
        .expect("response");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn review_routes_drive_the_pipeline() {
    let (router, lifecycle) = router();
    let (id, _) = submitted_application(&lifecycle, None);

    let approved = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/applications/{id}/approve/hr"),
            json!({"comments": "Shortlisted"}),
        ))
        .await
        .expect("response");
    assert_eq!(approved.status(), StatusCode::OK);
    let body = read_json_body(approved).await;
    assert_eq!(body["status"], "HR_APPROVED");
    assert_eq!(body["applied"], true);

    let rejected = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/applications/{id}/reject/pm"),
            json!({"comments": "Budget"}),
        ))
        .await
        .expect("response");
    let body = read_json_body(rejected).await;
    assert_eq!(body["status"], "REJECTED_BY_TL_PM");

    let status = router
        .oneshot(empty_request(
            Method::GET,
            &format!("/api/v1/applications/{id}/status"),
        ))
        .await
        .expect("response");
    let body = read_json_body(status).await;
    assert_eq!(body["status"], "REJECTED_BY_TL_PM");
    assert_eq!(body["approvals"]["projectmanager"]["decision"], "reject");
    assert_eq!(body["approvals"]["projectmanager"]["comments"], "Budget");
}

#[tokio::test]
async fn summary_route_returns_the_hr_digest() {
    let (router, lifecycle) = router();
    let (id, _) = submitted_application(&lifecycle, None);

    let response = router
        .oneshot(empty_request(
            Method::GET,
            &format!("/api/v1/applications/{id}/summary"),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["applicant_name"], "Asha Rao");
    assert_eq!(body["email"], "asha.rao@example.com");
}

#[tokio::test]
async fn status_callback_route_rejects_unknown_labels() {
    let (router, lifecycle) = router();
    let (id, _) = submitted_application(&lifecycle, None);

    let response = router
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/v1/applications/{id}/status"),
            json!({"status": "PARKED"}),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sync_route_returns_the_reconcile_report() {
    let (router, lifecycle) = router();
    submitted_application(&lifecycle, None);

    let response = router
        .oneshot(empty_request(Method::POST, "/api/v1/sync"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["unchanged"], 1);
    assert_eq!(body["failures"], 0);
}

#[tokio::test]
async fn referral_routes_administer_the_registry() {
    let (router, lifecycle) = router();

    let added = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/referrals",
            json!({"code": " campus25 "}),
        ))
        .await
        .expect("response");
    assert_eq!(added.status(), StatusCode::CREATED);
    assert!(lifecycle.referrals().is_valid("CAMPUS25"));

    let listed = router
        .clone()
        .oneshot(empty_request(Method::GET, "/api/v1/referrals"))
        .await
        .expect("response");
    let body = read_json_body(listed).await;
    let codes = body["codes"].as_array().expect("codes");
    assert!(codes.contains(&json!("CAMPUS25")));
    assert!(codes.contains(&json!("REF12345")));

    let removed = router
        .clone()
        .oneshot(empty_request(Method::DELETE, "/api/v1/referrals/ref12345"))
        .await
        .expect("response");
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);

    let missing = router
        .oneshot(empty_request(Method::DELETE, "/api/v1/referrals/REF12345"))
        .await
        .expect("response");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn steps_route_lists_the_catalog() {
    let (router, _) = router();

    let response = router
        .oneshot(empty_request(Method::GET, "/api/v1/steps"))
        .await
        .expect("response");

    let body = read_json_body(response).await;
    let steps = body.as_array().expect("steps");
    assert_eq!(steps.len(), 5);
    assert_eq!(steps[0]["step_id"], "personal-info");
    assert_eq!(steps[4]["step_id"], "review-submit");
}
