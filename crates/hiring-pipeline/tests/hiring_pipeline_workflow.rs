//! End-to-end scenarios for the hiring pipeline driven through the public lifecycle
//! facade and HTTP router only.

mod common {
    use std::sync::Arc;

    use hiring_pipeline::config::HiringConfig;
    use hiring_pipeline::workflows::hiring::engine::{
        EngineAdapter, EngineError, EngineInstance, InstanceRef, TaskRef, Variables,
    };
    use hiring_pipeline::workflows::hiring::{
        ApplicationId, FieldMap, HiringLifecycle, InMemoryEngine, TracingNotifier,
    };
    use serde_json::json;

    pub(super) fn lifecycle() -> HiringLifecycle<InMemoryEngine, TracingNotifier> {
        HiringLifecycle::new(
            Arc::new(InMemoryEngine::new()),
            Arc::new(TracingNotifier),
            &HiringConfig::default(),
        )
    }

    pub(super) fn steps(referral: Option<&str>) -> Vec<FieldMap> {
        let mut review = json!({
            "currentStep": "review-submit",
            "declarationAccepted": true
        });
        if let Some(code) = referral {
            review["referralId"] = json!(code);
        }
        [
            json!({
                "currentStep": "personal-info",
                "firstName": "Meera",
                "lastName": "Nair",
                "email": "meera.nair@example.com",
                "mobileNumber": "9123456780"
            }),
            json!({
                "currentStep": "professional-info",
                "totalExperience": "4 years",
                "skills": "Go, Kubernetes",
                "noticePeriod": "60 days"
            }),
            json!({"currentStep": "education", "highestEducation": "M.Sc"}),
            json!({
                "currentStep": "position-details",
                "position": "Site Reliability Engineer",
                "expectedSalaryCTC": "30 LPA"
            }),
            review,
        ]
        .into_iter()
        .map(|value| serde_json::from_value(value).expect("field map"))
        .collect()
    }

    pub(super) fn submit_all<E, N>(
        lifecycle: &HiringLifecycle<E, N>,
        referral: Option<&str>,
    ) -> ApplicationId
    where
        E: EngineAdapter + 'static,
        N: hiring_pipeline::workflows::hiring::HireNotifier + 'static,
    {
        let id = lifecycle
            .start_application()
            .expect("application starts")
            .application_id;
        for step in steps(referral) {
            lifecycle.submit_step(&id, step).expect("step accepted");
        }
        id
    }

    /// Engine whose every call fails, as when the workflow service is down.
    pub(super) struct OfflineEngine;

    fn offline() -> EngineError {
        EngineError::Unavailable("connection refused".to_string())
    }

    impl EngineAdapter for OfflineEngine {
        fn start_instance(
            &self,
            _process_key: &str,
            _business_key: &str,
            _variables: Variables,
        ) -> Result<InstanceRef, EngineError> {
            Err(offline())
        }

        fn active_tasks(&self, _instance: &InstanceRef) -> Result<Vec<TaskRef>, EngineError> {
            Err(offline())
        }

        fn complete_task(&self, _task: &TaskRef, _variables: Variables) -> Result<(), EngineError> {
            Err(offline())
        }

        fn list_active_instances(
            &self,
            _process_key: &str,
        ) -> Result<Vec<EngineInstance>, EngineError> {
            Err(offline())
        }

        fn live_variables(&self, _instance: &InstanceRef) -> Result<Variables, EngineError> {
            Err(offline())
        }

        fn list_finished_instances(
            &self,
            _process_key: &str,
        ) -> Result<Vec<EngineInstance>, EngineError> {
            Err(offline())
        }

        fn final_variables(&self, _instance: &InstanceRef) -> Result<Variables, EngineError> {
            Err(offline())
        }

        fn is_active(&self, _instance: &InstanceRef) -> Result<bool, EngineError> {
            Err(offline())
        }
    }
}

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use chrono::NaiveDate;
use hiring_pipeline::config::HiringConfig;
use hiring_pipeline::workflows::hiring::{
    hiring_router, ApplicationStatus, ApprovalRole, Decision, FieldMap, HireRequest,
    HiringError, HiringLifecycle, RoleAction, StepDefinition, StepValidator, TracingNotifier,
    ValidationError,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{lifecycle, submit_all, OfflineEngine};

#[test]
fn referral_candidate_is_hired_after_company_manager_approval() {
    let lifecycle = lifecycle();
    let id = submit_all(&lifecycle, Some("hire123"));

    let view = lifecycle.status(&id).expect("status");
    assert_eq!(view.status, "PENDING_COMPANY_MANAGER_REVIEW");

    let outcome = lifecycle
        .approve(
            &id,
            "CompanyManager",
            RoleAction {
                comments: Some("Fast-tracked".to_string()),
                offer_ctc: Some("28 LPA".to_string()),
            },
        )
        .expect("approved");
    assert_eq!(outcome.status, ApplicationStatus::PendingHrHiring);
    assert!(outcome.engine_synced);

    let record = lifecycle
        .hire_candidate(
            &id,
            HireRequest {
                comments: None,
                joining_date: NaiveDate::from_ymd_opt(2026, 12, 1).expect("valid date"),
                department: "Infrastructure".to_string(),
            },
        )
        .expect("hired");
    assert_eq!(record.status, ApplicationStatus::Hired);
    assert_eq!(record.decision(ApprovalRole::Hr), Decision::Pending);
    assert!(record.hire_notification.expect("notification").sent);

    let view = lifecycle.status(&id).expect("status after sync");
    assert_eq!(view.status, "HIRED");
}

#[test]
fn offline_engine_degrades_without_blocking_the_bypass_path() {
    let lifecycle = HiringLifecycle::new(
        Arc::new(OfflineEngine),
        Arc::new(TracingNotifier),
        &HiringConfig::default(),
    );
    let id = submit_all(&lifecycle, Some("REF67890"));

    let record = lifecycle.get(&id).expect("record");
    assert_eq!(record.status, ApplicationStatus::PendingCompanyManagerReview);
    assert!(record.engine.instance.is_none());
    assert!(record.engine.degraded);

    assert!(matches!(
        lifecycle.approve(&id, "hr", RoleAction::default()),
        Err(HiringError::InvalidTransition { .. })
    ));
    let outcome = lifecycle
        .approve(&id, "companymanager", RoleAction::default())
        .expect("company manager acts without engine");
    assert!(outcome.applied);

    let report = lifecycle.reconcile();
    assert_eq!(report.failures, 2);
    assert_eq!(
        lifecycle.status(&id).expect("status").status,
        "PENDING_HR_HIRING"
    );
}

struct NoGmailValidator;

impl StepValidator for NoGmailValidator {
    fn validate(&self, step: &StepDefinition, data: &FieldMap) -> Result<(), ValidationError> {
        let email = data.get("email").and_then(Value::as_str).unwrap_or_default();
        if email.ends_with("@gmail.com") {
            return Err(ValidationError {
                step_id: step.step_id.to_string(),
                field: Some("email".to_string()),
                message: "Company email required".to_string(),
            });
        }
        Ok(())
    }
}

#[test]
fn custom_validators_replace_the_default_rules() {
    let lifecycle = lifecycle().with_validator(Arc::new(NoGmailValidator));
    let id = lifecycle.start_application().expect("starts").application_id;
    let data: FieldMap = serde_json::from_value(json!({
        "currentStep": "personal-info",
        "email": "someone@gmail.com"
    }))
    .expect("field map");

    let err = lifecycle.submit_step(&id, data).expect_err("rejected");

    assert_eq!(err.to_string(), "Company email required");
}

#[tokio::test]
async fn http_surface_walks_an_application_to_head_hr() {
    let lifecycle = Arc::new(lifecycle());
    let router = hiring_router(lifecycle.clone());
    let id = submit_all(&lifecycle, None);

    for (role, expected) in [
        ("hr", "HR_APPROVED"),
        ("tl", "PENDING_PM_REVIEW"),
        ("pm", "PENDING_HEAD_HR_REVIEW"),
    ] {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri(format!("/api/v1/applications/{id}/approve/{role}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({"comments": "ok"}).to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("body");
        let payload: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(payload["status"], expected);
    }

    let listed = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/applications")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let body = axum::body::to_bytes(listed.into_body(), 64 * 1024)
        .await
        .expect("body");
    let payload: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(payload[0]["status"], "PENDING_HEAD_HR_REVIEW");
}
