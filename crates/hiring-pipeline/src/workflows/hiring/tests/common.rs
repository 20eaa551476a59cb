use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::{json, Value};

use crate::config::HiringConfig;
use crate::workflows::hiring::domain::{ApplicationId, ApplicationRecord, FieldMap};
use crate::workflows::hiring::engine::{InMemoryEngine, InstanceRef};
use crate::workflows::hiring::lifecycle::{HiringLifecycle, RoleAction, StepOutcome};
use crate::workflows::hiring::notify::HireNotifier;

pub(super) type TestLifecycle = HiringLifecycle<InMemoryEngine, RecordingNotifier>;

#[derive(Default)]
pub(super) struct RecordingNotifier {
    sent: Mutex<Vec<ApplicationId>>,
    failing: bool,
}

impl RecordingNotifier {
    pub(super) fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub(super) fn sent(&self) -> Vec<ApplicationId> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

impl HireNotifier for RecordingNotifier {
    fn send_hire_notification(&self, application: &ApplicationRecord) -> bool {
        if self.failing {
            return false;
        }
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(application.application_id.clone());
        true
    }
}

pub(super) fn build_lifecycle() -> (TestLifecycle, Arc<InMemoryEngine>, Arc<RecordingNotifier>) {
    build_with_notifier(RecordingNotifier::default())
}

pub(super) fn build_with_notifier(
    notifier: RecordingNotifier,
) -> (TestLifecycle, Arc<InMemoryEngine>, Arc<RecordingNotifier>) {
    let engine = Arc::new(InMemoryEngine::new());
    let notifier = Arc::new(notifier);
    let lifecycle =
        HiringLifecycle::new(engine.clone(), notifier.clone(), &HiringConfig::default());
    (lifecycle, engine, notifier)
}

pub(super) fn fields(value: Value) -> FieldMap {
    serde_json::from_value(value).expect("field map")
}

pub(super) fn personal_info() -> FieldMap {
    fields(json!({
        "currentStep": "personal-info",
        "firstName": "Asha",
        "lastName": "Rao",
        "email": "asha.rao@example.com",
        "mobileNumber": "9876543210"
    }))
}

pub(super) fn professional_info() -> FieldMap {
    fields(json!({
        "currentStep": "professional-info",
        "totalExperience": "6 years",
        "skills": "Rust, PostgreSQL",
        "noticePeriod": "30 days"
    }))
}

pub(super) fn education() -> FieldMap {
    fields(json!({
        "currentStep": "education",
        "highestEducation": "B.Tech"
    }))
}

pub(super) fn position_details() -> FieldMap {
    fields(json!({
        "currentStep": "position-details",
        "position": "Backend Engineer",
        "expectedSalaryCTC": "24 LPA"
    }))
}

pub(super) fn review_submit(referral: Option<&str>) -> FieldMap {
    let mut data = fields(json!({
        "currentStep": "review-submit",
        "declarationAccepted": true
    }));
    if let Some(code) = referral {
        data.insert("referralId".to_string(), json!(code));
    }
    data
}

/// Starts an application and walks it through every intake step.
pub(super) fn submitted_application(
    lifecycle: &TestLifecycle,
    referral: Option<&str>,
) -> (ApplicationId, StepOutcome) {
    let record = lifecycle.start_application().expect("application starts");
    let id = record.application_id;
    for step in [personal_info(), professional_info(), education(), position_details()] {
        lifecycle.submit_step(&id, step).expect("intake step accepted");
    }
    let outcome = lifecycle
        .submit_step(&id, review_submit(referral))
        .expect("final step accepted");
    (id, outcome)
}

/// Drives a submitted application through HR, both parallel reviews and head HR.
pub(super) fn approved_through_head_hr(lifecycle: &TestLifecycle) -> ApplicationId {
    let (id, _) = submitted_application(lifecycle, None);
    for role in ["hr", "teamlead", "projectmanager"] {
        lifecycle
            .approve(&id, role, RoleAction::default())
            .expect("approval recorded");
    }
    lifecycle
        .approve(
            &id,
            "headhr",
            RoleAction {
                comments: Some("Strong systems background".to_string()),
                offer_ctc: Some("22 LPA".to_string()),
            },
        )
        .expect("head hr approval recorded");
    id
}

/// Full approval chain; the application waits on HR hiring afterwards.
pub(super) fn approved_by_company_manager(lifecycle: &TestLifecycle) -> ApplicationId {
    let id = approved_through_head_hr(lifecycle);
    lifecycle
        .approve(&id, "companymanager", RoleAction::default())
        .expect("company manager approval recorded");
    id
}

pub(super) fn instance_of(lifecycle: &TestLifecycle, id: &ApplicationId) -> InstanceRef {
    lifecycle
        .get(id)
        .expect("record exists")
        .engine
        .instance
        .expect("engine instance linked")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
