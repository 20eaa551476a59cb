use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;

use super::domain::{ApplicationId, FieldMap};
use super::engine::EngineAdapter;
use super::lifecycle::{HireRequest, HiringLifecycle, OnboardingRequest, RoleAction};
use super::notify::HireNotifier;

type Lifecycle<E, N> = State<Arc<HiringLifecycle<E, N>>>;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RejectionBody {
    #[serde(default)]
    comments: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConfirmationBody {
    confirmed: bool,
    #[serde(default)]
    comments: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusBody {
    status: String,
    #[serde(default)]
    extra: FieldMap,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReferralBody {
    code: String,
}

/// HTTP endpoints for intake, review decisions, onboarding and engine sync.
pub fn hiring_router<E, N>(lifecycle: Arc<HiringLifecycle<E, N>>) -> Router
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/applications",
            post(start_handler::<E, N>).get(list_handler::<E, N>),
        )
        .route("/api/v1/applications/:application_id", get(get_handler::<E, N>))
        .route(
            "/api/v1/applications/:application_id/status",
            get(status_handler::<E, N>).put(update_status_handler::<E, N>),
        )
        .route(
            "/api/v1/applications/:application_id/summary",
            get(summary_handler::<E, N>),
        )
        .route(
            "/api/v1/applications/:application_id/steps",
            post(submit_step_handler::<E, N>),
        )
        .route(
            "/api/v1/applications/:application_id/approve/:role",
            post(approve_handler::<E, N>),
        )
        .route(
            "/api/v1/applications/:application_id/reject/:role",
            post(reject_handler::<E, N>),
        )
        .route(
            "/api/v1/applications/:application_id/hire",
            post(hire_handler::<E, N>),
        )
        .route(
            "/api/v1/applications/:application_id/accept",
            post(accept_handler::<E, N>),
        )
        .route(
            "/api/v1/applications/:application_id/onboarding",
            post(initiate_onboarding_handler::<E, N>),
        )
        .route(
            "/api/v1/applications/:application_id/onboarding/complete",
            post(complete_onboarding_handler::<E, N>),
        )
        .route(
            "/api/v1/applications/:application_id/onboarding/confirm",
            post(confirm_onboarding_handler::<E, N>),
        )
        .route("/api/v1/steps", get(steps_handler::<E, N>))
        .route(
            "/api/v1/steps/:step_id/validate",
            post(validate_step_handler::<E, N>),
        )
        .route("/api/v1/sync", post(sync_handler::<E, N>))
        .route(
            "/api/v1/referrals",
            get(referrals_handler::<E, N>).post(add_referral_handler::<E, N>),
        )
        .route(
            "/api/v1/referrals/:code",
            delete(remove_referral_handler::<E, N>),
        )
        .with_state(lifecycle)
}

pub(crate) async fn start_handler<E, N>(
    State(lifecycle): Lifecycle<E, N>,
) -> Result<Response, AppError>
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    let record = lifecycle.start_application()?;
    Ok((StatusCode::CREATED, Json(record)).into_response())
}

pub(crate) async fn list_handler<E, N>(State(lifecycle): Lifecycle<E, N>) -> Response
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    Json(lifecycle.list()).into_response()
}

pub(crate) async fn get_handler<E, N>(
    State(lifecycle): Lifecycle<E, N>,
    Path(application_id): Path<String>,
) -> Result<Response, AppError>
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    let record = lifecycle.get(&ApplicationId(application_id))?;
    Ok(Json(record).into_response())
}

pub(crate) async fn status_handler<E, N>(
    State(lifecycle): Lifecycle<E, N>,
    Path(application_id): Path<String>,
) -> Result<Response, AppError>
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    let view = lifecycle.status(&ApplicationId(application_id))?;
    Ok(Json(view).into_response())
}

pub(crate) async fn update_status_handler<E, N>(
    State(lifecycle): Lifecycle<E, N>,
    Path(application_id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Result<Response, AppError>
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    let id = ApplicationId(application_id);
    lifecycle.update_status(&id, &body.status, body.extra)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "application_id": id, "status": body.status.trim() })),
    )
        .into_response())
}

pub(crate) async fn summary_handler<E, N>(
    State(lifecycle): Lifecycle<E, N>,
    Path(application_id): Path<String>,
) -> Result<Response, AppError>
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    let summary = lifecycle.hr_summary(&ApplicationId(application_id))?;
    Ok(Json(summary).into_response())
}

pub(crate) async fn submit_step_handler<E, N>(
    State(lifecycle): Lifecycle<E, N>,
    Path(application_id): Path<String>,
    Json(step_data): Json<FieldMap>,
) -> Result<Response, AppError>
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    let outcome = lifecycle.submit_step(&ApplicationId(application_id), step_data)?;
    Ok(Json(outcome).into_response())
}

pub(crate) async fn approve_handler<E, N>(
    State(lifecycle): Lifecycle<E, N>,
    Path((application_id, role)): Path<(String, String)>,
    body: Option<Json<RoleAction>>,
) -> Result<Response, AppError>
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    let action = body.map(|Json(action)| action).unwrap_or_default();
    let outcome = lifecycle.approve(&ApplicationId(application_id), &role, action)?;
    Ok(Json(outcome).into_response())
}

pub(crate) async fn reject_handler<E, N>(
    State(lifecycle): Lifecycle<E, N>,
    Path((application_id, role)): Path<(String, String)>,
    body: Option<Json<RejectionBody>>,
) -> Result<Response, AppError>
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let outcome = lifecycle.reject(&ApplicationId(application_id), &role, body.comments)?;
    Ok(Json(outcome).into_response())
}

pub(crate) async fn hire_handler<E, N>(
    State(lifecycle): Lifecycle<E, N>,
    Path(application_id): Path<String>,
    Json(request): Json<HireRequest>,
) -> Result<Response, AppError>
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    let record = lifecycle.hire_candidate(&ApplicationId(application_id), request)?;
    Ok(Json(record).into_response())
}

pub(crate) async fn accept_handler<E, N>(
    State(lifecycle): Lifecycle<E, N>,
    Path(application_id): Path<String>,
) -> Result<Response, AppError>
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    let record = lifecycle.mark_accepted(&ApplicationId(application_id))?;
    Ok(Json(record).into_response())
}

pub(crate) async fn initiate_onboarding_handler<E, N>(
    State(lifecycle): Lifecycle<E, N>,
    Path(application_id): Path<String>,
    Json(request): Json<OnboardingRequest>,
) -> Result<Response, AppError>
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    let record = lifecycle.initiate_onboarding(&ApplicationId(application_id), request)?;
    Ok(Json(record).into_response())
}

pub(crate) async fn complete_onboarding_handler<E, N>(
    State(lifecycle): Lifecycle<E, N>,
    Path(application_id): Path<String>,
    Json(data): Json<FieldMap>,
) -> Result<Response, AppError>
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    let record = lifecycle.complete_onboarding(&ApplicationId(application_id), data)?;
    Ok(Json(record).into_response())
}

pub(crate) async fn confirm_onboarding_handler<E, N>(
    State(lifecycle): Lifecycle<E, N>,
    Path(application_id): Path<String>,
    Json(body): Json<ConfirmationBody>,
) -> Result<Response, AppError>
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    let record = lifecycle.confirm_onboarding(
        &ApplicationId(application_id),
        body.confirmed,
        body.comments,
    )?;
    Ok(Json(record).into_response())
}

pub(crate) async fn steps_handler<E, N>(State(lifecycle): Lifecycle<E, N>) -> Response
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    Json(lifecycle.catalog().steps()).into_response()
}

pub(crate) async fn validate_step_handler<E, N>(
    State(lifecycle): Lifecycle<E, N>,
    Path(step_id): Path<String>,
    Json(data): Json<FieldMap>,
) -> Result<Response, AppError>
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    lifecycle.validate_step(&step_id, &data)?;
    Ok(Json(json!({ "step_id": step_id, "valid": true })).into_response())
}

pub(crate) async fn sync_handler<E, N>(State(lifecycle): Lifecycle<E, N>) -> Response
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    Json(lifecycle.reconcile()).into_response()
}

pub(crate) async fn referrals_handler<E, N>(State(lifecycle): Lifecycle<E, N>) -> Response
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    Json(json!({ "codes": lifecycle.referrals().codes() })).into_response()
}

pub(crate) async fn add_referral_handler<E, N>(
    State(lifecycle): Lifecycle<E, N>,
    Json(body): Json<ReferralBody>,
) -> Response
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    if lifecycle.referrals().add(&body.code) {
        (StatusCode::CREATED, Json(json!({ "added": true }))).into_response()
    } else {
        Json(json!({ "added": false })).into_response()
    }
}

pub(crate) async fn remove_referral_handler<E, N>(
    State(lifecycle): Lifecycle<E, N>,
    Path(code): Path<String>,
) -> Response
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    if lifecycle.referrals().remove(&code) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("referral code not found: {code}") })),
        )
            .into_response()
    }
}
