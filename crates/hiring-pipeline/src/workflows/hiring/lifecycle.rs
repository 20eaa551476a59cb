use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::HiringConfig;

use super::domain::{
    ApplicationId, ApplicationRecord, ApplicationStatus, ApplicationStatusView, ApprovalRecord,
    ApprovalRole, Decision, FieldMap, FinalConfirmation, HireDetails, HrSummary,
    NotificationState, OnboardingDetails, ReferralState,
};
use super::engine::{EngineAdapter, EngineError, InstanceRef, TaskRef, Variables};
use super::gates::{self, ReferralGate};
use super::notify::HireNotifier;
use super::referral::ReferralRegistry;
use super::steps::{CatalogError, StepCatalog};
use super::store::{ApplicationStore, StoreError};
use super::validation::{RequiredFieldValidator, StepValidator, ValidationError};

/// Control key naming the step a submission belongs to; never merged into the fields.
pub const STEP_CURSOR_KEY: &str = "currentStep";

/// Intake field carrying the optional referral code on the final step.
pub const REFERRAL_KEY: &str = "referralId";

/// Drives applications through intake and the approval pipeline while mirroring every
/// transition onto the external workflow engine.
///
/// The store is the source of truth. Engine calls happen outside the per-application
/// lock and their failures only mark the record's engine link as degraded, except
/// where an approval role needs a live task to act on.
pub struct HiringLifecycle<E, N> {
    pub(super) store: Arc<ApplicationStore>,
    pub(super) catalog: Arc<StepCatalog>,
    pub(super) referrals: Arc<ReferralRegistry>,
    pub(super) validator: Arc<dyn StepValidator>,
    pub(super) engine: Arc<E>,
    pub(super) notifier: Arc<N>,
    pub(super) process_key: String,
}

/// Reviewer input for an approval.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleAction {
    #[serde(default)]
    pub comments: Option<String>,
    /// Offered compensation; recorded for head HR and company manager approvals.
    #[serde(default)]
    pub offer_ctc: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HireRequest {
    #[serde(default)]
    pub comments: Option<String>,
    pub joining_date: NaiveDate,
    pub department: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingRequest {
    pub joining_date: NaiveDate,
    pub reporting_manager: String,
    pub department: String,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub application_id: ApplicationId,
    pub step_id: String,
    pub status: ApplicationStatus,
    pub next_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral: Option<ReferralState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionOutcome {
    pub application_id: ApplicationId,
    pub role: ApprovalRole,
    pub decision: Decision,
    pub status: ApplicationStatus,
    /// `false` when the application was already closed and nothing changed.
    pub applied: bool,
    pub engine_synced: bool,
}

impl DecisionOutcome {
    fn ignored(record: &ApplicationRecord, role: ApprovalRole, decision: Decision) -> Self {
        Self {
            application_id: record.application_id.clone(),
            role,
            decision,
            status: record.status,
            applied: false,
            engine_synced: false,
        }
    }
}

/// Error raised by lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum HiringError {
    #[error("application not found: {0}")]
    NotFound(ApplicationId),
    #[error("application already exists: {0}")]
    Conflict(ApplicationId),
    #[error(transparent)]
    StepNotFound(#[from] CatalogError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid role: {0}")]
    InvalidRole(String),
    #[error("no active task found for role {role} in application {application_id}")]
    NoActiveTask {
        application_id: ApplicationId,
        role: ApprovalRole,
    },
    #[error("application {0} has already been submitted")]
    AlreadySubmitted(ApplicationId),
    #[error("cannot {action} application {application_id} while it is {status}")]
    InvalidTransition {
        application_id: ApplicationId,
        status: ApplicationStatus,
        action: &'static str,
    },
    #[error("unknown application status: {0}")]
    InvalidStatus(String),
    #[error(transparent)]
    Adapter(#[from] EngineError),
}

impl From<StoreError> for HiringError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(id) => HiringError::Conflict(id),
            StoreError::NotFound(id) => HiringError::NotFound(id),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn invalid_transition(record: &ApplicationRecord, action: &'static str) -> HiringError {
    HiringError::InvalidTransition {
        application_id: record.application_id.clone(),
        status: record.status,
        action,
    }
}

const fn review_action(role: ApprovalRole) -> &'static str {
    match role {
        ApprovalRole::Hr => "record the hr review of",
        ApprovalRole::TeamLead => "record the team lead review of",
        ApprovalRole::ProjectManager => "record the project manager review of",
        ApprovalRole::HeadHr => "record the head hr review of",
        ApprovalRole::CompanyManager => "record the company manager review of",
    }
}

/// Onboarding follows the company manager's approval, with or without the hire step.
const fn onboarding_may_start(status: ApplicationStatus) -> bool {
    matches!(
        status,
        ApplicationStatus::PendingHrHiring | ApplicationStatus::Hired
    )
}

fn approval_record(
    role: ApprovalRole,
    decision: Decision,
    comments: Option<String>,
    offer: Option<String>,
) -> ApprovalRecord {
    let mut extra = FieldMap::new();
    if role == ApprovalRole::Hr && decision == Decision::Accept {
        extra.insert("interviewRequired".to_string(), Value::Bool(true));
    }
    if decision == Decision::Accept {
        if let (Some(key), Some(offer)) = (role.offer_key(), offer) {
            extra.insert(key.to_string(), Value::String(offer));
        }
    }
    ApprovalRecord {
        decision,
        comments,
        extra,
    }
}

fn decision_variables(role: ApprovalRole, approval: &ApprovalRecord) -> Variables {
    let mut variables = Variables::new();
    variables.insert(role.decision_key(), json!(approval.decision.as_str()));
    variables.insert(
        role.comments_key(),
        json!(approval.comments.clone().unwrap_or_default()),
    );
    variables.extend(approval.extra.clone());
    variables
}

fn submission_variables(step_id: &str, data: &FieldMap, referral: Option<&ReferralState>) -> Variables {
    let mut variables: Variables = data
        .iter()
        .filter(|(key, _)| key.as_str() != STEP_CURSOR_KEY)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    variables.insert("stepCompleted".to_string(), json!(step_id));
    variables.insert("validationResult".to_string(), Value::Bool(true));
    variables.insert(
        "hasValidReferral".to_string(),
        Value::Bool(referral.is_some_and(|referral| referral.valid)),
    );
    variables.insert(
        "bypassedApprovals".to_string(),
        Value::Bool(referral.is_some_and(|referral| referral.bypass)),
    );
    if let Some(referral) = referral {
        variables.insert(REFERRAL_KEY.to_string(), json!(referral.code));
    }
    variables
}

impl<E, N> HiringLifecycle<E, N>
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    pub fn new(engine: Arc<E>, notifier: Arc<N>, config: &HiringConfig) -> Self {
        Self {
            store: Arc::new(ApplicationStore::new()),
            catalog: Arc::new(StepCatalog::standard()),
            referrals: Arc::new(ReferralRegistry::new(&config.referral_codes)),
            validator: Arc::new(RequiredFieldValidator),
            engine,
            notifier,
            process_key: config.process_key.clone(),
        }
    }

    pub fn with_catalog(mut self, catalog: StepCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn StepValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn store(&self) -> &ApplicationStore {
        &self.store
    }

    pub fn catalog(&self) -> &StepCatalog {
        &self.catalog
    }

    pub fn referrals(&self) -> &ReferralRegistry {
        &self.referrals
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Creates the record at the first intake step and starts its engine mirror.
    /// A failed engine start leaves the application without an instance.
    pub fn start_application(&self) -> Result<ApplicationRecord, HiringError> {
        let now = Utc::now();
        let first_step = self.catalog.first_step();
        let application_id = ApplicationId::generate();
        self.store.insert(ApplicationRecord::new(
            application_id.clone(),
            first_step.step_id,
            now,
        ))?;

        let mut variables = Variables::new();
        variables.insert("applicationId".to_string(), json!(application_id.as_str()));
        variables.insert(
            "applicationStatus".to_string(),
            json!(ApplicationStatus::Started.label()),
        );
        variables.insert("validationResult".to_string(), Value::Bool(true));

        match self
            .engine
            .start_instance(&self.process_key, application_id.as_str(), variables)
        {
            Ok(instance) => {
                info!(%application_id, instance = %instance.0, "engine instance started");
                self.store.update(&application_id, |record| {
                    record.engine.instance = Some(instance);
                    Ok::<_, HiringError>(())
                })?;
            }
            Err(err) => self.note_engine_failure(&application_id, "start instance", &err),
        }

        info!(%application_id, step = first_step.step_id, "application started");
        self.get(&application_id)
    }

    /// Merges one intake step. The step is named by the `currentStep` key, falling back to
    /// the record's cursor. The final step routes through the referral gate and is
    /// mirrored onto the engine's intake task.
    pub fn submit_step(
        &self,
        id: &ApplicationId,
        step_data: FieldMap,
    ) -> Result<StepOutcome, HiringError> {
        let snapshot = self.get(id)?;
        if !snapshot.status.is_intake() {
            return Err(HiringError::AlreadySubmitted(id.clone()));
        }

        let step_id = step_data
            .get(STEP_CURSOR_KEY)
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| snapshot.current_step.clone())
            .ok_or_else(|| HiringError::AlreadySubmitted(id.clone()))?;
        let step = self.catalog.step_by_id(&step_id)?;
        self.validator.validate(step, &step_data)?;

        let next_step = self
            .catalog
            .next_step(&step_id)?
            .map(|step| step.step_id.to_string());
        let gate: Option<ReferralGate> = self.catalog.is_last_step(&step_id)?.then(|| {
            gates::evaluate_referral(
                step_data.get(REFERRAL_KEY).and_then(Value::as_str),
                &self.referrals,
            )
        });

        let now = Utc::now();
        let record = self.store.update(id, |record| {
            if !record.status.is_intake() {
                return Err(HiringError::AlreadySubmitted(record.application_id.clone()));
            }
            for (key, value) in &step_data {
                if key != STEP_CURSOR_KEY {
                    record.fields.insert(key.clone(), value.clone());
                }
            }
            record.last_completed_step = Some(step_id.clone());
            record.last_updated_at = now;
            match &gate {
                Some(gate) => {
                    record.status = gate.status;
                    record.referral = gate.referral.clone();
                    record.current_step = None;
                    record.submitted_at = Some(now);
                }
                None => {
                    record.status = ApplicationStatus::InProgress;
                    record.current_step = next_step.clone();
                }
            }
            Ok(record.clone())
        })?;

        if gate.is_some() {
            if let Some(referral) = record.referral.as_ref().filter(|referral| !referral.valid) {
                warn!(%id, code = %referral.code, "unknown referral code; normal review path");
            }
            info!(%id, status = %record.status, bypass = record.bypassed_approvals(), "application submitted for review");
            self.mirror_submission(&record, &step_id, &step_data);
        } else {
            debug!(%id, step = %step_id, next = ?record.current_step, "intake step accepted");
        }

        Ok(StepOutcome {
            application_id: record.application_id.clone(),
            step_id,
            status: record.status,
            next_step: record.current_step.clone(),
            referral: record.referral.clone(),
        })
    }

    /// Runs the step's validator without touching any application.
    pub fn validate_step(&self, step_id: &str, data: &FieldMap) -> Result<(), HiringError> {
        let step = self.catalog.step_by_id(step_id)?;
        self.validator.validate(step, data)?;
        Ok(())
    }

    pub fn approve(
        &self,
        id: &ApplicationId,
        role: &str,
        action: RoleAction,
    ) -> Result<DecisionOutcome, HiringError> {
        self.decide(id, role, Decision::Accept, action)
    }

    pub fn reject(
        &self,
        id: &ApplicationId,
        role: &str,
        comments: Option<String>,
    ) -> Result<DecisionOutcome, HiringError> {
        let action = RoleAction {
            comments,
            offer_ctc: None,
        };
        self.decide(id, role, Decision::Reject, action)
    }

    fn decide(
        &self,
        id: &ApplicationId,
        raw_role: &str,
        decision: Decision,
        action: RoleAction,
    ) -> Result<DecisionOutcome, HiringError> {
        let role = ApprovalRole::parse(raw_role)
            .ok_or_else(|| HiringError::InvalidRole(raw_role.trim().to_string()))?;
        let snapshot = self.get(id)?;
        if snapshot.status.is_terminal() {
            info!(%id, %role, status = %snapshot.status, "application closed; decision ignored");
            return Ok(DecisionOutcome::ignored(&snapshot, role, decision));
        }
        if !role.accepts_in(snapshot.status) {
            return Err(invalid_transition(&snapshot, review_action(role)));
        }

        let task = self.locate_task(&snapshot, role)?;
        let approval = approval_record(
            role,
            decision,
            non_blank(action.comments.as_deref()),
            non_blank(action.offer_ctc.as_deref()),
        );

        let now = Utc::now();
        let mut outcome = self.store.update(id, |record| {
            if record.status.is_terminal() {
                return Ok::<_, HiringError>(DecisionOutcome::ignored(record, role, decision));
            }
            if !role.accepts_in(record.status) {
                return Err(invalid_transition(record, review_action(role)));
            }
            record.approvals.insert(role, approval.clone());
            record.status =
                gates::status_after_decision(role, decision, &record.approvals, record.status);
            record.last_updated_at = now;
            Ok(DecisionOutcome {
                application_id: record.application_id.clone(),
                role,
                decision,
                status: record.status,
                applied: true,
                engine_synced: false,
            })
        })?;
        if !outcome.applied {
            return Ok(outcome);
        }

        match task {
            Some(task) => match self
                .engine
                .complete_task(&task, decision_variables(role, &approval))
            {
                Ok(()) => {
                    outcome.engine_synced = true;
                    self.note_engine_ok(id);
                }
                Err(err) => self.note_engine_failure(id, "complete review task", &err),
            },
            None => info!(%id, %role, "decision recorded without an engine task"),
        }

        info!(%id, %role, decision = decision.as_str(), status = %outcome.status, "review decision recorded");
        Ok(outcome)
    }

    /// Finds the engine task `role` must complete. Only the company manager may proceed
    /// without one.
    fn locate_task(
        &self,
        record: &ApplicationRecord,
        role: ApprovalRole,
    ) -> Result<Option<TaskRef>, HiringError> {
        let missing = || {
            if role.requires_engine_task() {
                Err(HiringError::NoActiveTask {
                    application_id: record.application_id.clone(),
                    role,
                })
            } else {
                Ok(None)
            }
        };

        let Some(instance) = record.engine.instance.as_ref() else {
            return missing();
        };
        match self.engine.find_active_task_for_role(instance, role) {
            Ok(Some(task)) => Ok(Some(task)),
            Ok(None) => missing(),
            Err(err) => {
                self.note_engine_failure(&record.application_id, "locate review task", &err);
                missing()
            }
        }
    }

    /// Final HR hiring step. The notification outcome is recorded, never raised.
    pub fn hire_candidate(
        &self,
        id: &ApplicationId,
        request: HireRequest,
    ) -> Result<ApplicationRecord, HiringError> {
        let now = Utc::now();
        let record = self.store.update(id, |record| {
            if !matches!(
                record.status,
                ApplicationStatus::PendingHrHiring | ApplicationStatus::Accepted
            ) {
                return Err(invalid_transition(record, "hire"));
            }
            record.status = ApplicationStatus::Hired;
            record.hire = Some(HireDetails {
                comments: non_blank(request.comments.as_deref()),
                joining_date: request.joining_date,
                department: request.department.clone(),
                hired_at: now,
            });
            record.last_updated_at = now;
            Ok(record.clone())
        })?;

        info!(%id, joining = %request.joining_date, department = %request.department, "candidate hired");
        self.notify_hire(&record)
    }

    /// Marks the application accepted outside the pipeline and notifies the candidate.
    pub fn mark_accepted(&self, id: &ApplicationId) -> Result<ApplicationRecord, HiringError> {
        let now = Utc::now();
        let record = self.store.update(id, |record| {
            if record.status.is_terminal() {
                return Err(invalid_transition(record, "accept"));
            }
            record.status = ApplicationStatus::Accepted;
            record.current_step = None;
            record.last_updated_at = now;
            Ok(record.clone())
        })?;

        info!(%id, "application manually accepted");
        self.notify_hire(&record)
    }

    fn notify_hire(&self, record: &ApplicationRecord) -> Result<ApplicationRecord, HiringError> {
        let sent = self.notifier.send_hire_notification(record);
        if sent {
            info!(id = %record.application_id, "hire notification sent");
        } else {
            warn!(id = %record.application_id, "hire notification failed");
        }

        let now = Utc::now();
        self.store.update(&record.application_id, |record| {
            record.hire_notification = Some(NotificationState {
                sent,
                sent_at: sent.then_some(now),
            });
            record.last_updated_at = now;
            Ok(record.clone())
        })
    }

    /// Hands the candidate to onboarding. Needs the live HR task of the engine instance.
    pub fn initiate_onboarding(
        &self,
        id: &ApplicationId,
        request: OnboardingRequest,
    ) -> Result<ApplicationRecord, HiringError> {
        let snapshot = self.get(id)?;
        if !onboarding_may_start(snapshot.status) {
            return Err(invalid_transition(&snapshot, "initiate onboarding"));
        }
        let Some(task) = self.locate_task(&snapshot, ApprovalRole::Hr)? else {
            return Err(HiringError::NoActiveTask {
                application_id: id.clone(),
                role: ApprovalRole::Hr,
            });
        };

        let comments = non_blank(request.comments.as_deref());
        let now = Utc::now();
        let record = self.store.update(id, |record| {
            if !onboarding_may_start(record.status) {
                return Err(invalid_transition(record, "initiate onboarding"));
            }
            record.status = ApplicationStatus::OnboardingInitiated;
            record.onboarding = Some(OnboardingDetails {
                joining_date: request.joining_date,
                reporting_manager: request.reporting_manager.clone(),
                department: request.department.clone(),
                comments: comments.clone(),
                initiated_at: now,
                completed_at: None,
                final_confirmation: None,
            });
            record.last_updated_at = now;
            Ok(record.clone())
        })?;

        let mut variables = Variables::new();
        variables.insert("hrDecision".to_string(), json!("onboarding"));
        variables.insert("hrComments".to_string(), json!(comments.unwrap_or_default()));
        variables.insert(
            "joiningDate".to_string(),
            json!(request.joining_date.to_string()),
        );
        variables.insert(
            "reportingManager".to_string(),
            json!(request.reporting_manager),
        );
        variables.insert("department".to_string(), json!(request.department));
        match self.engine.complete_task(&task, variables) {
            Ok(()) => self.note_engine_ok(id),
            Err(err) => self.note_engine_failure(id, "complete onboarding task", &err),
        }

        info!(%id, "onboarding initiated");
        Ok(record)
    }

    /// Records the candidate's onboarding data and closes whatever engine tasks remain.
    pub fn complete_onboarding(
        &self,
        id: &ApplicationId,
        data: FieldMap,
    ) -> Result<ApplicationRecord, HiringError> {
        let now = Utc::now();
        let record = self.store.update(id, |record| {
            if record.status.is_rejection() {
                return Err(invalid_transition(record, "complete onboarding"));
            }
            record
                .fields
                .extend(data.iter().map(|(key, value)| (key.clone(), value.clone())));
            record.status = ApplicationStatus::OnboardingCompleted;
            record.current_step = None;
            if let Some(onboarding) = record.onboarding.as_mut() {
                onboarding.completed_at = Some(now);
            }
            record.last_updated_at = now;
            Ok(record.clone())
        })?;

        let process_ended = match record.engine.instance.as_ref() {
            Some(instance) => self.close_engine_tasks(id, instance, &data, now),
            None => true,
        };

        let record = self.store.update(id, |record| {
            record.engine.process_ended = Some(process_ended);
            Ok::<_, HiringError>(record.clone())
        })?;
        info!(%id, process_ended, "onboarding completed");
        Ok(record)
    }

    fn close_engine_tasks(
        &self,
        id: &ApplicationId,
        instance: &InstanceRef,
        data: &FieldMap,
        now: DateTime<Utc>,
    ) -> bool {
        let tasks = match self.engine.active_tasks(instance) {
            Ok(tasks) => tasks,
            Err(err) => {
                self.note_engine_failure(id, "list onboarding tasks", &err);
                return false;
            }
        };

        for task in tasks {
            let mut variables: Variables = data.clone();
            variables.insert("onboardingCompleted".to_string(), Value::Bool(true));
            variables.insert(
                "onboardingCompletionDate".to_string(),
                json!(now.to_rfc3339()),
            );
            match self.engine.complete_task(&task, variables) {
                Ok(()) => debug!(%id, task = %task.name, "engine task closed"),
                Err(err) => self.note_engine_failure(id, "close onboarding task", &err),
            }
        }

        match self.engine.is_active(instance) {
            Ok(active) => {
                if active {
                    warn!(%id, instance = %instance.0, "engine instance still active after onboarding");
                }
                !active
            }
            Err(err) => {
                self.note_engine_failure(id, "check instance state", &err);
                false
            }
        }
    }

    /// HR's final onboarding confirmation. A refusal closes the application; an approval
    /// only records the confirmation.
    pub fn confirm_onboarding(
        &self,
        id: &ApplicationId,
        confirmed: bool,
        comments: Option<String>,
    ) -> Result<ApplicationRecord, HiringError> {
        let now = Utc::now();
        let record = self.store.update(id, |record| {
            let status = record.status;
            let application_id = record.application_id.clone();
            let invalid = || HiringError::InvalidTransition {
                application_id,
                status,
                action: "confirm onboarding",
            };
            if !matches!(
                status,
                ApplicationStatus::OnboardingInitiated | ApplicationStatus::OnboardingCompleted
            ) {
                return Err(invalid());
            }
            let Some(onboarding) = record.onboarding.as_mut() else {
                return Err(invalid());
            };
            onboarding.final_confirmation = Some(FinalConfirmation {
                confirmed,
                comments: non_blank(comments.as_deref()),
                confirmed_at: now,
            });
            if !confirmed {
                record.status = ApplicationStatus::RejectedFinalOnboarding;
            }
            record.last_updated_at = now;
            Ok(record.clone())
        })?;

        info!(%id, confirmed, status = %record.status, "final onboarding confirmation recorded");
        Ok(record)
    }

    /// Status callback for engine-side handlers. Unknown applications are ignored.
    pub fn update_status(
        &self,
        id: &ApplicationId,
        label: &str,
        extra: FieldMap,
    ) -> Result<(), HiringError> {
        let status = ApplicationStatus::from_label(label)
            .ok_or_else(|| HiringError::InvalidStatus(label.trim().to_string()))?;
        if !self.store.contains(id) {
            warn!(%id, %status, "status callback for unknown application ignored");
            return Ok(());
        }

        let now = Utc::now();
        self.store.update(id, |record| {
            record.status = status;
            if !status.is_intake() {
                record.current_step = None;
            }
            record.fields.extend(extra);
            record.last_updated_at = now;
            Ok::<_, HiringError>(())
        })?;
        info!(%id, %status, "status updated by engine callback");
        Ok(())
    }

    pub fn get(&self, id: &ApplicationId) -> Result<ApplicationRecord, HiringError> {
        self.store
            .get(id)
            .ok_or_else(|| HiringError::NotFound(id.clone()))
    }

    /// Reconciles with the engine, then reports status and approvals.
    pub fn status(&self, id: &ApplicationId) -> Result<ApplicationStatusView, HiringError> {
        self.reconcile();
        Ok(self.get(id)?.status_view())
    }

    /// Reconciles with the engine, then lists every application, oldest first.
    pub fn list(&self) -> Vec<ApplicationRecord> {
        self.reconcile();
        self.store.snapshot()
    }

    pub fn hr_summary(&self, id: &ApplicationId) -> Result<HrSummary, HiringError> {
        Ok(self.get(id)?.hr_summary())
    }

    pub(super) fn note_engine_failure(&self, id: &ApplicationId, action: &str, err: &EngineError) {
        warn!(%id, action, error = %err, "engine call failed; continuing without mirror");
        let message = err.to_string();
        let result: Result<(), HiringError> = self.store.update(id, |record| {
            record.engine.degraded = true;
            record.engine.last_error = Some(message);
            Ok(())
        });
        if let Err(err) = result {
            debug!(%id, error = %err, "could not flag degraded engine link");
        }
    }

    fn note_engine_ok(&self, id: &ApplicationId) {
        let result: Result<(), HiringError> = self.store.update(id, |record| {
            if record.engine.degraded {
                record.engine.degraded = false;
                record.engine.last_error = None;
            }
            Ok(())
        });
        if let Err(err) = result {
            debug!(%id, error = %err, "could not clear degraded engine link");
        }
    }

    fn mirror_submission(&self, record: &ApplicationRecord, step_id: &str, data: &FieldMap) {
        let id = &record.application_id;
        let Some(instance) = record.engine.instance.as_ref() else {
            warn!(%id, "no engine instance; submission not mirrored");
            return;
        };

        let task = match self.engine.active_tasks(instance) {
            Ok(tasks) => tasks.into_iter().next(),
            Err(err) => {
                self.note_engine_failure(id, "find intake task", &err);
                return;
            }
        };
        let Some(task) = task else {
            warn!(%id, instance = %instance.0, "no active engine task to complete");
            return;
        };

        let variables = submission_variables(step_id, data, record.referral.as_ref());
        match self.engine.complete_task(&task, variables) {
            Ok(()) => {
                debug!(%id, task = %task.name, "intake mirrored to engine");
                self.note_engine_ok(id);
            }
            Err(err) => self.note_engine_failure(id, "complete intake task", &err),
        }
    }
}
