use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::engine::InstanceRef;

/// Free-form intake and onboarding data keyed by field name. Last write wins.
pub type FieldMap = BTreeMap<String, Value>;

/// Identifier wrapper for job applications.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    /// `APP-<epoch millis>-<8 uppercase hex>`, unique per call.
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis();
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("APP-{millis}-{}", suffix[..8].to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every status an application can be in, from intake through onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Started,
    InProgress,
    PendingHrReview,
    HrApproved,
    PendingTlReview,
    PendingPmReview,
    PendingHeadHrReview,
    PendingCompanyManagerReview,
    PendingHrHiring,
    Accepted,
    Hired,
    OnboardingInitiated,
    OnboardingCompleted,
    Completed,
    RejectedByHr,
    RejectedByTlPm,
    RejectedByHeadHr,
    RejectedByCompanyManager,
    RejectedFinalOnboarding,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 19] = [
        ApplicationStatus::Started,
        ApplicationStatus::InProgress,
        ApplicationStatus::PendingHrReview,
        ApplicationStatus::HrApproved,
        ApplicationStatus::PendingTlReview,
        ApplicationStatus::PendingPmReview,
        ApplicationStatus::PendingHeadHrReview,
        ApplicationStatus::PendingCompanyManagerReview,
        ApplicationStatus::PendingHrHiring,
        ApplicationStatus::Accepted,
        ApplicationStatus::Hired,
        ApplicationStatus::OnboardingInitiated,
        ApplicationStatus::OnboardingCompleted,
        ApplicationStatus::Completed,
        ApplicationStatus::RejectedByHr,
        ApplicationStatus::RejectedByTlPm,
        ApplicationStatus::RejectedByHeadHr,
        ApplicationStatus::RejectedByCompanyManager,
        ApplicationStatus::RejectedFinalOnboarding,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Started => "STARTED",
            ApplicationStatus::InProgress => "IN_PROGRESS",
            ApplicationStatus::PendingHrReview => "PENDING_HR_REVIEW",
            ApplicationStatus::HrApproved => "HR_APPROVED",
            ApplicationStatus::PendingTlReview => "PENDING_TL_REVIEW",
            ApplicationStatus::PendingPmReview => "PENDING_PM_REVIEW",
            ApplicationStatus::PendingHeadHrReview => "PENDING_HEAD_HR_REVIEW",
            ApplicationStatus::PendingCompanyManagerReview => "PENDING_COMPANY_MANAGER_REVIEW",
            ApplicationStatus::PendingHrHiring => "PENDING_HR_HIRING",
            ApplicationStatus::Accepted => "ACCEPTED",
            ApplicationStatus::Hired => "HIRED",
            ApplicationStatus::OnboardingInitiated => "ONBOARDING_INITIATED",
            ApplicationStatus::OnboardingCompleted => "ONBOARDING_COMPLETED",
            ApplicationStatus::Completed => "COMPLETED",
            ApplicationStatus::RejectedByHr => "REJECTED_BY_HR",
            ApplicationStatus::RejectedByTlPm => "REJECTED_BY_TL_PM",
            ApplicationStatus::RejectedByHeadHr => "REJECTED_BY_HEAD_HR",
            ApplicationStatus::RejectedByCompanyManager => "REJECTED_BY_COMPANY_MANAGER",
            ApplicationStatus::RejectedFinalOnboarding => "REJECTED_FINAL_ONBOARDING",
        }
    }

    /// Case-insensitive lookup by label.
    pub fn from_label(raw: &str) -> Option<Self> {
        let wanted = raw.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(wanted))
    }

    pub const fn is_rejection(self) -> bool {
        matches!(
            self,
            ApplicationStatus::RejectedByHr
                | ApplicationStatus::RejectedByTlPm
                | ApplicationStatus::RejectedByHeadHr
                | ApplicationStatus::RejectedByCompanyManager
                | ApplicationStatus::RejectedFinalOnboarding
        )
    }

    /// Terminal statuses are sticky: neither role actions nor reconciliation leave them.
    pub const fn is_terminal(self) -> bool {
        self.is_rejection() || matches!(self, ApplicationStatus::OnboardingCompleted)
    }

    pub const fn is_intake(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Started | ApplicationStatus::InProgress
        )
    }

    /// Statuses the engine mirror is allowed to overwrite during reconciliation.
    pub const fn follows_engine(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Started
                | ApplicationStatus::InProgress
                | ApplicationStatus::PendingHrReview
                | ApplicationStatus::HrApproved
                | ApplicationStatus::PendingTlReview
                | ApplicationStatus::PendingPmReview
                | ApplicationStatus::PendingHeadHrReview
                | ApplicationStatus::PendingCompanyManagerReview
        )
    }

    /// Gates skipped by a referral bypass.
    pub const fn is_bypassed_gate(self) -> bool {
        matches!(
            self,
            ApplicationStatus::PendingHrReview
                | ApplicationStatus::HrApproved
                | ApplicationStatus::PendingTlReview
                | ApplicationStatus::PendingPmReview
                | ApplicationStatus::PendingHeadHrReview
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Approval-gate actors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalRole {
    Hr,
    TeamLead,
    ProjectManager,
    HeadHr,
    CompanyManager,
}

impl ApprovalRole {
    pub const ALL: [ApprovalRole; 5] = [
        ApprovalRole::Hr,
        ApprovalRole::TeamLead,
        ApprovalRole::ProjectManager,
        ApprovalRole::HeadHr,
        ApprovalRole::CompanyManager,
    ];

    /// Accepts the role names callers send, including the `tl`/`pm` short forms.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hr" => Some(ApprovalRole::Hr),
            "teamlead" | "tl" => Some(ApprovalRole::TeamLead),
            "projectmanager" | "pm" => Some(ApprovalRole::ProjectManager),
            "headhr" => Some(ApprovalRole::HeadHr),
            "companymanager" => Some(ApprovalRole::CompanyManager),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ApprovalRole::Hr => "hr",
            ApprovalRole::TeamLead => "teamlead",
            ApprovalRole::ProjectManager => "projectmanager",
            ApprovalRole::HeadHr => "headhr",
            ApprovalRole::CompanyManager => "companymanager",
        }
    }

    /// Prefix of the `{prefix}Decision` / `{prefix}Comments` engine variables.
    pub const fn variable_prefix(self) -> &'static str {
        match self {
            ApprovalRole::Hr => "hr",
            ApprovalRole::TeamLead => "tl",
            ApprovalRole::ProjectManager => "pm",
            ApprovalRole::HeadHr => "headHR",
            ApprovalRole::CompanyManager => "companyManager",
        }
    }

    pub fn decision_key(self) -> String {
        format!("{}Decision", self.variable_prefix())
    }

    pub fn comments_key(self) -> String {
        format!("{}Comments", self.variable_prefix())
    }

    /// Role-specific engine variables carried alongside the decision.
    pub const fn extra_keys(self) -> &'static [&'static str] {
        match self {
            ApprovalRole::Hr => &["interviewRequired"],
            ApprovalRole::HeadHr => &["offerCTC"],
            ApprovalRole::CompanyManager => &["finalOfferCTC"],
            ApprovalRole::TeamLead | ApprovalRole::ProjectManager => &[],
        }
    }

    /// Variable the optional compensation figure of an approval is stored under.
    pub const fn offer_key(self) -> Option<&'static str> {
        match self {
            ApprovalRole::HeadHr => Some("offerCTC"),
            ApprovalRole::CompanyManager => Some("finalOfferCTC"),
            _ => None,
        }
    }

    /// Substrings identifying this role's review task in the engine.
    pub const fn task_name_patterns(self) -> &'static [&'static str] {
        match self {
            ApprovalRole::Hr => &["HR Application Review", "HR Review"],
            ApprovalRole::TeamLead => &["Team Lead Review", "TL Review"],
            ApprovalRole::ProjectManager => &["Project Manager Review", "PM Review"],
            ApprovalRole::HeadHr => &["Head HR Final Review", "Head HR Review"],
            ApprovalRole::CompanyManager => {
                &["Company Manager Final Review", "Company Manager Review"]
            }
        }
    }

    pub fn matches_task(self, task_name: &str) -> bool {
        if self == ApprovalRole::Hr && task_name.contains("Head HR") {
            return false;
        }
        self.task_name_patterns()
            .iter()
            .any(|pattern| task_name.contains(pattern))
    }

    /// Only the company manager may act without a live engine task.
    pub const fn requires_engine_task(self) -> bool {
        !matches!(self, ApprovalRole::CompanyManager)
    }

    pub const fn is_parallel(self) -> bool {
        matches!(self, ApprovalRole::TeamLead | ApprovalRole::ProjectManager)
    }

    /// Whether this role's gate is open while the application sits in `status`.
    /// The parallel pair stays open until their join resolves.
    pub const fn accepts_in(self, status: ApplicationStatus) -> bool {
        if self.is_parallel() {
            return matches!(
                status,
                ApplicationStatus::HrApproved
                    | ApplicationStatus::PendingTlReview
                    | ApplicationStatus::PendingPmReview
            );
        }
        match self {
            ApprovalRole::Hr => matches!(status, ApplicationStatus::PendingHrReview),
            ApprovalRole::HeadHr => matches!(status, ApplicationStatus::PendingHeadHrReview),
            ApprovalRole::CompanyManager => {
                matches!(status, ApplicationStatus::PendingCompanyManagerReview)
            }
            ApprovalRole::TeamLead | ApprovalRole::ProjectManager => false,
        }
    }
}

impl fmt::Display for ApprovalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Pending,
    Accept,
    Reject,
}

impl Decision {
    pub const fn as_str(self) -> &'static str {
        match self {
            Decision::Pending => "pending",
            Decision::Accept => "accept",
            Decision::Reject => "reject",
        }
    }

    /// Reads a decision variable written by the engine; other values (e.g. `onboarding`) yield `None`.
    pub fn from_engine(value: &Value) -> Option<Self> {
        match value.as_str()?.trim().to_ascii_lowercase().as_str() {
            "accept" => Some(Decision::Accept),
            "reject" => Some(Decision::Reject),
            "pending" => Some(Decision::Pending),
            _ => None,
        }
    }
}

/// One role's verdict on an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: FieldMap,
}

/// Referral code captured on the final intake step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralState {
    pub code: String,
    pub valid: bool,
    pub bypass: bool,
}

/// Link to the mirrored engine instance plus its health as seen from this record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineLink {
    pub instance: Option<InstanceRef>,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_ended: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HireDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub joining_date: NaiveDate,
    pub department: String,
    pub hired_at: DateTime<Utc>,
}

/// Outcome of the last hire notification attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationState {
    pub sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalConfirmation {
    pub confirmed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub confirmed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingDetails {
    pub joining_date: NaiveDate,
    pub reporting_manager: String,
    pub department: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub initiated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_confirmation: Option<FinalConfirmation>,
}

/// The authoritative record for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub application_id: ApplicationId,
    pub status: ApplicationStatus,
    pub current_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_completed_step: Option<String>,
    pub fields: FieldMap,
    pub approvals: BTreeMap<ApprovalRole, ApprovalRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral: Option<ReferralState>,
    pub engine: EngineLink,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hire: Option<HireDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hire_notification: Option<NotificationState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarding: Option<OnboardingDetails>,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl ApplicationRecord {
    pub fn new(application_id: ApplicationId, first_step: &str, now: DateTime<Utc>) -> Self {
        Self {
            application_id,
            status: ApplicationStatus::Started,
            current_step: Some(first_step.to_string()),
            last_completed_step: None,
            fields: FieldMap::new(),
            approvals: BTreeMap::new(),
            referral: None,
            engine: EngineLink::default(),
            hire: None,
            hire_notification: None,
            onboarding: None,
            created_at: now,
            last_updated_at: now,
            submitted_at: None,
        }
    }

    pub fn decision(&self, role: ApprovalRole) -> Decision {
        self.approvals
            .get(&role)
            .map(|record| record.decision)
            .unwrap_or(Decision::Pending)
    }

    pub fn bypassed_approvals(&self) -> bool {
        self.referral.as_ref().is_some_and(|referral| referral.bypass)
    }

    pub fn field_text(&self, key: &str) -> Option<String> {
        field_text(&self.fields, key)
    }

    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.application_id.clone(),
            status: self.status.label(),
            current_step: self.current_step.clone(),
            approvals: self
                .approvals
                .iter()
                .map(|(role, record)| (role.label(), record.clone()))
                .collect(),
            referral: self.referral.clone(),
            engine_degraded: self.engine.degraded,
            last_updated_at: self.last_updated_at,
        }
    }

    pub fn hr_summary(&self) -> HrSummary {
        let applicant_name = match (self.field_text("firstName"), self.field_text("lastName")) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(first), None) => Some(first),
            (None, Some(last)) => Some(last),
            (None, None) => None,
        };

        HrSummary {
            application_id: self.application_id.clone(),
            applicant_name,
            email: self.field_text("email"),
            mobile: self.field_text("mobileNumber"),
            position: self.field_text("position"),
            expected_ctc: self.field_text("expectedSalaryCTC"),
            experience: self.field_text("totalExperience"),
            education: self.field_text("highestEducation"),
            skills: self.field_text("skills"),
            notice_period: self.field_text("noticePeriod"),
            status: self.status.label(),
            submitted_at: self.submitted_at,
        }
    }
}

/// Renders scalar field values as text; arrays, objects and nulls yield `None`.
pub fn field_text(fields: &FieldMap, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Sanitized status payload for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub status: &'static str,
    pub current_step: Option<String>,
    pub approvals: BTreeMap<&'static str, ApprovalRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral: Option<ReferralState>,
    pub engine_degraded: bool,
    pub last_updated_at: DateTime<Utc>,
}

/// Applicant digest shown to HR reviewers.
#[derive(Debug, Clone, Serialize)]
pub struct HrSummary {
    pub application_id: ApplicationId,
    pub applicant_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub position: Option<String>,
    pub expected_ctc: Option<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub skills: Option<String>,
    pub notice_period: Option<String>,
    pub status: &'static str,
    pub submitted_at: Option<DateTime<Utc>>,
}
