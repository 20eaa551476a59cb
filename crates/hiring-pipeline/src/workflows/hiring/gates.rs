use std::collections::BTreeMap;

use super::domain::{ApplicationStatus, ApprovalRecord, ApprovalRole, Decision, ReferralState};
use super::referral::{normalize, ReferralRegistry};

/// Status after `role` records `decision`, given the approvals already on file
/// (including the new one). Team lead and project manager reviews run in parallel:
/// either rejection closes the pair immediately, and the pipeline advances to head HR
/// only once both have accepted. A lone acceptance waits on the other reviewer.
pub fn status_after_decision(
    role: ApprovalRole,
    decision: Decision,
    approvals: &BTreeMap<ApprovalRole, ApprovalRecord>,
    current: ApplicationStatus,
) -> ApplicationStatus {
    match (role, decision) {
        (_, Decision::Pending) => current,
        (ApprovalRole::Hr, Decision::Accept) => ApplicationStatus::HrApproved,
        (ApprovalRole::Hr, Decision::Reject) => ApplicationStatus::RejectedByHr,
        (ApprovalRole::TeamLead | ApprovalRole::ProjectManager, _) => {
            parallel_join(
                decision_of(approvals, ApprovalRole::TeamLead),
                decision_of(approvals, ApprovalRole::ProjectManager),
            )
            .unwrap_or(current)
        }
        (ApprovalRole::HeadHr, Decision::Accept) => ApplicationStatus::PendingCompanyManagerReview,
        (ApprovalRole::HeadHr, Decision::Reject) => ApplicationStatus::RejectedByHeadHr,
        (ApprovalRole::CompanyManager, Decision::Accept) => ApplicationStatus::PendingHrHiring,
        (ApprovalRole::CompanyManager, Decision::Reject) => {
            ApplicationStatus::RejectedByCompanyManager
        }
    }
}

/// Outcome of the team lead / project manager pair, `None` while neither has decided.
pub fn parallel_join(team_lead: Decision, project_manager: Decision) -> Option<ApplicationStatus> {
    match (team_lead, project_manager) {
        (Decision::Reject, _) | (_, Decision::Reject) => Some(ApplicationStatus::RejectedByTlPm),
        (Decision::Accept, Decision::Accept) => Some(ApplicationStatus::PendingHeadHrReview),
        (Decision::Accept, Decision::Pending) => Some(ApplicationStatus::PendingPmReview),
        (Decision::Pending, Decision::Accept) => Some(ApplicationStatus::PendingTlReview),
        (Decision::Pending, Decision::Pending) => None,
    }
}

fn decision_of(
    approvals: &BTreeMap<ApprovalRole, ApprovalRecord>,
    role: ApprovalRole,
) -> Decision {
    approvals
        .get(&role)
        .map(|record| record.decision)
        .unwrap_or(Decision::Pending)
}

/// Result of evaluating the referral code on the final intake step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralGate {
    pub status: ApplicationStatus,
    pub referral: Option<ReferralState>,
}

/// A registered code sends the application straight to the company manager; any other
/// non-blank code is kept for audit, flagged invalid, and takes the normal HR path.
pub fn evaluate_referral(code: Option<&str>, registry: &ReferralRegistry) -> ReferralGate {
    let Some(code) = code.and_then(normalize) else {
        return ReferralGate {
            status: ApplicationStatus::PendingHrReview,
            referral: None,
        };
    };

    if registry.is_valid(&code) {
        ReferralGate {
            status: ApplicationStatus::PendingCompanyManagerReview,
            referral: Some(ReferralState {
                code,
                valid: true,
                bypass: true,
            }),
        }
    } else {
        ReferralGate {
            status: ApplicationStatus::PendingHrReview,
            referral: Some(ReferralState {
                code,
                valid: false,
                bypass: false,
            }),
        }
    }
}
