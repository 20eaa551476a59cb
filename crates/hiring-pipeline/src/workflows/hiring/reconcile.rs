//! Pulls engine state back into the store.
//!
//! Engine variables carry each role's decision. Those are copied onto the local
//! approvals whenever they differ. Status is only derived from the engine while the
//! local record is still in a phase the engine drives, so local decisions that already
//! moved the record further are never rolled back.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::domain::{
    ApplicationId, ApplicationRecord, ApplicationStatus, ApprovalRecord, ApprovalRole, Decision,
};
use super::engine::{
    EngineAdapter, EngineError, EngineInstance, Variables, COMPANY_MANAGER_TASK, HEAD_HR_TASK,
    HR_REVIEW_TASK, PROJECT_MANAGER_TASK, TEAM_LEAD_TASK,
};
use super::gates;
use super::lifecycle::{HiringError, HiringLifecycle};
use super::notify::HireNotifier;

/// What one instance looked like when it was read.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineSignal {
    Active {
        variables: Variables,
        task_name: Option<String>,
    },
    Finished {
        variables: Variables,
    },
}

impl EngineSignal {
    pub fn variables(&self) -> &Variables {
        match self {
            EngineSignal::Active { variables, .. } | EngineSignal::Finished { variables } => {
                variables
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub active_synced: usize,
    pub finished_synced: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failures: usize,
}

enum SyncOutcome {
    Changed,
    Unchanged,
    Skipped,
    Failed,
}

/// Review task names in match order, paired with the status a live task implies.
const TASK_STATUSES: [(&str, ApplicationStatus); 5] = [
    (HR_REVIEW_TASK, ApplicationStatus::PendingHrReview),
    (TEAM_LEAD_TASK, ApplicationStatus::PendingTlReview),
    (PROJECT_MANAGER_TASK, ApplicationStatus::PendingPmReview),
    (HEAD_HR_TASK, ApplicationStatus::PendingHeadHrReview),
    (COMPANY_MANAGER_TASK, ApplicationStatus::PendingCompanyManagerReview),
];

/// Maps a live review task onto the status it implies. Engines may decorate task names,
/// so the first known name contained in `task_name` wins. Other tasks imply nothing.
pub fn status_from_task_name(task_name: &str) -> Option<ApplicationStatus> {
    TASK_STATUSES
        .iter()
        .find(|(name, _)| task_name.contains(name))
        .map(|(_, status)| *status)
}

fn engine_decision(variables: &Variables, role: ApprovalRole) -> Option<Decision> {
    variables
        .get(&role.decision_key())
        .and_then(Decision::from_engine)
        .filter(|decision| *decision != Decision::Pending)
}

/// Status of a finished instance, read from the furthest gate that recorded a decision.
pub fn final_status(variables: &Variables) -> ApplicationStatus {
    if let Some(decision) = engine_decision(variables, ApprovalRole::CompanyManager) {
        return match decision {
            Decision::Accept => ApplicationStatus::Accepted,
            _ => ApplicationStatus::RejectedByCompanyManager,
        };
    }
    if let Some(decision) = engine_decision(variables, ApprovalRole::HeadHr) {
        return match decision {
            Decision::Accept => ApplicationStatus::PendingCompanyManagerReview,
            _ => ApplicationStatus::RejectedByHeadHr,
        };
    }

    let team_lead = engine_decision(variables, ApprovalRole::TeamLead).unwrap_or(Decision::Pending);
    let project_manager =
        engine_decision(variables, ApprovalRole::ProjectManager).unwrap_or(Decision::Pending);
    if let Some(status) = gates::parallel_join(team_lead, project_manager) {
        return status;
    }

    match engine_decision(variables, ApprovalRole::Hr) {
        Some(Decision::Accept) => ApplicationStatus::HrApproved,
        Some(_) => ApplicationStatus::RejectedByHr,
        None => ApplicationStatus::Completed,
    }
}

/// Rebuilds a role's approval from engine variables; `None` when the engine holds no
/// decision for it.
pub fn approval_from_variables(variables: &Variables, role: ApprovalRole) -> Option<ApprovalRecord> {
    let decision = engine_decision(variables, role)?;
    let comments = variables
        .get(&role.comments_key())
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string);
    let extra = role
        .extra_keys()
        .iter()
        .filter_map(|key| {
            variables
                .get(*key)
                .map(|value| ((*key).to_string(), value.clone()))
        })
        .collect();
    Some(ApprovalRecord {
        decision,
        comments,
        extra,
    })
}

/// Folds one engine reading into a record. Returns whether anything changed; the
/// update timestamp only moves when it did.
pub fn apply_signal(
    record: &mut ApplicationRecord,
    signal: &EngineSignal,
    now: DateTime<Utc>,
) -> bool {
    let mut changed = false;

    for role in ApprovalRole::ALL {
        if let Some(approval) = approval_from_variables(signal.variables(), role) {
            if record.approvals.get(&role) != Some(&approval) {
                record.approvals.insert(role, approval);
                changed = true;
            }
        }
    }

    let derivable =
        !record.status.is_terminal() && record.status.follows_engine() && !record.engine.degraded;
    if derivable {
        let candidate = match signal {
            EngineSignal::Active { task_name, .. } => {
                task_name.as_deref().and_then(status_from_task_name)
            }
            EngineSignal::Finished { variables } => Some(final_status(variables)),
        };
        if let Some(candidate) = candidate {
            let skips_bypassed_gate = record.bypassed_approvals() && candidate.is_bypassed_gate();
            if !skips_bypassed_gate && candidate != record.status {
                record.status = candidate;
                if !candidate.is_intake() {
                    record.current_step = None;
                }
                changed = true;
            }
        }
    }

    if matches!(signal, EngineSignal::Finished { .. }) && record.engine.process_ended != Some(true)
    {
        record.engine.process_ended = Some(true);
        changed = true;
    }

    if changed {
        record.last_updated_at = now;
    }
    changed
}

impl<E, N> HiringLifecycle<E, N>
where
    E: EngineAdapter + 'static,
    N: HireNotifier + 'static,
{
    /// Syncs every active and finished engine instance of the hiring process back into
    /// the store. Engine outages are logged and counted, never raised.
    pub fn reconcile(&self) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        match self.engine.list_active_instances(&self.process_key) {
            Ok(instances) => {
                for entry in &instances {
                    let outcome = self.sync_instance(entry, || {
                        let variables = self.engine.live_variables(&entry.instance)?;
                        let task_name = self.engine.active_task_name(&entry.instance)?;
                        Ok(EngineSignal::Active {
                            variables,
                            task_name,
                        })
                    });
                    report.tally(outcome, true);
                }
            }
            Err(err) => {
                warn!(error = %err, "could not list active engine instances");
                report.failures += 1;
            }
        }

        match self.engine.list_finished_instances(&self.process_key) {
            Ok(instances) => {
                for entry in &instances {
                    let outcome = self.sync_instance(entry, || {
                        let variables = self.engine.final_variables(&entry.instance)?;
                        Ok(EngineSignal::Finished { variables })
                    });
                    report.tally(outcome, false);
                }
            }
            Err(err) => {
                warn!(error = %err, "could not list finished engine instances");
                report.failures += 1;
            }
        }

        if report.active_synced + report.finished_synced > 0 || report.failures > 0 {
            info!(
                active = report.active_synced,
                finished = report.finished_synced,
                failures = report.failures,
                "reconciled applications with engine"
            );
        }
        report
    }

    fn sync_instance<F>(&self, entry: &EngineInstance, read: F) -> SyncOutcome
    where
        F: FnOnce() -> Result<EngineSignal, EngineError>,
    {
        let Some(id) = entry
            .business_key
            .as_deref()
            .map(|key| ApplicationId(key.to_string()))
        else {
            return SyncOutcome::Skipped;
        };
        let mirrors = |record: &ApplicationRecord| {
            record.engine.instance.as_ref() == Some(&entry.instance)
        };
        match self.store.get(&id) {
            Some(record) if mirrors(&record) => {}
            _ => {
                debug!(%id, instance = %entry.instance.0, "engine instance has no local mirror");
                return SyncOutcome::Skipped;
            }
        }

        let signal = match read() {
            Ok(signal) => signal,
            Err(err) => {
                warn!(%id, instance = %entry.instance.0, error = %err, "could not read engine instance");
                return SyncOutcome::Failed;
            }
        };

        let now = Utc::now();
        let result: Result<bool, HiringError> = self.store.update(&id, |record| {
            Ok(mirrors(record) && apply_signal(record, &signal, now))
        });
        match result {
            Ok(true) => {
                debug!(%id, "application updated from engine");
                SyncOutcome::Changed
            }
            Ok(false) => SyncOutcome::Unchanged,
            Err(_) => SyncOutcome::Skipped,
        }
    }
}

impl ReconcileReport {
    fn tally(&mut self, outcome: SyncOutcome, active: bool) {
        match outcome {
            SyncOutcome::Changed if active => self.active_synced += 1,
            SyncOutcome::Changed => self.finished_synced += 1,
            SyncOutcome::Unchanged => self.unchanged += 1,
            SyncOutcome::Skipped => self.skipped += 1,
            SyncOutcome::Failed => self.failures += 1,
        }
    }
}
