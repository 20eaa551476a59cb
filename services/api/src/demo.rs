use crate::infra::{build_lifecycle, parse_date};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use hiring_pipeline::config::{AppConfig, HiringConfig};
use hiring_pipeline::error::AppError;
use hiring_pipeline::workflows::hiring::{
    ApplicationRecord, ApprovalRole, FieldMap, HireRequest, ReconcileReport, RoleAction,
};
use serde::Serialize;
use serde_json::json;

const REVIEW_ORDER: [&str; 5] = ["hr", "teamlead", "projectmanager", "headhr", "companymanager"];

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Referral code entered on the final intake step
    #[arg(long)]
    pub(crate) referral: Option<String>,
    /// Role that rejects instead of approving (hr, tl, pm, headhr, companymanager)
    #[arg(long)]
    pub(crate) reject_as: Option<String>,
    /// Offered CTC recorded by head HR and the company manager
    #[arg(long, default_value = "18 LPA")]
    pub(crate) offer_ctc: String,
    /// Joining date (YYYY-MM-DD). Defaults to 30 days from today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) joining_date: Option<NaiveDate>,
    /// Department the candidate joins
    #[arg(long, default_value = "Engineering")]
    pub(crate) department: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct DemoSummary {
    pub(crate) timeline: Vec<String>,
    pub(crate) application: ApplicationRecord,
    pub(crate) reconcile: ReconcileReport,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let summary = scripted_run(&config.hiring, &args)?;
    let rendered = serde_json::to_string_pretty(&summary).map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}

pub(crate) fn scripted_run(
    config: &HiringConfig,
    args: &DemoArgs,
) -> Result<DemoSummary, AppError> {
    let lifecycle = build_lifecycle(config);
    let mut timeline = Vec::new();

    let id = lifecycle.start_application()?.application_id;
    timeline.push(format!("started {id}"));

    for step in sample_steps(args.referral.as_deref()) {
        let outcome = lifecycle.submit_step(&id, step)?;
        timeline.push(format!("step {} -> {}", outcome.step_id, outcome.status));
    }

    let rejecting = args
        .reject_as
        .as_deref()
        .and_then(ApprovalRole::parse);
    let bypassed = lifecycle.get(&id)?.bypassed_approvals();
    let roles: &[&str] = if bypassed {
        &REVIEW_ORDER[4..]
    } else {
        &REVIEW_ORDER
    };

    let mut rejected = false;
    for role in roles {
        let outcome = match rejecting.filter(|reject| reject.label() == *role) {
            Some(_) => lifecycle.reject(&id, role, Some("Declined during demo".to_string()))?,
            None => {
                let action = RoleAction {
                    comments: Some(format!("{role} approves")),
                    offer_ctc: Some(args.offer_ctc.clone()),
                };
                lifecycle.approve(&id, role, action)?
            }
        };
        timeline.push(format!(
            "{} {} -> {}",
            outcome.role,
            outcome.decision.as_str(),
            outcome.status
        ));
        if outcome.status.is_rejection() {
            rejected = true;
            break;
        }
    }

    if !rejected {
        let joining_date = args
            .joining_date
            .unwrap_or_else(|| Local::now().date_naive() + Duration::days(30));
        let record = lifecycle.hire_candidate(
            &id,
            HireRequest {
                comments: Some("Offer accepted".to_string()),
                joining_date,
                department: args.department.clone(),
            },
        )?;
        timeline.push(format!("hired -> {}", record.status));
    }

    let reconcile = lifecycle.reconcile();
    Ok(DemoSummary {
        timeline,
        application: lifecycle.get(&id)?,
        reconcile,
    })
}

fn sample_steps(referral: Option<&str>) -> Vec<FieldMap> {
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
            "firstName": "Rohan",
            "lastName": "Mehta",
            "email": "rohan.mehta@example.com",
            "mobileNumber": "9988776655"
        }),
        json!({
            "currentStep": "professional-info",
            "totalExperience": "5 years",
            "skills": "Rust, Tokio, PostgreSQL",
            "noticePeriod": "45 days"
        }),
        json!({
            "currentStep": "education",
            "highestEducation": "B.E. Computer Science"
        }),
        json!({
            "currentStep": "position-details",
            "position": "Senior Backend Engineer",
            "expectedSalaryCTC": "20 LPA"
        }),
        review,
    ]
    .into_iter()
    .filter_map(|value| match value {
        serde_json::Value::Object(map) => Some(map.into_iter().collect()),
        _ => None,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hiring_pipeline::workflows::hiring::ApplicationStatus;

    #[test]
    fn scripted_run_hires_through_every_gate() {
        let summary =
            scripted_run(&HiringConfig::default(), &DemoArgs::default()).expect("demo runs");

        assert_eq!(summary.application.status, ApplicationStatus::Hired);
        assert_eq!(summary.application.approvals.len(), 5);
        assert_eq!(summary.reconcile.failures, 0);
        assert!(summary.timeline.iter().any(|entry| entry.contains("HIRED")));
    }

    #[test]
    fn referral_demo_skips_to_company_manager() {
        let args = DemoArgs {
            referral: Some("REF12345".to_string()),
            ..DemoArgs::default()
        };

        let summary = scripted_run(&HiringConfig::default(), &args).expect("demo runs");

        assert_eq!(summary.application.status, ApplicationStatus::Hired);
        assert_eq!(summary.application.approvals.len(), 1);
    }

    #[test]
    fn rejecting_role_stops_the_pipeline() {
        let args = DemoArgs {
            reject_as: Some("pm".to_string()),
            ..DemoArgs::default()
        };

        let summary = scripted_run(&HiringConfig::default(), &args).expect("demo runs");

        assert_eq!(summary.application.status, ApplicationStatus::RejectedByTlPm);
        assert!(summary.application.hire.is_none());
    }
}
