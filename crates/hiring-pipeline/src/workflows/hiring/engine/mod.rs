//! Boundary to the external workflow engine that mirrors each application.
//!
//! The lifecycle treats the engine as a replica: it starts instances, completes the
//! task matching an approval role, and reads variables back during reconciliation.
//! Every call returns a `Result` so callers decide whether a failure is fatal.

mod memory;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::ApprovalRole;

pub use memory::InMemoryEngine;

/// Process variables exchanged with the engine.
pub type Variables = BTreeMap<String, Value>;

/// Task name of the single intake task every instance starts with.
pub const INTAKE_TASK: &str = "Job Application Intake";
pub const HR_REVIEW_TASK: &str = "HR Application Review";
pub const TEAM_LEAD_TASK: &str = "Team Lead Review";
pub const PROJECT_MANAGER_TASK: &str = "Project Manager Review";
pub const HEAD_HR_TASK: &str = "Head HR Final Review";
pub const COMPANY_MANAGER_TASK: &str = "Company Manager Final Review";
pub const HR_ONBOARDING_TASK: &str = "HR Review - Onboarding";
pub const CANDIDATE_ONBOARDING_TASK: &str = "Candidate Onboarding";

/// Opaque handle to an engine process instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceRef(pub String);

/// A live user task inside an engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: String,
    pub name: String,
}

/// Instance listing entry; the business key is the application id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineInstance {
    pub instance: InstanceRef,
    pub business_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("workflow engine unavailable: {0}")]
    Unavailable(String),
    #[error("engine instance not found: {0}")]
    InstanceNotFound(String),
    #[error("engine task not found: {0}")]
    TaskNotFound(String),
    #[error("engine rejected the request: {0}")]
    Rejected(String),
}

/// Query and completion contract the lifecycle needs from the engine.
pub trait EngineAdapter: Send + Sync {
    fn start_instance(
        &self,
        process_key: &str,
        business_key: &str,
        variables: Variables,
    ) -> Result<InstanceRef, EngineError>;

    fn active_tasks(&self, instance: &InstanceRef) -> Result<Vec<TaskRef>, EngineError>;

    fn complete_task(&self, task: &TaskRef, variables: Variables) -> Result<(), EngineError>;

    fn list_active_instances(&self, process_key: &str) -> Result<Vec<EngineInstance>, EngineError>;

    fn live_variables(&self, instance: &InstanceRef) -> Result<Variables, EngineError>;

    fn list_finished_instances(
        &self,
        process_key: &str,
    ) -> Result<Vec<EngineInstance>, EngineError>;

    fn final_variables(&self, instance: &InstanceRef) -> Result<Variables, EngineError>;

    fn is_active(&self, instance: &InstanceRef) -> Result<bool, EngineError>;

    fn find_active_task_for_role(
        &self,
        instance: &InstanceRef,
        role: ApprovalRole,
    ) -> Result<Option<TaskRef>, EngineError> {
        Ok(self
            .active_tasks(instance)?
            .into_iter()
            .find(|task| role.matches_task(&task.name)))
    }

    fn active_task_name(&self, instance: &InstanceRef) -> Result<Option<String>, EngineError> {
        Ok(self
            .active_tasks(instance)?
            .into_iter()
            .next()
            .map(|task| task.name))
    }
}
