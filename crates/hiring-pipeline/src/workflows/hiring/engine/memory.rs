use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use super::{
    EngineAdapter, EngineError, EngineInstance, InstanceRef, TaskRef, Variables,
    CANDIDATE_ONBOARDING_TASK, COMPANY_MANAGER_TASK, HEAD_HR_TASK, HR_ONBOARDING_TASK,
    HR_REVIEW_TASK, INTAKE_TASK, PROJECT_MANAGER_TASK, TEAM_LEAD_TASK,
};

/// Process-local engine stub that scripts the recruitment process.
///
/// Instances begin with the intake task; completing it routes to HR review, or straight
/// to the company manager when `hasValidReferral` is set. HR acceptance fans out to the
/// parallel team lead and project manager reviews, which join into head HR review once
/// both accept. Any rejection ends the instance. Ended instances keep their variables as
/// history. Fault switches let tests exercise degraded mirrors.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    state: Mutex<EngineState>,
    fail_starts: AtomicBool,
    fail_completions: AtomicBool,
    fail_queries: AtomicBool,
}

#[derive(Debug, Default)]
struct EngineState {
    next_id: u64,
    instances: BTreeMap<InstanceRef, ProcessState>,
}

#[derive(Debug)]
struct ProcessState {
    process_key: String,
    business_key: String,
    variables: Variables,
    tasks: Vec<TaskRef>,
    ended: bool,
}

impl EngineState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn spawn_task(&mut self, instance: &InstanceRef, name: &str) {
        let id = self.next_id("task");
        if let Some(process) = self.instances.get_mut(instance) {
            process.tasks.push(TaskRef {
                id,
                name: name.to_string(),
            });
        }
    }
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_starts(&self, fail: bool) {
        self.fail_starts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_completions(&self, fail: bool) {
        self.fail_completions.store(fail, Ordering::SeqCst);
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Names of the live tasks, in creation order.
    pub fn task_names(&self, instance: &InstanceRef) -> Vec<String> {
        self.lock()
            .instances
            .get(instance)
            .map(|process| process.tasks.iter().map(|task| task.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Writes a variable directly, as an engine-side form or script would.
    pub fn set_variable(&self, instance: &InstanceRef, key: &str, value: Value) {
        if let Some(process) = self.lock().instances.get_mut(instance) {
            process.variables.insert(key.to_string(), value);
        }
    }

    /// Ends an instance immediately, keeping its variables as history.
    pub fn terminate(&self, instance: &InstanceRef) {
        if let Some(process) = self.lock().instances.get_mut(instance) {
            process.tasks.clear();
            process.ended = true;
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_queries(&self) -> Result<(), EngineError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(EngineError::Unavailable("query endpoint down".to_string()));
        }
        Ok(())
    }

    fn instances(&self, process_key: &str, ended: bool) -> Vec<EngineInstance> {
        self.lock()
            .instances
            .iter()
            .filter(|(_, process)| process.process_key == process_key && process.ended == ended)
            .map(|(instance, process)| EngineInstance {
                instance: instance.clone(),
                business_key: Some(process.business_key.clone()),
            })
            .collect()
    }
}

fn decision_is(variables: &Variables, key: &str, expected: &str) -> bool {
    variables.get(key).and_then(Value::as_str) == Some(expected)
}

fn route_after(state: &mut EngineState, instance: &InstanceRef, completed: &str) {
    let Some(process) = state.instances.get(instance) else {
        return;
    };
    let variables = &process.variables;
    let next: Option<Vec<&str>> = match completed {
        INTAKE_TASK => {
            if variables.get("hasValidReferral").and_then(Value::as_bool) == Some(true) {
                Some(vec![COMPANY_MANAGER_TASK])
            } else {
                Some(vec![HR_REVIEW_TASK])
            }
        }
        HR_REVIEW_TASK if decision_is(variables, "hrDecision", "accept") => {
            Some(vec![TEAM_LEAD_TASK, PROJECT_MANAGER_TASK])
        }
        TEAM_LEAD_TASK | PROJECT_MANAGER_TASK => {
            if decision_is(variables, "tlDecision", "reject")
                || decision_is(variables, "pmDecision", "reject")
            {
                None
            } else if decision_is(variables, "tlDecision", "accept")
                && decision_is(variables, "pmDecision", "accept")
            {
                Some(vec![HEAD_HR_TASK])
            } else {
                Some(Vec::new())
            }
        }
        HEAD_HR_TASK if decision_is(variables, "headHRDecision", "accept") => {
            Some(vec![COMPANY_MANAGER_TASK])
        }
        COMPANY_MANAGER_TASK if decision_is(variables, "companyManagerDecision", "accept") => {
            Some(vec![HR_ONBOARDING_TASK])
        }
        HR_ONBOARDING_TASK if decision_is(variables, "hrDecision", "onboarding") => {
            Some(vec![CANDIDATE_ONBOARDING_TASK])
        }
        _ => None,
    };

    match next {
        Some(tasks) => {
            for name in tasks {
                state.spawn_task(instance, name);
            }
            if let Some(process) = state.instances.get_mut(instance) {
                if process.tasks.is_empty() {
                    process.ended = true;
                }
            }
        }
        None => {
            if let Some(process) = state.instances.get_mut(instance) {
                process.tasks.clear();
                process.ended = true;
            }
        }
    }
}

impl EngineAdapter for InMemoryEngine {
    fn start_instance(
        &self,
        process_key: &str,
        business_key: &str,
        variables: Variables,
    ) -> Result<InstanceRef, EngineError> {
        if self.fail_starts.load(Ordering::SeqCst) {
            return Err(EngineError::Unavailable(format!(
                "cannot deploy process '{process_key}'"
            )));
        }

        let mut state = self.lock();
        let instance = InstanceRef(state.next_id("proc"));
        state.instances.insert(
            instance.clone(),
            ProcessState {
                process_key: process_key.to_string(),
                business_key: business_key.to_string(),
                variables,
                tasks: Vec::new(),
                ended: false,
            },
        );
        state.spawn_task(&instance, INTAKE_TASK);
        Ok(instance)
    }

    fn active_tasks(&self, instance: &InstanceRef) -> Result<Vec<TaskRef>, EngineError> {
        self.check_queries()?;
        let state = self.lock();
        let process = state
            .instances
            .get(instance)
            .ok_or_else(|| EngineError::InstanceNotFound(instance.0.clone()))?;
        Ok(process.tasks.clone())
    }

    fn complete_task(&self, task: &TaskRef, variables: Variables) -> Result<(), EngineError> {
        if self.fail_completions.load(Ordering::SeqCst) {
            return Err(EngineError::Unavailable(format!(
                "cannot complete task {}",
                task.id
            )));
        }

        let mut state = self.lock();
        let (instance, completed) = state
            .instances
            .iter_mut()
            .find_map(|(instance, process)| {
                let position = process.tasks.iter().position(|live| live.id == task.id)?;
                let completed = process.tasks.remove(position);
                process.variables.extend(variables.clone());
                Some((instance.clone(), completed))
            })
            .ok_or_else(|| EngineError::TaskNotFound(task.id.clone()))?;

        route_after(&mut state, &instance, &completed.name);
        Ok(())
    }

    fn list_active_instances(&self, process_key: &str) -> Result<Vec<EngineInstance>, EngineError> {
        self.check_queries()?;
        Ok(self.instances(process_key, false))
    }

    fn live_variables(&self, instance: &InstanceRef) -> Result<Variables, EngineError> {
        self.check_queries()?;
        let state = self.lock();
        match state.instances.get(instance) {
            Some(process) if !process.ended => Ok(process.variables.clone()),
            _ => Err(EngineError::InstanceNotFound(instance.0.clone())),
        }
    }

    fn list_finished_instances(
        &self,
        process_key: &str,
    ) -> Result<Vec<EngineInstance>, EngineError> {
        self.check_queries()?;
        Ok(self.instances(process_key, true))
    }

    fn final_variables(&self, instance: &InstanceRef) -> Result<Variables, EngineError> {
        self.check_queries()?;
        let state = self.lock();
        match state.instances.get(instance) {
            Some(process) if process.ended => Ok(process.variables.clone()),
            _ => Err(EngineError::InstanceNotFound(instance.0.clone())),
        }
    }

    fn is_active(&self, instance: &InstanceRef) -> Result<bool, EngineError> {
        self.check_queries()?;
        Ok(self
            .lock()
            .instances
            .get(instance)
            .is_some_and(|process| !process.ended))
    }
}
