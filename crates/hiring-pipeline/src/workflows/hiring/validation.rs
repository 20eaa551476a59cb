use serde_json::Value;

use super::domain::FieldMap;
use super::steps::StepDefinition;

/// Rejected intake data; the message is returned to the caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub step_id: String,
    pub field: Option<String>,
    pub message: String,
}

/// Field-level rules applied to a step submission.
pub trait StepValidator: Send + Sync {
    fn validate(&self, step: &StepDefinition, data: &FieldMap) -> Result<(), ValidationError>;
}

/// Checks that every required field of the step is present and non-blank.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequiredFieldValidator;

impl StepValidator for RequiredFieldValidator {
    fn validate(&self, step: &StepDefinition, data: &FieldMap) -> Result<(), ValidationError> {
        for field in step.fields.iter().filter(|field| field.required) {
            let present = match data.get(field.key) {
                None | Some(Value::Null) => false,
                Some(Value::String(text)) => !text.trim().is_empty(),
                Some(Value::Bool(flag)) => *flag,
                Some(_) => true,
            };
            if !present {
                return Err(ValidationError {
                    step_id: step.step_id.to_string(),
                    field: Some(field.key.to_string()),
                    message: format!("{} is required", field.label),
                });
            }
        }
        Ok(())
    }
}
