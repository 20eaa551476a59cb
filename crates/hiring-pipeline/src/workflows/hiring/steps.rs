use std::collections::BTreeSet;

use serde::Serialize;

/// Field collected by an intake step; the requirement flags feed the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRequirement {
    pub key: &'static str,
    pub label: &'static str,
    pub required: bool,
}

/// One page of the intake form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepDefinition {
    pub step_id: &'static str,
    pub title: &'static str,
    pub order: u32,
    pub fields: Vec<FieldRequirement>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("step not found: {0}")]
    UnknownStep(String),
    #[error("no step with order {0}")]
    UnknownOrder(u32),
    #[error("step catalog is empty")]
    Empty,
    #[error("duplicate step id: {0}")]
    DuplicateStep(&'static str),
    #[error("step orders must run 1..={expected} without gaps, found {found}")]
    NonContiguous { expected: u32, found: u32 },
}

/// Ordered, immutable definition of the intake steps.
#[derive(Debug, Clone)]
pub struct StepCatalog {
    steps: Vec<StepDefinition>,
}

impl StepCatalog {
    pub fn new(mut steps: Vec<StepDefinition>) -> Result<Self, CatalogError> {
        if steps.is_empty() {
            return Err(CatalogError::Empty);
        }
        steps.sort_by_key(|step| step.order);

        let mut seen = BTreeSet::new();
        for (index, step) in steps.iter().enumerate() {
            let expected = index as u32 + 1;
            if step.order != expected {
                return Err(CatalogError::NonContiguous {
                    expected,
                    found: step.order,
                });
            }
            if !seen.insert(step.step_id) {
                return Err(CatalogError::DuplicateStep(step.step_id));
            }
        }

        Ok(Self { steps })
    }

    pub fn standard() -> Self {
        Self {
            steps: standard_steps(),
        }
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn first_step(&self) -> &StepDefinition {
        &self.steps[0]
    }

    pub fn step_by_order(&self, order: u32) -> Result<&StepDefinition, CatalogError> {
        self.steps
            .iter()
            .find(|step| step.order == order)
            .ok_or(CatalogError::UnknownOrder(order))
    }

    pub fn step_by_id(&self, step_id: &str) -> Result<&StepDefinition, CatalogError> {
        self.steps
            .iter()
            .find(|step| step.step_id == step_id)
            .ok_or_else(|| CatalogError::UnknownStep(step_id.to_string()))
    }

    pub fn next_step(&self, step_id: &str) -> Result<Option<&StepDefinition>, CatalogError> {
        let current = self.step_by_id(step_id)?;
        Ok(self.steps.iter().find(|step| step.order == current.order + 1))
    }

    pub fn is_last_step(&self, step_id: &str) -> Result<bool, CatalogError> {
        let current = self.step_by_id(step_id)?;
        Ok(!self.steps.iter().any(|step| step.order > current.order))
    }
}

const fn required(key: &'static str, label: &'static str) -> FieldRequirement {
    FieldRequirement {
        key,
        label,
        required: true,
    }
}

const fn optional(key: &'static str, label: &'static str) -> FieldRequirement {
    FieldRequirement {
        key,
        label,
        required: false,
    }
}

fn standard_steps() -> Vec<StepDefinition> {
    vec![
        StepDefinition {
            step_id: "personal-info",
            title: "Personal Information",
            order: 1,
            fields: vec![
                required("firstName", "First name"),
                required("lastName", "Last name"),
                required("email", "Email address"),
                required("mobileNumber", "Mobile number"),
                optional("dateOfBirth", "Date of birth"),
            ],
        },
        StepDefinition {
            step_id: "professional-info",
            title: "Professional Background",
            order: 2,
            fields: vec![
                required("totalExperience", "Total experience (years)"),
                optional("currentCompany", "Current company"),
                required("skills", "Key skills"),
                required("noticePeriod", "Notice period"),
            ],
        },
        StepDefinition {
            step_id: "education",
            title: "Education",
            order: 3,
            fields: vec![
                required("highestEducation", "Highest qualification"),
                optional("university", "University"),
                optional("graduationYear", "Graduation year"),
            ],
        },
        StepDefinition {
            step_id: "position-details",
            title: "Position Details",
            order: 4,
            fields: vec![
                required("position", "Position applied for"),
                required("expectedSalaryCTC", "Expected CTC"),
                optional("preferredLocation", "Preferred location"),
            ],
        },
        StepDefinition {
            step_id: "review-submit",
            title: "Review & Submit",
            order: 5,
            fields: vec![
                required("declarationAccepted", "Declaration accepted"),
                optional("referralId", "Referral code"),
            ],
        },
    ]
}
