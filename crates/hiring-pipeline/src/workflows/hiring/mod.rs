//! Job-application lifecycle with a multi-role approval pipeline.
//!
//! Applications are collected through an ordered set of intake steps, routed through
//! HR, the parallel team lead / project manager pair, head HR and the company manager,
//! then hired and onboarded. Every transition is mirrored onto an external workflow
//! engine through [`EngineAdapter`]; [`HiringLifecycle::reconcile`] pulls engine-side
//! progress back without ever rolling local decisions back.

pub mod domain;
pub mod engine;
pub(crate) mod gates;
pub mod lifecycle;
pub mod notify;
pub mod reconcile;
pub mod referral;
pub mod router;
pub mod steps;
pub mod store;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationId, ApplicationRecord, ApplicationStatus, ApplicationStatusView, ApprovalRecord,
    ApprovalRole, Decision, EngineLink, FieldMap, HrSummary, ReferralState,
};
pub use engine::{EngineAdapter, EngineError, InMemoryEngine, InstanceRef, TaskRef, Variables};
pub use lifecycle::{
    DecisionOutcome, HireRequest, HiringError, HiringLifecycle, OnboardingRequest, RoleAction,
    StepOutcome,
};
pub use notify::{HireNotifier, TracingNotifier};
pub use reconcile::{EngineSignal, ReconcileReport};
pub use referral::ReferralRegistry;
pub use router::hiring_router;
pub use steps::{CatalogError, StepCatalog, StepDefinition};
pub use store::ApplicationStore;
pub use validation::{RequiredFieldValidator, StepValidator, ValidationError};
