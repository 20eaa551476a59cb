use tracing::{info, warn};

use super::domain::ApplicationRecord;

/// Outbound hire notification hook. Implementations report failure as `false`, never panic.
pub trait HireNotifier: Send + Sync {
    fn send_hire_notification(&self, application: &ApplicationRecord) -> bool;
}

/// Notifier that records the notification in the log instead of sending mail.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl HireNotifier for TracingNotifier {
    fn send_hire_notification(&self, application: &ApplicationRecord) -> bool {
        let Some(email) = application
            .field_text("email")
            .filter(|email| !email.trim().is_empty())
        else {
            warn!(
                application_id = %application.application_id,
                "hire notification skipped: candidate email missing"
            );
            return false;
        };

        info!(
            application_id = %application.application_id,
            %email,
            position = application.field_text("position").unwrap_or_default(),
            "hire notification dispatched"
        );
        true
    }
}
