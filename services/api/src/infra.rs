use chrono::NaiveDate;
use hiring_pipeline::config::HiringConfig;
use hiring_pipeline::workflows::hiring::{HiringLifecycle, InMemoryEngine, TracingNotifier};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type ServiceLifecycle = HiringLifecycle<InMemoryEngine, TracingNotifier>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Lifecycle wired to the process-local engine and the logging notifier.
pub(crate) fn build_lifecycle(config: &HiringConfig) -> Arc<ServiceLifecycle> {
    Arc::new(HiringLifecycle::new(
        Arc::new(InMemoryEngine::new()),
        Arc::new(TracingNotifier),
        config,
    ))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_iso_dates_only() {
        assert_eq!(
            parse_date(" 2026-11-02 "),
            Ok(NaiveDate::from_ymd_opt(2026, 11, 2).expect("valid date"))
        );
        assert!(parse_date("02/11/2026").is_err());
    }
}
