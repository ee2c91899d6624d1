use crate::error::Result;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Prometheus counters for the authorization path
pub struct AuthorizationMetrics {
    pub decisions: IntCounterVec,
    pub decision_latency: Histogram,
    pub role_changes: IntCounterVec,
    pub directory_failures: IntCounter,
    pub catalog_reloads: IntCounterVec,
    pub registry: Registry,
}

impl AuthorizationMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let decisions = IntCounterVec::new(
            Opts::new(
                "adacl_authorization_decisions_total",
                "Authorization decisions by action and outcome",
            ),
            &["action", "outcome"],
        )?;

        let decision_latency = Histogram::with_opts(HistogramOpts::new(
            "adacl_authorization_latency_seconds",
            "Latency of authorization decisions including directory lookups",
        ))?;

        let role_changes = IntCounterVec::new(
            Opts::new("adacl_role_changes_total", "Role grants and revocations"),
            &["operation", "outcome"],
        )?;

        let directory_failures = IntCounter::new(
            "adacl_directory_failures_total",
            "Directory lookups that failed during authorization",
        )?;

        let catalog_reloads = IntCounterVec::new(
            Opts::new("adacl_catalog_reloads_total", "Role catalog reload attempts"),
            &["outcome"],
        )?;

        registry.register(Box::new(decisions.clone()))?;
        registry.register(Box::new(decision_latency.clone()))?;
        registry.register(Box::new(role_changes.clone()))?;
        registry.register(Box::new(directory_failures.clone()))?;
        registry.register(Box::new(catalog_reloads.clone()))?;

        Ok(Self {
            decisions,
            decision_latency,
            role_changes,
            directory_failures,
            catalog_reloads,
            registry,
        })
    }

    pub fn record_decision(&self, action: &str, allowed: bool, elapsed: Duration) {
        let outcome = if allowed { "allow" } else { "deny" };
        self.decisions.with_label_values(&[action, outcome]).inc();
        self.decision_latency.observe(elapsed.as_secs_f64());
    }

    pub fn record_role_change(&self, operation: &str, succeeded: bool) {
        let outcome = if succeeded { "success" } else { "failure" };
        self.role_changes.with_label_values(&[operation, outcome]).inc();
    }

    pub fn record_directory_failure(&self) {
        self.directory_failures.inc();
    }

    pub fn record_reload(&self, succeeded: bool) {
        let outcome = if succeeded { "success" } else { "failure" };
        self.catalog_reloads.with_label_values(&[outcome]).inc();
    }

    /// Text exposition of every registered metric
    pub fn gather_text(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decisions_are_labelled() {
        let metrics = AuthorizationMetrics::new().unwrap();
        metrics.record_decision("Get", true, Duration::from_micros(40));
        metrics.record_decision("Get", false, Duration::from_micros(40));
        metrics.record_decision("Get", false, Duration::from_micros(40));

        assert_eq!(metrics.decisions.with_label_values(&["Get", "allow"]).get(), 1);
        assert_eq!(metrics.decisions.with_label_values(&["Get", "deny"]).get(), 2);
        assert_eq!(metrics.decision_latency.get_sample_count(), 3);
    }

    #[test]
    fn test_gather_text_exposes_counters() {
        let metrics = AuthorizationMetrics::new().unwrap();
        metrics.record_reload(true);
        metrics.record_directory_failure();

        let text = metrics.gather_text().unwrap();
        assert!(text.contains("adacl_catalog_reloads_total"));
        assert!(text.contains("adacl_directory_failures_total 1"));
    }
}
