//! # Meridian Validator
//!
//! This crate runs the data-quality checks over the raw price rows and the derived
//! metric rows of a pipeline run, and produces the rows of the `data_quality_log`.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** No storage, no I/O. The caller hands in slices and receives
//!   `ValidationResult` rows back; persisting them is the pipeline's job.
//! - **Check Isolation:** Every check runs on its own. A check that errors or panics is
//!   recorded as a `FAIL` for that check and the remaining checks still run.
//! - **Extensibility:** Adding a check means creating a module under `checks`,
//!   implementing the `Check` trait, and registering it in `with_default_checks`.
//!
//! ## Public API
//!
//! - `Check`: the trait every data-quality check implements.
//! - `Validator`: the ordered registry of checks and the entry point for a run.
//! - `ValidationContext` / `Finding`: the input a check sees and the outcome it reports.
//! - `ValidationError`: the failures a check can return instead of findings.

pub mod checks;
pub mod context;
pub mod error;

pub use context::{Finding, ValidationContext};
pub use error::ValidationError;

use chrono::Utc;
use configuration::ValidationParams;
use core_types::{CheckStatus, ValidationResult};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use uuid::Uuid;

/// The core trait that all data-quality checks implement.
///
/// A check inspects the context and returns at least one `Finding`. Returning several
/// findings lets one check report independent defect classes separately.
/// The `Send + Sync` bounds allow one validator to be shared by concurrent runs.
pub trait Check: Send + Sync {
    /// Stable identifier written to `data_quality_log.check_name`.
    fn name(&self) -> &'static str;

    fn run(&self, ctx: &ValidationContext<'_>) -> Result<Vec<Finding>, ValidationError>;
}

/// An ordered collection of checks executed as one validator invocation.
#[derive(Default)]
pub struct Validator {
    checks: Vec<Box<dyn Check>>,
}

impl Validator {
    /// An empty validator. Use `register` to add checks.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in checks, configured from the validation section.
    pub fn with_default_checks(params: &ValidationParams) -> Self {
        let mut validator = Self::new();
        validator
            .register(checks::MissingDates::new(params.max_gap_days))
            .register(checks::NullOrInvalidPrice::new())
            .register(checks::StaleSeries::new(params.stale_after_days))
            .register(checks::MetricSanity::new(params.beta_min, params.beta_max))
            .register(checks::BenchmarkPresent::new())
            .register(checks::DuplicateKeys::new())
            .register(checks::ReturnSanity::new(params.return_sanity_limit));
        validator
    }

    pub fn register(&mut self, check: impl Check + 'static) -> &mut Self {
        self.checks.push(Box::new(check));
        self
    }

    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Runs every registered check in order and stamps each finding with `run_id`.
    ///
    /// Always yields at least one row per check.
    pub fn run(&self, run_id: Uuid, ctx: &ValidationContext<'_>) -> Vec<ValidationResult> {
        let mut results = Vec::new();

        for check in &self.checks {
            let name = check.name();
            let outcome =
                catch_unwind(AssertUnwindSafe(|| check.run(ctx))).unwrap_or_else(|payload| {
                    Err(ValidationError::Panicked(panic_message(payload.as_ref())))
                });

            let findings = match outcome {
                Ok(findings) if findings.is_empty() => {
                    vec![Finding::fail("Check produced no findings")]
                }
                Ok(findings) => findings,
                Err(e) => {
                    tracing::error!(check = name, error = %e, "Check could not complete.");
                    vec![Finding::fail(format!("Check could not complete: {e}"))]
                }
            };

            let timestamp = Utc::now();
            for finding in findings {
                if finding.status == CheckStatus::Fail {
                    tracing::warn!(
                        check = name,
                        details = %finding.details,
                        "Data-quality check failed."
                    );
                } else {
                    tracing::debug!(
                        check = name,
                        details = %finding.details,
                        "Data-quality check passed."
                    );
                }
                results.push(ValidationResult {
                    run_id,
                    check_name: name.to_string(),
                    status: finding.status,
                    details: finding.details,
                    timestamp,
                });
            }
        }

        let failed = results.iter().filter(|r| r.status.is_fail()).count();
        tracing::info!(%run_id, checks = self.checks.len(), failed, "Validation run complete.");
        results
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::fixtures::{at, bar, metric};
    use core_types::{PricePoint, ReturnMetric};

    struct AlwaysErrors;
    impl Check for AlwaysErrors {
        fn name(&self) -> &'static str {
            "always_errors"
        }
        fn run(&self, _ctx: &ValidationContext<'_>) -> Result<Vec<Finding>, ValidationError> {
            Err(ValidationError::MissingInput("anything"))
        }
    }

    struct Panics;
    impl Check for Panics {
        fn name(&self) -> &'static str {
            "panics"
        }
        fn run(&self, _ctx: &ValidationContext<'_>) -> Result<Vec<Finding>, ValidationError> {
            panic!("boom")
        }
    }

    struct Silent;
    impl Check for Silent {
        fn name(&self) -> &'static str {
            "silent"
        }
        fn run(&self, _ctx: &ValidationContext<'_>) -> Result<Vec<Finding>, ValidationError> {
            Ok(Vec::new())
        }
    }

    fn clean_inputs() -> (Vec<PricePoint>, Vec<ReturnMetric>) {
        let mut raw = Vec::new();
        let mut metrics = Vec::new();
        for d in 1..=5 {
            raw.push(bar("SPY", d, 400.0 + d as f64));
            raw.push(bar("AAPL", d, 150.0 + d as f64));
            metrics.push(metric("SPY", d));
            metrics.push(metric("AAPL", d));
        }
        (raw, metrics)
    }

    fn default_validator() -> Validator {
        Validator::with_default_checks(&ValidationParams::default())
    }

    #[test]
    fn default_registry_order() {
        assert_eq!(
            default_validator().check_names(),
            vec![
                "missing_dates",
                "null_or_invalid_price",
                "stale_series",
                "metric_sanity",
                "benchmark_present",
                "duplicate_keys",
                "return_sanity",
            ]
        );
    }

    #[test]
    fn clean_data_passes_every_check() {
        let (raw, metrics) = clean_inputs();
        let tickers = vec!["AAPL".to_string(), "SPY".to_string()];
        let ctx = ValidationContext::new(at(6), &tickers, "SPY")
            .with_raw(&raw)
            .with_metrics(&metrics);
        let run_id = Uuid::new_v4();

        let results = default_validator().run(run_id, &ctx);
        assert_eq!(results.len(), 7);
        for r in &results {
            assert_eq!(r.status, CheckStatus::Pass, "{}: {}", r.check_name, r.details);
            assert_eq!(r.run_id, run_id);
        }
    }

    #[test]
    fn missing_benchmark_fails_only_its_check() {
        let (raw, metrics) = clean_inputs();
        let raw: Vec<_> = raw.into_iter().filter(|r| r.ticker != "SPY").collect();
        let metrics: Vec<_> = metrics.into_iter().filter(|m| m.ticker != "SPY").collect();
        let tickers = vec!["AAPL".to_string()];
        let ctx = ValidationContext::new(at(6), &tickers, "SPY")
            .with_raw(&raw)
            .with_metrics(&metrics);

        let results = default_validator().run(Uuid::new_v4(), &ctx);
        let failed: Vec<_> = results.iter().filter(|r| r.status.is_fail()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].check_name, "benchmark_present");
        assert!(failed[0].details.contains("SPY"));
    }

    #[test]
    fn broken_checks_fail_in_isolation() {
        let (raw, metrics) = clean_inputs();
        let tickers = vec!["AAPL".to_string(), "SPY".to_string()];
        let ctx = ValidationContext::new(at(6), &tickers, "SPY")
            .with_raw(&raw)
            .with_metrics(&metrics);

        let mut validator = Validator::new();
        validator
            .register(AlwaysErrors)
            .register(Panics)
            .register(Silent)
            .register(checks::DuplicateKeys::new());

        let results = validator.run(Uuid::new_v4(), &ctx);
        let statuses: Vec<_> = results.iter().map(|r| (r.check_name.as_str(), r.status)).collect();
        assert_eq!(
            statuses,
            vec![
                ("always_errors", CheckStatus::Fail),
                ("panics", CheckStatus::Fail),
                ("silent", CheckStatus::Fail),
                ("duplicate_keys", CheckStatus::Pass),
            ]
        );
        assert!(results[1].details.contains("boom"));
    }

    #[test]
    fn missing_metrics_fail_the_checks_that_need_them() {
        let (raw, _) = clean_inputs();
        let tickers = vec!["AAPL".to_string(), "SPY".to_string()];
        let ctx = ValidationContext::new(at(6), &tickers, "SPY").with_raw(&raw);

        let results = default_validator().run(Uuid::new_v4(), &ctx);
        let failed: Vec<_> = results
            .iter()
            .filter(|r| r.status.is_fail())
            .map(|r| r.check_name.as_str())
            .collect();
        assert_eq!(failed, vec!["metric_sanity", "return_sanity"]);
    }
}
