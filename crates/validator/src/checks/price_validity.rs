use crate::context::{Finding, ValidationContext, summarize};
use crate::error::ValidationError;
use crate::Check;
use core_types::{PricePoint, PriceViolation};
use std::collections::BTreeMap;

/// The classes a price violation is reported under; one FAIL per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ViolationClass {
    MissingOrNonPositive,
    InconsistentRange,
    NegativeVolume,
}

impl ViolationClass {
    fn of(violation: PriceViolation) -> Self {
        match violation {
            PriceViolation::NonFinitePrice | PriceViolation::NonPositivePrice => {
                ViolationClass::MissingOrNonPositive
            }
            PriceViolation::NegativeVolume => ViolationClass::NegativeVolume,
            PriceViolation::InvertedRange
            | PriceViolation::OpenOutsideRange
            | PriceViolation::CloseOutsideRange => ViolationClass::InconsistentRange,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ViolationClass::MissingOrNonPositive => "missing or non-positive prices",
            ViolationClass::InconsistentRange => "inconsistent OHLC range",
            ViolationClass::NegativeVolume => "negative volume",
        }
    }
}

/// Fails when any raw row breaks the `PricePoint` invariants.
#[derive(Debug, Clone, Default)]
pub struct NullOrInvalidPrice;

impl NullOrInvalidPrice {
    pub fn new() -> Self {
        Self
    }
}

impl Check for NullOrInvalidPrice {
    fn name(&self) -> &'static str {
        "null_or_invalid_price"
    }

    fn run(&self, ctx: &ValidationContext<'_>) -> Result<Vec<Finding>, ValidationError> {
        let raw = ctx.require_raw()?;

        let mut by_class: BTreeMap<ViolationClass, Vec<String>> = BTreeMap::new();
        for row in raw {
            let violations = row.violations();
            let mut classes: Vec<ViolationClass> =
                violations.iter().map(|v| ViolationClass::of(*v)).collect();
            classes.dedup();
            for class in classes {
                let reasons: Vec<&str> = violations
                    .iter()
                    .filter(|v| ViolationClass::of(**v) == class)
                    .map(PriceViolation::describe)
                    .collect();
                by_class
                    .entry(class)
                    .or_default()
                    .push(describe_row(row, &reasons));
            }
        }

        if by_class.is_empty() {
            return Ok(vec![Finding::pass(format!(
                "All {} raw rows satisfy the price invariants",
                raw.len()
            ))]);
        }

        Ok(by_class
            .into_iter()
            .map(|(class, rows)| {
                Finding::fail(format!(
                    "{} row(s) with {}: {}",
                    rows.len(),
                    class.label(),
                    summarize(&rows)
                ))
            })
            .collect())
    }
}

fn describe_row(row: &PricePoint, reasons: &[&str]) -> String {
    format!("{} {} ({})", row.ticker, row.date, reasons.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::fixtures::{at, bar};
    use core_types::CheckStatus;

    fn run(raw: &[PricePoint]) -> Vec<Finding> {
        let tickers = vec!["X".to_string()];
        let ctx = ValidationContext::new(at(10), &tickers, "SPY").with_raw(raw);
        NullOrInvalidPrice::new().run(&ctx).unwrap()
    }

    #[test]
    fn clean_rows_pass_once() {
        let raw: Vec<_> = (1..=5).map(|d| bar("X", d, 10.0)).collect();
        let findings = run(&raw);
        assert_eq!(findings, vec![Finding::pass("All 5 raw rows satisfy the price invariants")]);
    }

    #[test]
    fn high_below_low_yields_a_single_failure_naming_the_date() {
        let mut raw: Vec<_> = (1..=5).map(|d| bar("X", d, 100.0)).collect();
        raw[2].high = 99.0;
        raw[2].low = 100.0;

        let findings = run(&raw);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].status, CheckStatus::Fail);
        assert!(findings[0].details.contains("X 2024-03-03"));
        assert!(findings[0].details.contains("high below low"));
    }

    #[test]
    fn one_failure_per_violation_class_not_per_row() {
        let mut raw: Vec<_> = (1..=6).map(|d| bar("X", d, 100.0)).collect();
        raw[0].adj_close = 0.0;
        raw[1].adj_close = -3.0;
        raw[2].close = f64::NAN;
        raw[3].open = 150.0;
        raw[4].volume = -1;

        let findings = run(&raw);
        assert_eq!(findings.len(), 3);
        assert!(findings.iter().all(|f| f.status == CheckStatus::Fail));
        assert!(findings[0].details.starts_with("3 row(s) with missing or non-positive prices"));
        assert!(findings[1].details.starts_with("1 row(s) with inconsistent OHLC range"));
        assert!(findings[2].details.starts_with("1 row(s) with negative volume"));
    }
}
