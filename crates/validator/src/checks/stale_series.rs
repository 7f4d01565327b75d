use crate::context::{Finding, ValidationContext, summarize};
use crate::error::ValidationError;
use crate::Check;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Fails when a tracked ticker's latest observation is older than the freshness threshold.
///
/// A tracked ticker with no rows at all is reported as stale too.
#[derive(Debug, Clone)]
pub struct StaleSeries {
    stale_after_days: i64,
}

impl StaleSeries {
    pub fn new(stale_after_days: i64) -> Self {
        Self { stale_after_days }
    }
}

impl Check for StaleSeries {
    fn name(&self) -> &'static str {
        "stale_series"
    }

    fn run(&self, ctx: &ValidationContext<'_>) -> Result<Vec<Finding>, ValidationError> {
        let mut latest: BTreeMap<&str, NaiveDate> = BTreeMap::new();
        for row in ctx.raw {
            let entry = latest.entry(row.ticker.as_str()).or_insert(row.date);
            if row.date > *entry {
                *entry = row.date;
            }
        }

        let today = ctx.as_of_date();
        let mut stale = Vec::new();
        for ticker in ctx.tracked_tickers {
            match latest.get(ticker.as_str()) {
                None => stale.push(format!("{ticker} (no observations)")),
                Some(last) => {
                    let age = (today - *last).num_days();
                    if age > self.stale_after_days {
                        stale.push(format!("{ticker} (last {last}, {age} days old)"));
                    }
                }
            }
        }

        if stale.is_empty() {
            return Ok(vec![Finding::pass(format!(
                "All {} tracked tickers observed within {} days of {today}",
                ctx.tracked_tickers.len(),
                self.stale_after_days
            ))]);
        }
        Ok(vec![Finding::fail(format!(
            "{} stale series as of {today}: {}",
            stale.len(),
            summarize(&stale)
        ))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::fixtures::{at, bar};
    use core_types::CheckStatus;

    #[test]
    fn fresh_series_pass() {
        let raw = vec![bar("SPY", 8, 1.0), bar("SPY", 10, 1.0), bar("AAPL", 9, 1.0)];
        let tickers = vec!["SPY".to_string(), "AAPL".to_string()];
        let ctx = ValidationContext::new(at(12), &tickers, "SPY").with_raw(&raw);

        let findings = StaleSeries::new(5).run(&ctx).unwrap();
        assert_eq!(findings[0].status, CheckStatus::Pass);
    }

    #[test]
    fn old_and_absent_series_fail_together() {
        let raw = vec![bar("SPY", 20, 1.0), bar("AAPL", 2, 1.0), bar("AAPL", 10, 1.0)];
        let tickers = vec!["SPY".to_string(), "AAPL".to_string(), "MSFT".to_string()];
        let ctx = ValidationContext::new(at(20), &tickers, "SPY").with_raw(&raw);

        let findings = StaleSeries::new(5).run(&ctx).unwrap();
        assert_eq!(findings.len(), 1);
        let details = &findings[0].details;
        assert_eq!(findings[0].status, CheckStatus::Fail);
        assert!(details.starts_with("2 stale series as of 2024-03-20"));
        assert!(details.contains("AAPL (last 2024-03-10, 10 days old)"));
        assert!(details.contains("MSFT (no observations)"));
        assert!(!details.contains("SPY"));
    }
}
