use crate::context::{Finding, ValidationContext, summarize};
use crate::error::ValidationError;
use crate::Check;

/// Flags single-day moves larger than the configured limit as suspicious.
///
/// Large moves can be genuine; this surfaces them for review rather than asserting an error
/// in the data.
#[derive(Debug, Clone)]
pub struct ReturnSanity {
    limit: f64,
}

impl ReturnSanity {
    pub fn new(limit: f64) -> Self {
        Self { limit }
    }
}

impl Check for ReturnSanity {
    fn name(&self) -> &'static str {
        "return_sanity"
    }

    fn run(&self, ctx: &ValidationContext<'_>) -> Result<Vec<Finding>, ValidationError> {
        let metrics = ctx.require_metrics()?;

        let suspicious: Vec<String> = metrics
            .iter()
            .filter_map(|m| {
                let r = m.return_1d?;
                (r.abs() > self.limit)
                    .then(|| format!("{} {} ({:+.1}%)", m.ticker, m.date, r * 100.0))
            })
            .collect();

        if suspicious.is_empty() {
            return Ok(vec![Finding::pass(format!(
                "No single-day return beyond ±{:.0}% in {} rows",
                self.limit * 100.0,
                metrics.len()
            ))]);
        }
        Ok(vec![Finding::fail(format!(
            "{} single-day return(s) beyond ±{:.0}%: {}",
            suspicious.len(),
            self.limit * 100.0,
            summarize(&suspicious)
        ))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::fixtures::{at, metric};
    use core_types::CheckStatus;

    #[test]
    fn flags_moves_beyond_the_limit_in_either_direction() {
        let mut metrics: Vec<_> = (1..=4).map(|d| metric("X", d)).collect();
        metrics[1].return_1d = Some(0.45);
        metrics[2].return_1d = Some(-0.31);
        metrics[3].return_1d = None;
        let tickers = vec!["X".to_string()];
        let ctx = ValidationContext::new(at(5), &tickers, "SPY").with_metrics(&metrics);

        let findings = ReturnSanity::new(0.30).run(&ctx).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].status, CheckStatus::Fail);
        assert_eq!(
            findings[0].details,
            "2 single-day return(s) beyond ±30%: X 2024-03-02 (+45.0%); X 2024-03-03 (-31.0%)"
        );
    }
}
