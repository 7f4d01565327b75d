use crate::context::{Finding, ValidationContext, summarize};
use crate::error::ValidationError;
use crate::Check;
use analytics::{interior_gaps, trading_index};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Flags runs of consecutive missing trading days longer than the tolerance.
///
/// Gaps are measured against the trading-date index of the raw rows, so a market
/// holiday shared by every ticker is never a gap.
#[derive(Debug, Clone)]
pub struct MissingDates {
    max_gap_days: usize,
}

impl MissingDates {
    pub fn new(max_gap_days: usize) -> Self {
        Self { max_gap_days }
    }
}

impl Check for MissingDates {
    fn name(&self) -> &'static str {
        "missing_dates"
    }

    fn run(&self, ctx: &ValidationContext<'_>) -> Result<Vec<Finding>, ValidationError> {
        let raw = ctx.require_raw()?;
        let index = trading_index(raw);

        let mut by_ticker: BTreeMap<&str, BTreeSet<NaiveDate>> = BTreeMap::new();
        for row in raw {
            by_ticker.entry(row.ticker.as_str()).or_default().insert(row.date);
        }

        let mut offending = Vec::new();
        for (ticker, dates) in &by_ticker {
            let observed: Vec<NaiveDate> = dates.iter().copied().collect();
            for gap in interior_gaps(&index, &observed) {
                if gap.missing > self.max_gap_days {
                    offending.push(format!(
                        "{ticker} {}..{} ({} trading days)",
                        gap.start, gap.end, gap.missing
                    ));
                }
            }
        }

        if offending.is_empty() {
            return Ok(vec![Finding::pass(format!(
                "No gaps longer than {} trading days across {} tickers and {} trading dates",
                self.max_gap_days,
                by_ticker.len(),
                index.len()
            ))]);
        }
        Ok(vec![Finding::fail(format!(
            "{} gap(s) longer than {} trading days: {}",
            offending.len(),
            self.max_gap_days,
            summarize(&offending)
        ))])
    }
}
