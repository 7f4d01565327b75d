use crate::context::{Finding, ValidationContext, summarize};
use crate::error::ValidationError;
use crate::Check;
use analytics::rows_identical;
use chrono::NaiveDate;
use core_types::PricePoint;
use std::collections::BTreeMap;

/// Fails when two raw rows share a (date, ticker) key with different values.
///
/// Exact duplicates are harmless and ignored. Any ticker listed here was dropped
/// from the metrics batch by the aligner.
#[derive(Debug, Clone, Default)]
pub struct DuplicateKeys;

impl DuplicateKeys {
    pub fn new() -> Self {
        Self
    }
}

impl Check for DuplicateKeys {
    fn name(&self) -> &'static str {
        "duplicate_keys"
    }

    fn run(&self, ctx: &ValidationContext<'_>) -> Result<Vec<Finding>, ValidationError> {
        let raw = ctx.require_raw()?;

        let mut by_key: BTreeMap<(&str, NaiveDate), Vec<&PricePoint>> = BTreeMap::new();
        for row in raw {
            by_key.entry((row.ticker.as_str(), row.date)).or_default().push(row);
        }

        let conflicts: Vec<String> = by_key
            .iter()
            .filter(|(_, rows)| rows.iter().any(|r| !rows_identical(rows[0], r)))
            .map(|((ticker, date), rows)| format!("{ticker} {date} ({} rows)", rows.len()))
            .collect();

        if conflicts.is_empty() {
            return Ok(vec![Finding::pass(format!(
                "{} distinct (date, ticker) keys, no conflicting rows",
                by_key.len()
            ))]);
        }
        Ok(vec![Finding::fail(format!(
            "{} conflicting (date, ticker) key(s): {}",
            conflicts.len(),
            summarize(&conflicts)
        ))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::fixtures::{at, bar};
    use core_types::CheckStatus;

    #[test]
    fn exact_duplicates_pass() {
        let raw = vec![bar("X", 1, 10.0), bar("X", 1, 10.0), bar("X", 2, 11.0)];
        let tickers = vec!["X".to_string()];
        let ctx = ValidationContext::new(at(3), &tickers, "SPY").with_raw(&raw);
        let findings = DuplicateKeys::new().run(&ctx).unwrap();
        assert_eq!(findings[0].status, CheckStatus::Pass);
        assert!(findings[0].details.starts_with("2 distinct"));
    }

    #[test]
    fn every_conflicting_key_is_listed_in_one_failure() {
        let raw = vec![
            bar("X", 1, 10.0),
            bar("X", 1, 10.5),
            bar("X", 2, 11.0),
            bar("Y", 2, 5.0),
            bar("Y", 2, 5.0),
            bar("Y", 2, 5.5),
        ];
        let tickers = vec!["X".to_string(), "Y".to_string()];
        let ctx = ValidationContext::new(at(3), &tickers, "SPY").with_raw(&raw);

        let findings = DuplicateKeys::new().run(&ctx).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].details,
            "2 conflicting (date, ticker) key(s): X 2024-03-01 (2 rows); Y 2024-03-02 (3 rows)"
        );
    }
}
