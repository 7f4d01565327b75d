use chrono::NaiveDate;
use core_types::ValidationResult;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// A ticker whose batch was not written, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerFailure {
    pub ticker: String,
    pub reason: String,
}

/// The outcome of one pipeline invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Shared by every row this run appended to the data-quality log.
    pub run_id: Uuid,
    pub as_of: NaiveDate,
    /// Rows committed per ticker.
    pub tickers_written: BTreeMap<String, u64>,
    pub rows_written: u64,
    /// Tracked tickers with no raw rows in the history window.
    pub tickers_without_data: Vec<String>,
    /// Tickers rejected by the aligner or whose batch failed to commit.
    pub failures: Vec<TickerFailure>,
    pub validation: Vec<ValidationResult>,
}

impl RunSummary {
    pub(crate) fn new(run_id: Uuid, as_of: NaiveDate) -> Self {
        Self {
            run_id,
            as_of,
            tickers_written: BTreeMap::new(),
            rows_written: 0,
            tickers_without_data: Vec::new(),
            failures: Vec::new(),
            validation: Vec::new(),
        }
    }

    pub fn failed_checks(&self) -> Vec<&ValidationResult> {
        self.validation.iter().filter(|r| r.status.is_fail()).collect()
    }

    /// True when every batch committed and every check passed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.failed_checks().is_empty()
    }
}
