use crate::error::ValidationError;
use chrono::{DateTime, NaiveDate, Utc};
use core_types::{CheckStatus, PricePoint, ReturnMetric};

/// Everything a check may look at during one validator invocation.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    /// The run time that freshness is measured against.
    pub as_of: DateTime<Utc>,
    pub tracked_tickers: &'a [String],
    pub benchmark: &'a str,
    pub raw: &'a [PricePoint],
    pub metrics: &'a [ReturnMetric],
}

impl<'a> ValidationContext<'a> {
    pub fn new(as_of: DateTime<Utc>, tracked_tickers: &'a [String], benchmark: &'a str) -> Self {
        Self {
            as_of,
            tracked_tickers,
            benchmark,
            raw: &[],
            metrics: &[],
        }
    }

    pub fn with_raw(mut self, raw: &'a [PricePoint]) -> Self {
        self.raw = raw;
        self
    }

    pub fn with_metrics(mut self, metrics: &'a [ReturnMetric]) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn as_of_date(&self) -> NaiveDate {
        self.as_of.date_naive()
    }

    /// The raw rows, or `MissingInput` when the caller supplied none.
    pub fn require_raw(&self) -> Result<&'a [PricePoint], ValidationError> {
        if self.raw.is_empty() {
            return Err(ValidationError::MissingInput("raw price rows"));
        }
        Ok(self.raw)
    }

    /// The derived rows, or `MissingInput` when the caller supplied none.
    pub fn require_metrics(&self) -> Result<&'a [ReturnMetric], ValidationError> {
        if self.metrics.is_empty() {
            return Err(ValidationError::MissingInput("derived metric rows"));
        }
        Ok(self.metrics)
    }
}

/// A single outcome reported by a check, before it is stamped into a `ValidationResult`.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub status: CheckStatus,
    pub details: String,
}

impl Finding {
    pub fn pass(details: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Pass,
            details: details.into(),
        }
    }

    pub fn fail(details: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Fail,
            details: details.into(),
        }
    }
}

/// Maximum number of offending items spelled out in a details string.
const DETAIL_LIMIT: usize = 10;

/// Joins offending items into one details fragment, truncating long lists.
pub(crate) fn summarize(items: &[String]) -> String {
    let shown = items
        .iter()
        .take(DETAIL_LIMIT)
        .cloned()
        .collect::<Vec<_>>()
        .join("; ");
    if items.len() > DETAIL_LIMIT {
        format!("{shown}; (+{} more)", items.len() - DETAIL_LIMIT)
    } else {
        shown
    }
}
