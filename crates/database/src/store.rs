use crate::error::DbError;
use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::{PricePoint, ReturnMetric, ValidationResult};
use uuid::Uuid;

/// The storage seam of the pipeline.
///
/// Lets the pipeline stay agnostic about whether it is talking to PostgreSQL or to
/// the in-memory store used by tests and dry runs. Every implementation must give
/// the same guarantees:
///
/// - metric rows are keyed by (date, ticker) and a rewrite replaces, never duplicates;
/// - one `replace_metrics` call is atomic;
/// - validation rows are only ever appended.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Raw rows for `tickers` with `from <= date <= to`, ordered by ticker then date.
    async fn fetch_prices(
        &self,
        tickers: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, DbError>;

    /// Inserts or overwrites raw rows by (date, ticker), tagging them with `source`.
    async fn upsert_prices(&self, rows: &[PricePoint], source: &str) -> Result<u64, DbError>;

    /// Atomically replaces `ticker`'s metric rows over the date range covered by `rows`.
    ///
    /// Stored rows inside [first, last] that are not in `rows` are removed, so a
    /// recompute never leaves stale values behind. Returns the number of rows written.
    async fn replace_metrics(&self, ticker: &str, rows: &[ReturnMetric]) -> Result<u64, DbError>;

    async fn fetch_metrics(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ReturnMetric>, DbError>;

    /// Appends to the data-quality log. Existing rows are never touched.
    async fn append_validation(&self, results: &[ValidationResult]) -> Result<u64, DbError>;

    /// Every log row written under `run_id`, in insertion order.
    async fn fetch_validation(&self, run_id: Uuid) -> Result<Vec<ValidationResult>, DbError>;
}

/// Ensures every row in a metrics batch belongs to `ticker` and returns its date range.
pub(crate) fn batch_range(
    ticker: &str,
    rows: &[ReturnMetric],
) -> Result<Option<(NaiveDate, NaiveDate)>, DbError> {
    if let Some(stray) = rows.iter().find(|r| r.ticker != ticker) {
        return Err(DbError::WriteRejected {
            ticker: ticker.to_string(),
            reason: format!("batch contains a row for '{}'", stray.ticker),
        });
    }
    let first = rows.iter().map(|r| r.date).min();
    let last = rows.iter().map(|r| r.date).max();
    Ok(first.zip(last))
}
