use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    /// Two raw rows share a (date, ticker) key but disagree on their values.
    #[error("Conflicting rows for {ticker} on {date}: same key, different values")]
    DuplicateKey { ticker: String, date: NaiveDate },

    #[error("Row for ticker '{found}' passed to the series builder for '{expected}'")]
    TickerMismatch { expected: String, found: String },
}
