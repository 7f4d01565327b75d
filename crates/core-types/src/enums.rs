use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of a single data-quality check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Fail,
}

impl CheckStatus {
    /// The representation stored in the `data_quality_log` table.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
        }
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, CheckStatus::Fail)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PASS" => Ok(CheckStatus::Pass),
            "FAIL" => Ok(CheckStatus::Fail),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}

/// A broken invariant on a single `PricePoint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PriceViolation {
    /// One of the price fields is NaN or infinite (a null coming from the source).
    NonFinitePrice,
    /// One of the price fields, or the adjusted close, is zero or negative.
    NonPositivePrice,
    /// `high < low`.
    InvertedRange,
    /// `open` lies outside `[low, high]`.
    OpenOutsideRange,
    /// `close` lies outside `[low, high]`.
    CloseOutsideRange,
    NegativeVolume,
}

impl PriceViolation {
    /// Violations that describe an inconsistent OHLC bar rather than a bad value.
    pub fn is_range_violation(&self) -> bool {
        matches!(
            self,
            PriceViolation::InvertedRange
                | PriceViolation::OpenOutsideRange
                | PriceViolation::CloseOutsideRange
        )
    }

    pub fn describe(&self) -> &'static str {
        match self {
            PriceViolation::NonFinitePrice => "non-finite price",
            PriceViolation::NonPositivePrice => "non-positive price",
            PriceViolation::InvertedRange => "high below low",
            PriceViolation::OpenOutsideRange => "open outside [low, high]",
            PriceViolation::CloseOutsideRange => "close outside [low, high]",
            PriceViolation::NegativeVolume => "negative volume",
        }
    }
}
