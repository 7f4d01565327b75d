use crate::enums::{CheckStatus, PriceViolation};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One daily OHLCV observation for a ticker, as delivered by the price source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub ticker: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Close adjusted for splits and dividends. All return metrics use this field.
    pub adj_close: f64,
    pub volume: i64,
}

impl PricePoint {
    /// Lists every invariant this observation breaks, in a stable order.
    pub fn violations(&self) -> Vec<PriceViolation> {
        let mut found = Vec::new();
        let prices = [self.open, self.high, self.low, self.close, self.adj_close];

        if prices.iter().any(|p| !p.is_finite()) {
            found.push(PriceViolation::NonFinitePrice);
            // Ordering checks are meaningless against NaN.
            if self.volume < 0 {
                found.push(PriceViolation::NegativeVolume);
            }
            return found;
        }
        if prices.iter().any(|p| *p <= 0.0) {
            found.push(PriceViolation::NonPositivePrice);
        }
        if self.high < self.low {
            found.push(PriceViolation::InvertedRange);
        }
        if self.open > self.high || self.open < self.low {
            found.push(PriceViolation::OpenOutsideRange);
        }
        if self.close > self.high || self.close < self.low {
            found.push(PriceViolation::CloseOutsideRange);
        }
        if self.volume < 0 {
            found.push(PriceViolation::NegativeVolume);
        }
        found
    }

    pub fn is_valid(&self) -> bool {
        self.violations().is_empty()
    }
}

/// The ordered observations of a single ticker: ascending by date, one row per date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSeries {
    ticker: String,
    points: Vec<PricePoint>,
}

impl TickerSeries {
    /// Wraps points that are already sorted ascending and free of duplicate dates.
    ///
    /// The panel aligner is the only producer; it establishes the ordering invariant.
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> Self {
        debug_assert!(points.windows(2).all(|w| w[0].date < w[1].date));
        Self {
            ticker: ticker.into(),
            points,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn adj_closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.adj_close).collect()
    }

    /// Observation index of `date`, if the ticker traded that day.
    pub fn position_of(&self, date: NaiveDate) -> Option<usize> {
        self.points.binary_search_by_key(&date, |p| p.date).ok()
    }
}

/// Derived performance and risk metrics for one (date, ticker).
///
/// `None` means the metric could not be computed (e.g. not enough trailing
/// history); it is never a stand-in for zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnMetric {
    pub date: NaiveDate,
    pub ticker: String,
    pub return_1d: Option<f64>,
    pub return_5d: Option<f64>,
    pub return_1m: Option<f64>,
    pub cumulative_return: Option<f64>,
    pub rolling_vol_20d: Option<f64>,
    pub rolling_beta_60d: Option<f64>,
    pub drawdown: Option<f64>,
    pub load_timestamp: DateTime<Utc>,
}

impl ReturnMetric {
    /// Compares every field except `load_timestamp`, bit for bit.
    pub fn same_values(&self, other: &ReturnMetric) -> bool {
        fn bits(v: Option<f64>) -> Option<u64> {
            v.map(f64::to_bits)
        }
        self.date == other.date
            && self.ticker == other.ticker
            && bits(self.return_1d) == bits(other.return_1d)
            && bits(self.return_5d) == bits(other.return_5d)
            && bits(self.return_1m) == bits(other.return_1m)
            && bits(self.cumulative_return) == bits(other.cumulative_return)
            && bits(self.rolling_vol_20d) == bits(other.rolling_vol_20d)
            && bits(self.rolling_beta_60d) == bits(other.rolling_beta_60d)
            && bits(self.drawdown) == bits(other.drawdown)
    }

    /// All defined numeric fields, labelled with their column name.
    pub fn defined_values(&self) -> Vec<(&'static str, f64)> {
        [
            ("return_1d", self.return_1d),
            ("return_5d", self.return_5d),
            ("return_1m", self.return_1m),
            ("cumulative_return", self.cumulative_return),
            ("rolling_vol_20d", self.rolling_vol_20d),
            ("rolling_beta_60d", self.rolling_beta_60d),
            ("drawdown", self.drawdown),
        ]
        .into_iter()
        .filter_map(|(name, v)| v.map(|v| (name, v)))
        .collect()
    }
}

/// One row of the append-only data-quality log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Groups every check executed by one validator invocation.
    pub run_id: Uuid,
    pub check_name: String,
    pub status: CheckStatus,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}
