//! The panel aligner.
//!
//! Turns an unordered bag of raw rows into one ordered [`TickerSeries`] per ticker,
//! laid out against a shared trading-date index: the sorted union of every date
//! seen in the input. No market calendar is assumed, so partial exports align
//! correctly; a date missing from one ticker's series is an explicit gap and is
//! never filled in.

use crate::error::AnalyticsError;
use chrono::NaiveDate;
use core_types::{PricePoint, TickerSeries};
use std::collections::{BTreeMap, BTreeSet};

/// A run of trading-index dates missing between two observations of one ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    /// First missing trading date.
    pub start: NaiveDate,
    /// Last missing trading date.
    pub end: NaiveDate,
    /// Number of missing trading dates in `[start, end]`.
    pub missing: usize,
}

/// Per-ticker series aligned on a shared trading-date index, plus the benchmark.
#[derive(Debug, Clone)]
pub struct AlignedPanel {
    dates: Vec<NaiveDate>,
    series: BTreeMap<String, TickerSeries>,
    benchmark_symbol: String,
    rejected: BTreeMap<String, AnalyticsError>,
}

impl AlignedPanel {
    /// The trading-date index, ascending.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn series(&self, ticker: &str) -> Option<&TickerSeries> {
        self.series.get(ticker)
    }

    /// Tickers with an accepted series, in sorted order.
    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn benchmark_symbol(&self) -> &str {
        &self.benchmark_symbol
    }

    /// The benchmark series, shared read-only by every ticker's beta computation.
    pub fn benchmark(&self) -> Option<&TickerSeries> {
        self.series.get(&self.benchmark_symbol)
    }

    /// True when no usable benchmark series exists; beta is then undefined everywhere.
    pub fn benchmark_missing(&self) -> bool {
        self.benchmark().is_none()
    }

    /// Tickers dropped from the panel, with the reason.
    pub fn rejected(&self) -> &BTreeMap<String, AnalyticsError> {
        &self.rejected
    }

    /// Interior gaps of one ticker against the trading-date index.
    pub fn gaps(&self, ticker: &str) -> Vec<Gap> {
        match self.series.get(ticker) {
            Some(series) => interior_gaps(&self.dates, &series.dates()),
            None => Vec::new(),
        }
    }
}

/// Aligns raw rows spanning any number of tickers.
///
/// A ticker whose rows conflict is rejected on its own and every other ticker still
/// aligns. If the benchmark is absent or rejected, the panel reports
/// `benchmark_missing()` instead of failing.
pub fn align(rows: &[PricePoint], benchmark: &str) -> AlignedPanel {
    let dates = trading_index(rows);

    let mut by_ticker: BTreeMap<&str, Vec<PricePoint>> = BTreeMap::new();
    for row in rows {
        by_ticker.entry(row.ticker.as_str()).or_default().push(row.clone());
    }

    let mut series = BTreeMap::new();
    let mut rejected = BTreeMap::new();
    for (ticker, ticker_rows) in by_ticker {
        match build_series(ticker, ticker_rows) {
            Ok(s) => {
                series.insert(ticker.to_string(), s);
            }
            Err(e) => {
                tracing::warn!(ticker, error = %e, "Rejecting ticker from panel.");
                rejected.insert(ticker.to_string(), e);
            }
        }
    }

    let panel = AlignedPanel {
        dates,
        series,
        benchmark_symbol: benchmark.to_string(),
        rejected,
    };

    if panel.benchmark_missing() {
        tracing::warn!(benchmark, "Benchmark series missing; rolling beta will be undefined.");
    }
    tracing::debug!(
        tickers = panel.series.len(),
        rejected = panel.rejected.len(),
        trading_days = panel.dates.len(),
        "Panel aligned."
    );
    panel
}

/// Builds one ticker's series from unordered rows.
///
/// Exact duplicate rows collapse into one; rows sharing a date with different
/// values fail with [`AnalyticsError::DuplicateKey`].
pub fn build_series(
    ticker: &str,
    mut rows: Vec<PricePoint>,
) -> Result<TickerSeries, AnalyticsError> {
    if let Some(other) = rows.iter().find(|r| r.ticker != ticker) {
        return Err(AnalyticsError::TickerMismatch {
            expected: ticker.to_string(),
            found: other.ticker.clone(),
        });
    }

    rows.sort_by_key(|r| r.date);

    let mut points: Vec<PricePoint> = Vec::with_capacity(rows.len());
    for row in rows {
        match points.last() {
            Some(prev) if prev.date == row.date => {
                if !rows_identical(prev, &row) {
                    return Err(AnalyticsError::DuplicateKey {
                        ticker: ticker.to_string(),
                        date: row.date,
                    });
                }
            }
            _ => points.push(row),
        }
    }

    Ok(TickerSeries::new(ticker, points))
}

/// Sorted union of every date present in `rows`.
pub fn trading_index(rows: &[PricePoint]) -> Vec<NaiveDate> {
    rows.iter()
        .map(|r| r.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Gaps strictly between consecutive observations of one ticker.
///
/// Dates before the first or after the last observation are not gaps: a late
/// listing is not missing data, and a trailing absence is a staleness problem.
pub fn interior_gaps(index: &[NaiveDate], observed: &[NaiveDate]) -> Vec<Gap> {
    let positions: Vec<usize> = observed
        .iter()
        .filter_map(|d| index.binary_search(d).ok())
        .collect();

    positions
        .windows(2)
        .filter_map(|w| {
            let (from, to) = (w[0], w[1]);
            let missing = to.saturating_sub(from + 1);
            (missing > 0).then(|| Gap {
                start: index[from + 1],
                end: index[to - 1],
                missing,
            })
        })
        .collect()
}

/// Bitwise equality, so two identical rows carrying NaN still count as the same row.
pub fn rows_identical(a: &PricePoint, b: &PricePoint) -> bool {
    let fields = |p: &PricePoint| {
        [p.open, p.high, p.low, p.close, p.adj_close].map(f64::to_bits)
    };
    a.ticker == b.ticker && a.date == b.date && a.volume == b.volume && fields(a) == fields(b)
}
