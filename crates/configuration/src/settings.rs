use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
///
/// Every section falls back to its `Default`, so a partial `config.toml`
/// (or none at all) still yields a runnable configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub universe: Universe,
    pub metrics: MetricsParams,
    pub validation: ValidationParams,
    pub logging: LoggingConfig,
}

/// Which instruments are tracked and how much history each run recomputes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Universe {
    /// Tickers whose metrics are derived and persisted.
    pub tickers: Vec<String>,
    /// The ticker every rolling beta is measured against (e.g. "SPY").
    pub benchmark: String,
    /// Calendar days of raw history loaded for each run, ending at the run date.
    pub history_days: u32,
}

impl Universe {
    /// Tracked tickers plus the benchmark, deduplicated, in a stable order.
    pub fn symbols_to_load(&self) -> Vec<String> {
        let mut symbols = self.tickers.clone();
        if !symbols.iter().any(|t| t == &self.benchmark) {
            symbols.push(self.benchmark.clone());
        }
        symbols.sort();
        symbols.dedup();
        symbols
    }
}

impl Default for Universe {
    fn default() -> Self {
        let tickers = [
            "SPY", "AAPL", "MSFT", "AMZN", "NVDA", "META", "GOOGL", "JPM", "XOM", "JNJ", "PG",
        ];
        Self {
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
            benchmark: "SPY".to_string(),
            history_days: 730,
        }
    }
}

/// Window sizes for the metrics calculator. All windows count observations,
/// not calendar days.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsParams {
    /// Lag of the `return_5d` column.
    pub weekly_horizon: usize,
    /// Lag of the `return_1m` column (~21 trading days).
    pub monthly_horizon: usize,
    /// Number of daily returns in the rolling volatility window.
    pub vol_window: usize,
    /// Number of paired daily returns in the rolling beta window.
    pub beta_window: usize,
    /// Periods per year used to annualize volatility.
    pub annualization_factor: f64,
}

impl Default for MetricsParams {
    fn default() -> Self {
        Self {
            weekly_horizon: 5,
            monthly_horizon: 21,
            vol_window: 20,
            beta_window: 60,
            annualization_factor: 252.0,
        }
    }
}

/// Tolerances used by the data-quality checks.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidationParams {
    /// Largest run of consecutive missing trading days tolerated inside a series.
    pub max_gap_days: usize,
    /// A series whose last observation is older than this many calendar days is stale.
    pub stale_after_days: i64,
    /// Plausible range for a defined rolling beta.
    pub beta_min: f64,
    pub beta_max: f64,
    /// Any single-day move larger than this (in absolute terms) is flagged as suspicious.
    pub return_sanity_limit: f64,
}

impl Default for ValidationParams {
    fn default() -> Self {
        Self {
            max_gap_days: 3,
            stale_after_days: 5,
            beta_min: -5.0,
            beta_max: 5.0,
            return_sanity_limit: 0.30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
    /// When set, logs are also written to a daily-rolling file in this directory.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            directory: None,
        }
    }
}
