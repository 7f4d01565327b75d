use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{Config, LogFormat, LoggingConfig, MetricsParams, Universe, ValidationParams};

/// Prefix for environment overrides, e.g. `MERIDIAN__UNIVERSE__BENCHMARK=QQQ`.
const ENV_PREFIX: &str = "MERIDIAN";

/// Upper bound on `universe.history_days` (100 years of calendar days).
pub const MAX_HISTORY_DAYS: u32 = 36_500;

/// Loads the application configuration from a TOML file layered under environment variables.
///
/// The file is optional: missing keys (or a missing file) fall back to defaults.
/// The result is validated before it is returned.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path.as_ref()).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("universe.tickers")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}

impl Config {
    /// Rejects configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

        if self.universe.tickers.is_empty() {
            return invalid("universe.tickers must list at least one ticker");
        }
        if self.universe.benchmark.trim().is_empty() {
            return invalid("universe.benchmark must not be empty");
        }
        if self.universe.history_days == 0 {
            return invalid("universe.history_days must be greater than 0");
        }
        if self.universe.history_days > MAX_HISTORY_DAYS {
            return invalid("universe.history_days must not exceed 36500 (100 years)");
        }
        let m = &self.metrics;
        if m.weekly_horizon == 0 || m.monthly_horizon == 0 {
            return invalid("return horizons must be greater than 0");
        }
        if m.vol_window < 2 || m.beta_window < 2 {
            return invalid("rolling windows need at least 2 observations");
        }
        if !(m.annualization_factor > 0.0) {
            return invalid("metrics.annualization_factor must be positive");
        }
        let v = &self.validation;
        if v.beta_min >= v.beta_max {
            return invalid("validation.beta_min must be below validation.beta_max");
        }
        if v.stale_after_days < 0 {
            return invalid("validation.stale_after_days must not be negative");
        }
        if !(v.return_sanity_limit > 0.0) {
            return invalid("validation.return_sanity_limit must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.metrics.vol_window, 20);
        assert_eq!(config.metrics.beta_window, 60);
        assert_eq!(config.universe.benchmark, "SPY");
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_sections() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[universe]
tickers = ["AAPL", "MSFT"]
benchmark = "QQQ"

[validation]
max_gap_days = 7
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.universe.tickers, vec!["AAPL", "MSFT"]);
        assert_eq!(config.universe.benchmark, "QQQ");
        assert_eq!(config.universe.history_days, 730);
        assert_eq!(config.validation.max_gap_days, 7);
        assert_eq!(config.validation.return_sanity_limit, 0.30);
        assert_eq!(config.metrics.annualization_factor, 252.0);
    }

    #[test]
    fn inverted_beta_range_is_rejected() {
        let mut config = Config::default();
        config.validation.beta_min = 3.0;
        config.validation.beta_max = 1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn oversized_history_window_is_rejected() {
        let mut config = Config::default();
        config.universe.history_days = MAX_HISTORY_DAYS;
        assert!(config.validate().is_ok());
        config.universe.history_days = u32::MAX;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn benchmark_is_loaded_even_when_untracked() {
        let universe = Universe {
            tickers: vec!["MSFT".into(), "AAPL".into()],
            benchmark: "SPY".into(),
            history_days: 30,
        };
        assert_eq!(universe.symbols_to_load(), vec!["AAPL", "MSFT", "SPY"]);
    }
}
