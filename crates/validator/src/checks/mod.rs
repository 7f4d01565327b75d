//! The built-in data-quality checks.

pub mod benchmark_present;
pub mod duplicate_keys;
pub mod metric_sanity;
pub mod missing_dates;
pub mod price_validity;
pub mod return_sanity;
pub mod stale_series;

pub use benchmark_present::BenchmarkPresent;
pub use duplicate_keys::DuplicateKeys;
pub use metric_sanity::MetricSanity;
pub use missing_dates::MissingDates;
pub use price_validity::NullOrInvalidPrice;
pub use return_sanity::ReturnSanity;
pub use stale_series::StaleSeries;
