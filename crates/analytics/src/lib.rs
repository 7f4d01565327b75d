//! # Meridian Analytics
//!
//! This crate turns raw daily price rows into the derived `returns_daily` panel.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of storage
//!   or the price source. It depends only on `core-types` and `configuration`.
//! - **Stateless Calculation:** The `MetricsEngine` takes an aligned panel and window
//!   sizes as input and produces `ReturnMetric` rows as output. Running it twice on the
//!   same input yields identical values.
//! - **Gap Awareness:** Missing observations are never interpolated. Anything that
//!   cannot be computed is `None`, never a silent zero or NaN.
//!
//! ## Public API
//!
//! - `align` / `AlignedPanel`: the panel aligner and its trading-date index.
//! - `MetricsEngine`: returns, cumulative return, rolling volatility, rolling beta, drawdown.
//! - `stats`: the numeric helpers behind the engine.
//! - `AnalyticsError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod panel;
pub mod stats;

// Re-export the key components to create a clean, public-facing API.
pub use engine::MetricsEngine;
pub use error::AnalyticsError;
pub use panel::{
    AlignedPanel, Gap, align, build_series, interior_gaps, rows_identical, trading_index,
};
