//! # Meridian Pipeline
//!
//! This crate runs one batch of the metrics pipeline: read raw prices, align them,
//! derive metrics, persist them per ticker, and record the data-quality checks.
//!
//! ## Architectural Principles
//!
//! - **Layer 3 Orchestration:** The only crate that knows about every other component.
//!   It talks to storage exclusively through `database::MetricsStore`.
//! - **Per-Ticker Failure Isolation:** A ticker whose rows conflict, or whose batch fails
//!   to commit, is recorded in the `RunSummary`; every other ticker still completes.
//!   Only failing to read the raw prices or to append the validation log aborts a run.
//! - **Safely Re-runnable:** Committed batches survive an abort, and rerunning over the
//!   same inputs replaces rows with identical values.
//!
//! ## Public API
//!
//! - `Pipeline`: `run`, `run_on` and `validate_only`.
//! - `RunSummary` / `TickerFailure`: what a run wrote, what failed, and the check results.
//! - `import::read_prices_csv`: the offline price source.
//! - `PipelineError`: the fatal errors of a run.

pub mod error;
pub mod import;
pub mod summary;

pub use error::PipelineError;
pub use import::read_prices_csv;
pub use summary::{RunSummary, TickerFailure};

use analytics::{MetricsEngine, align};
use chrono::{DateTime, Days, NaiveDate, Utc};
use configuration::Config;
use core_types::{PricePoint, ReturnMetric};
use database::MetricsStore;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;
use validator::{ValidationContext, Validator};

/// Source tag written alongside prices loaded through `import_prices`.
pub const CSV_SOURCE: &str = "csv";

pub struct Pipeline {
    config: Config,
    store: Arc<dyn MetricsStore>,
    engine: MetricsEngine,
    validator: Validator,
    show_progress: bool,
}

impl Pipeline {
    pub fn new(config: Config, store: Arc<dyn MetricsStore>) -> Self {
        let engine = MetricsEngine::new(config.metrics.clone());
        let validator = Validator::with_default_checks(&config.validation);
        Self {
            config,
            store,
            engine,
            validator,
            show_progress: false,
        }
    }

    /// Draws a progress bar on stderr while ticker batches are persisted.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn validator_mut(&mut self) -> &mut Validator {
        &mut self.validator
    }

    /// The inclusive date range of raw history a run as of `as_of` reads.
    pub fn history_window(
        &self,
        as_of: DateTime<Utc>,
    ) -> Result<(NaiveDate, NaiveDate), PipelineError> {
        let to = as_of.date_naive();
        let days = self.config.universe.history_days;
        let from = to
            .checked_sub_days(Days::new(u64::from(days)))
            .ok_or(PipelineError::HistoryWindow { as_of: to, days })?;
        Ok((from, to))
    }

    /// Writes raw rows to the store, e.g. after `read_prices_csv`.
    pub async fn import_prices(&self, rows: &[PricePoint]) -> Result<u64, PipelineError> {
        let written = self.store.upsert_prices(rows, CSV_SOURCE).await?;
        tracing::info!(rows = written, "Imported raw prices.");
        Ok(written)
    }

    /// Runs a full batch over the stored history window ending at `as_of`.
    pub async fn run(&self, as_of: DateTime<Utc>) -> Result<RunSummary, PipelineError> {
        let (from, to) = self.history_window(as_of)?;
        let symbols = self.config.universe.symbols_to_load();
        let raw = self.store.fetch_prices(&symbols, from, to).await?;
        tracing::info!(%from, %to, symbols = symbols.len(), rows = raw.len(), "Loaded raw prices.");
        self.run_on(as_of, raw).await
    }

    /// Runs a full batch over rows supplied by the caller instead of the store.
    pub async fn run_on(
        &self,
        as_of: DateTime<Utc>,
        raw: Vec<PricePoint>,
    ) -> Result<RunSummary, PipelineError> {
        let run_id = Uuid::new_v4();
        let mut summary = RunSummary::new(run_id, as_of.date_naive());
        let tracked = &self.config.universe.tickers;
        let benchmark = self.config.universe.benchmark.as_str();
        tracing::info!(
            %run_id,
            as_of = %summary.as_of,
            tickers = tracked.len(),
            benchmark,
            "Starting pipeline run."
        );

        let raw = Arc::new(raw);
        let panel_rows = Arc::clone(&raw);
        let engine = self.engine.clone();
        let tickers = tracked.clone();
        let bench = benchmark.to_string();
        let load_timestamp = Utc::now();

        let (rejected, metrics) = tokio::task::spawn_blocking(move || {
            let panel = align(&panel_rows, &bench);
            let metrics = engine.compute_panel(&panel, &tickers, load_timestamp);
            (panel.rejected().clone(), metrics)
        })
        .await
        .map_err(|e| PipelineError::JoinError(e.to_string()))?;

        for (ticker, error) in &rejected {
            summary.failures.push(TickerFailure {
                ticker: ticker.clone(),
                reason: error.to_string(),
            });
        }

        let present: BTreeSet<&str> = raw.iter().map(|r| r.ticker.as_str()).collect();
        summary.tickers_without_data = tracked
            .iter()
            .filter(|t| !present.contains(t.as_str()))
            .cloned()
            .collect();
        for ticker in &summary.tickers_without_data {
            tracing::warn!(ticker = %ticker, "No raw prices in the history window.");
        }

        let progress = self.progress_bar(metrics.len() as u64)?;
        for (ticker, rows) in &metrics {
            progress.set_message(ticker.clone());
            match self.store.replace_metrics(ticker, rows).await {
                Ok(written) => {
                    tracing::debug!(ticker = %ticker, rows = written, "Committed metrics batch.");
                    summary.tickers_written.insert(ticker.clone(), written);
                    summary.rows_written += written;
                }
                Err(e) => {
                    tracing::error!(
                        ticker = %ticker,
                        error = %e,
                        "Failed to commit metrics batch."
                    );
                    summary.failures.push(TickerFailure {
                        ticker: ticker.clone(),
                        reason: e.to_string(),
                    });
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        let derived: Vec<ReturnMetric> = metrics.into_values().flatten().collect();
        let ctx = ValidationContext::new(as_of, tracked, benchmark)
            .with_raw(&raw)
            .with_metrics(&derived);
        summary.validation = self.validator.run(run_id, &ctx);
        self.store.append_validation(&summary.validation).await?;

        tracing::info!(
            %run_id,
            tickers_written = summary.tickers_written.len(),
            rows_written = summary.rows_written,
            failures = summary.failures.len(),
            failed_checks = summary.failed_checks().len(),
            "Pipeline run complete."
        );
        Ok(summary)
    }

    /// Re-runs the validator against stored prices and stored metrics, without recomputing.
    pub async fn validate_only(&self, as_of: DateTime<Utc>) -> Result<RunSummary, PipelineError> {
        let run_id = Uuid::new_v4();
        let mut summary = RunSummary::new(run_id, as_of.date_naive());
        let (from, to) = self.history_window(as_of)?;
        let tracked = &self.config.universe.tickers;
        let benchmark = self.config.universe.benchmark.as_str();

        let raw = self
            .store
            .fetch_prices(&self.config.universe.symbols_to_load(), from, to)
            .await?;
        let mut stored = Vec::new();
        for ticker in tracked {
            stored.extend(self.store.fetch_metrics(ticker, from, to).await?);
        }
        tracing::info!(%run_id, raw = raw.len(), metrics = stored.len(), "Validating stored data.");

        let ctx = ValidationContext::new(as_of, tracked, benchmark)
            .with_raw(&raw)
            .with_metrics(&stored);
        summary.validation = self.validator.run(run_id, &ctx);
        self.store.append_validation(&summary.validation).await?;
        Ok(summary)
    }

    fn progress_bar(&self, len: u64) -> Result<ProgressBar, PipelineError> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let bar = ProgressBar::new(len);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )?
                .progress_chars("=>-"),
        );
        Ok(bar)
    }
}
