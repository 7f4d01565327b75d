use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Args, Parser, Subcommand};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use configuration::{LogFormat, init_tracing, load_config};
use database::{DbRepository, InMemoryStore, MetricsStore, connect, run_migrations};
use pipeline::{Pipeline, RunSummary, read_prices_csv};
use std::path::PathBuf;
use std::sync::Arc;

/// The main entry point for the Meridian metrics pipeline.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables (DATABASE_URL, MERIDIAN__* overrides) from .env if present.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    let _log_guard = init_tracing(&config.logging).context("Failed to initialise logging")?;

    match cli.command {
        Commands::Migrate => {
            postgres_store().await?;
            println!("Database schema is up to date.");
        }
        Commands::Import(args) => {
            let rows = read_prices_csv(&args.file)?;
            let pipeline = Pipeline::new(config, postgres_store().await?);
            let written = pipeline.import_prices(&rows).await?;
            println!("Imported {written} rows from {}.", args.file.display());
        }
        Commands::Run(args) => {
            let as_of = resolve_as_of(args.as_of);
            let summary = if args.in_memory {
                let file = args.file.context("--in-memory needs --file to supply prices")?;
                let rows = read_prices_csv(&file)?;
                let pipeline = Pipeline::new(config, Arc::new(InMemoryStore::new()))
                    .with_progress(!cli.json);
                pipeline.run_on(as_of, rows).await?
            } else {
                let pipeline =
                    Pipeline::new(config, postgres_store().await?).with_progress(!cli.json);
                if let Some(file) = &args.file {
                    pipeline.import_prices(&read_prices_csv(file)?).await?;
                }
                pipeline.run(as_of).await?
            };
            report(&summary, cli.json)?;
        }
        Commands::Validate(args) => {
            let pipeline = Pipeline::new(config, postgres_store().await?);
            let summary = pipeline.validate_only(resolve_as_of(args.as_of)).await?;
            report(&summary, cli.json)?;
        }
    }

    Ok(())
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Derives daily return and risk metrics from OHLCV prices and logs data-quality checks.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Missing keys fall back to defaults.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Override the configured console log format.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    /// Print the run summary as JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the database migrations.
    Migrate,
    /// Load raw prices from a CSV export into `prices_daily`.
    Import(ImportArgs),
    /// Recompute metrics for the history window and run the data-quality checks.
    Run(RunArgs),
    /// Re-run the data-quality checks against stored prices and metrics.
    Validate(ValidateArgs),
}

#[derive(Args)]
struct ImportArgs {
    /// CSV with columns date,ticker,open,high,low,close,adj_close,volume.
    #[arg(long)]
    file: PathBuf,
}

#[derive(Args)]
struct RunArgs {
    /// The run date (format: YYYY-MM-DD). Defaults to now.
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Run against an in-memory store instead of the database; nothing is persisted.
    #[arg(long, requires = "file")]
    in_memory: bool,

    /// Prices to load before the run (the only price source with --in-memory).
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Args)]
struct ValidateArgs {
    /// The run date (format: YYYY-MM-DD). Defaults to now.
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

// ==============================================================================
// Helpers
// ==============================================================================

/// Connects to PostgreSQL and brings the schema up to date.
async fn postgres_store() -> anyhow::Result<Arc<dyn MetricsStore>> {
    let pool = connect().await.context("Failed to connect to the database")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    Ok(Arc::new(DbRepository::new(pool)))
}

fn resolve_as_of(date: Option<NaiveDate>) -> DateTime<Utc> {
    match date {
        Some(d) => d.and_time(NaiveTime::MIN).and_utc(),
        None => Utc::now(),
    }
}

fn report(summary: &RunSummary, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!("Run {} as of {}", summary.run_id, summary.as_of);

    if !summary.tickers_written.is_empty() || !summary.failures.is_empty() {
        let mut batches = Table::new();
        batches
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Ticker", "Rows written", "Status"]);
        for (ticker, rows) in &summary.tickers_written {
            batches.add_row(vec![ticker.clone(), rows.to_string(), "OK".to_string()]);
        }
        for failure in &summary.failures {
            batches.add_row(vec![
                failure.ticker.clone(),
                "0".to_string(),
                format!("FAILED: {}", failure.reason),
            ]);
        }
        println!("{batches}");
        println!(
            "{} rows written across {} tickers.",
            summary.rows_written,
            summary.tickers_written.len()
        );
    }
    if !summary.tickers_without_data.is_empty() {
        println!("No prices for: {}", summary.tickers_without_data.join(", "));
    }

    let mut checks = Table::new();
    checks
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Check", "Status", "Details"]);
    for result in &summary.validation {
        checks.add_row(vec![
            result.check_name.clone(),
            result.status.to_string(),
            result.details.clone(),
        ]);
    }
    println!("{checks}");
    println!(
        "{} of {} check results failed.",
        summary.failed_checks().len(),
        summary.validation.len()
    );
    Ok(())
}
