use crate::context::{Finding, ValidationContext};
use crate::error::ValidationError;
use crate::Check;
use analytics::build_series;
use core_types::PricePoint;

/// Fails when the benchmark cannot anchor rolling beta for this run.
///
/// The pipeline keeps running without a benchmark (beta is simply undefined), so this
/// check is where the condition becomes visible.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkPresent;

impl BenchmarkPresent {
    pub fn new() -> Self {
        Self
    }
}

impl Check for BenchmarkPresent {
    fn name(&self) -> &'static str {
        "benchmark_present"
    }

    fn run(&self, ctx: &ValidationContext<'_>) -> Result<Vec<Finding>, ValidationError> {
        let rows: Vec<PricePoint> = ctx
            .raw
            .iter()
            .filter(|r| r.ticker == ctx.benchmark)
            .cloned()
            .collect();

        if rows.is_empty() {
            return Ok(vec![Finding::fail(format!(
                "Benchmark '{}' has no observations; rolling_beta_60d is undefined for this run",
                ctx.benchmark
            ))]);
        }

        let series = match build_series(ctx.benchmark, rows) {
            Ok(series) => series,
            Err(e) => {
                return Ok(vec![Finding::fail(format!(
                    "Benchmark '{}' rejected ({e}); rolling_beta_60d is undefined for this run",
                    ctx.benchmark
                ))]);
            }
        };

        // A benchmark return needs two consecutive rows that both pass the price invariants.
        let points = series.points();
        let valid = points.iter().filter(|p| p.is_valid()).count();
        let usable_returns = points
            .windows(2)
            .filter(|w| w[0].is_valid() && w[1].is_valid())
            .count();

        let finding = if valid == 0 {
            Finding::fail(format!(
                "Benchmark '{}' has {} observations but none are valid; \
                 rolling_beta_60d is undefined for this run",
                ctx.benchmark,
                points.len()
            ))
        } else if usable_returns == 0 {
            Finding::fail(format!(
                "Benchmark '{}' has {valid} valid observation(s), too few for a daily return; \
                 rolling_beta_60d is undefined for this run",
                ctx.benchmark
            ))
        } else {
            Finding::pass(format!(
                "Benchmark '{}' present with {} observations",
                ctx.benchmark,
                points.len()
            ))
        };
        Ok(vec![finding])
    }
}
