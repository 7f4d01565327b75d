use crate::context::{Finding, ValidationContext, summarize};
use crate::error::ValidationError;
use crate::Check;
use core_types::ReturnMetric;

/// Guards the metrics calculator itself: any hit here is a calculation defect,
/// not a raw-data problem.
#[derive(Debug, Clone)]
pub struct MetricSanity {
    beta_min: f64,
    beta_max: f64,
}

impl MetricSanity {
    pub fn new(beta_min: f64, beta_max: f64) -> Self {
        Self { beta_min, beta_max }
    }
}

impl Check for MetricSanity {
    fn name(&self) -> &'static str {
        "metric_sanity"
    }

    fn run(&self, ctx: &ValidationContext<'_>) -> Result<Vec<Finding>, ValidationError> {
        let metrics = ctx.require_metrics()?;

        let mut positive_drawdown = Vec::new();
        let mut negative_vol = Vec::new();
        let mut implausible_beta = Vec::new();
        let mut non_finite = Vec::new();

        for m in metrics {
            if let Some(dd) = m.drawdown.filter(|dd| *dd > 0.0) {
                positive_drawdown.push(format!("{} ({dd:.6})", key(m)));
            }
            if let Some(vol) = m.rolling_vol_20d.filter(|v| *v < 0.0) {
                negative_vol.push(format!("{} ({vol:.6})", key(m)));
            }
            if let Some(beta) = m
                .rolling_beta_60d
                .filter(|b| b.is_finite() && (*b < self.beta_min || *b > self.beta_max))
            {
                implausible_beta.push(format!("{} ({beta:.3})", key(m)));
            }
            let bad: Vec<&str> = m
                .defined_values()
                .into_iter()
                .filter(|(_, v)| !v.is_finite())
                .map(|(name, _)| name)
                .collect();
            if !bad.is_empty() {
                non_finite.push(format!("{} ({})", key(m), bad.join(", ")));
            }
        }

        let beta_label = format!(
            "rolling_beta_60d outside [{}, {}]",
            self.beta_min, self.beta_max
        );
        let classes = [
            ("drawdown > 0", positive_drawdown),
            ("rolling_vol_20d < 0", negative_vol),
            (beta_label.as_str(), implausible_beta),
            ("non-finite metric values", non_finite),
        ];

        let findings: Vec<Finding> = classes
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(label, rows)| {
                Finding::fail(format!("{} row(s) with {label}: {}", rows.len(), summarize(rows)))
            })
            .collect();

        if findings.is_empty() {
            return Ok(vec![Finding::pass(format!(
                "All {} metric rows within bounds",
                metrics.len()
            ))]);
        }
        Ok(findings)
    }
}

fn key(m: &ReturnMetric) -> String {
    format!("{} {}", m.ticker, m.date)
}
