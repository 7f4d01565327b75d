use crate::panel::AlignedPanel;
use crate::stats::{
    pct_change, ratio_minus_one, running_drawdown, sample_covariance, sample_std_dev,
    sample_variance,
};
use chrono::{DateTime, Utc};
use configuration::MetricsParams;
use core_types::{ReturnMetric, TickerSeries};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// A stateless calculator for deriving per-(date, ticker) return and risk metrics.
///
/// The engine holds only its window parameters; every call is a pure function of
/// the series it is given, which is what makes re-running a whole batch idempotent.
#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
    params: MetricsParams,
}

impl MetricsEngine {
    pub fn new(params: MetricsParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &MetricsParams {
        &self.params
    }

    /// Computes metrics for every requested ticker present in the panel.
    ///
    /// Tickers are processed in parallel; they only share the benchmark series,
    /// which is read-only here. Requested tickers absent from the panel are skipped.
    pub fn compute_panel(
        &self,
        panel: &AlignedPanel,
        tickers: &[String],
        load_timestamp: DateTime<Utc>,
    ) -> BTreeMap<String, Vec<ReturnMetric>> {
        let benchmark = panel.benchmark();
        let selected: Vec<&TickerSeries> = tickers
            .iter()
            .filter_map(|t| panel.series(t))
            .collect();

        let results: BTreeMap<String, Vec<ReturnMetric>> = selected
            .par_iter()
            .map(|series| {
                let rows = self.compute_series(series, benchmark, load_timestamp);
                (series.ticker().to_string(), rows)
            })
            .collect();

        tracing::info!(
            tickers = results.len(),
            rows = results.values().map(Vec::len).sum::<usize>(),
            benchmark_missing = benchmark.is_none(),
            "Metrics computed."
        );
        results
    }

    /// The main entry point for one ticker.
    ///
    /// # Arguments
    ///
    /// * `series` - The ticker's own observations, ascending by date.
    /// * `benchmark` - The benchmark series, or `None` if it is missing from the panel.
    /// * `load_timestamp` - Stamped on every produced row.
    ///
    /// # Returns
    ///
    /// One `ReturnMetric` per observation in `series`, in date order. Gaps produce no rows.
    pub fn compute_series(
        &self,
        series: &TickerSeries,
        benchmark: Option<&TickerSeries>,
        load_timestamp: DateTime<Utc>,
    ) -> Vec<ReturnMetric> {
        let adj = series.adj_closes();
        if adj.is_empty() {
            return Vec::new();
        }

        let return_1d = pct_change(&adj, 1);
        let return_5d = pct_change(&adj, self.params.weekly_horizon);
        let return_1m = pct_change(&adj, self.params.monthly_horizon);
        let cumulative: Vec<Option<f64>> = adj
            .iter()
            .map(|&price| ratio_minus_one(price, adj[0]))
            .collect();
        let volatility = self.rolling_volatility(&return_1d);
        let beta = match benchmark {
            Some(bench) => self.rolling_beta(series, &return_1d, bench),
            None => vec![None; adj.len()],
        };
        let drawdown = running_drawdown(&adj);

        series
            .points()
            .iter()
            .enumerate()
            .map(|(i, point)| ReturnMetric {
                date: point.date,
                ticker: series.ticker().to_string(),
                return_1d: return_1d[i],
                return_5d: return_5d[i],
                return_1m: return_1m[i],
                cumulative_return: cumulative[i],
                rolling_vol_20d: volatility[i],
                rolling_beta_60d: beta[i],
                drawdown: drawdown[i],
                load_timestamp,
            })
            .collect()
    }

    /// Annualized sample standard deviation of the trailing `vol_window` daily returns.
    ///
    /// Defined only when every return in the window is defined, i.e. from
    /// observation index `vol_window` onwards.
    fn rolling_volatility(&self, returns: &[Option<f64>]) -> Vec<Option<f64>> {
        let window = self.params.vol_window;
        let scale = self.params.annualization_factor.sqrt();

        (0..returns.len())
            .map(|i| {
                if i + 1 < window {
                    return None;
                }
                let trailing: Option<Vec<f64>> =
                    returns[i + 1 - window..=i].iter().copied().collect();
                sample_std_dev(&trailing?).map(|sd| sd * scale)
            })
            .collect()
    }

    /// Rolling `cov(stock, benchmark) / var(benchmark)` over the trailing
    /// `beta_window` observations of the stock.
    ///
    /// Returns are paired by date. A pair exists only when both series traded on
    /// that date and on the same previous trading date, so both returns span the
    /// same interval; any gap in either series drops the date from both sides.
    fn rolling_beta(
        &self,
        series: &TickerSeries,
        returns: &[Option<f64>],
        benchmark: &TickerSeries,
    ) -> Vec<Option<f64>> {
        let window = self.params.beta_window;
        let points = series.points();
        let bench_points = benchmark.points();
        let bench_returns = pct_change(&benchmark.adj_closes(), 1);

        let paired: Vec<Option<(f64, f64)>> = (0..points.len())
            .map(|j| {
                if j == 0 {
                    return None;
                }
                let b = benchmark.position_of(points[j].date)?;
                if b == 0 || bench_points[b - 1].date != points[j - 1].date {
                    return None;
                }
                Some((returns[j]?, bench_returns[b]?))
            })
            .collect();

        (0..points.len())
            .map(|i| {
                if i + 1 < window {
                    return None;
                }
                let (stock, bench): (Vec<f64>, Vec<f64>) =
                    paired[i + 1 - window..=i].iter().flatten().copied().unzip();
                if bench.len() < window {
                    return None;
                }
                let variance = sample_variance(&bench)?;
                if variance == 0.0 {
                    return None;
                }
                let beta = sample_covariance(&stock, &bench)? / variance;
                beta.is_finite().then_some(beta)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::{align, build_series};
    use chrono::NaiveDate;
    use core_types::PricePoint;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
    }

    fn rows(ticker: &str, closes: &[f64]) -> Vec<PricePoint> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PricePoint {
                date: start() + chrono::Duration::days(i as i64),
                ticker: ticker.to_string(),
                open: c,
                high: c,
                low: c,
                close: c,
                adj_close: c,
                volume: 1_000,
            })
            .collect()
    }

    fn series(ticker: &str, closes: &[f64]) -> TickerSeries {
        build_series(ticker, rows(ticker, closes)).unwrap()
    }

    /// A deterministic, wiggly price path.
    fn path(n: usize, seed: f64) -> Vec<f64> {
        let mut price = 100.0;
        (0..n)
            .map(|i| {
                price *= 1.0 + 0.01 * ((i as f64 * 0.7 + seed).sin());
                price
            })
            .collect()
    }

    fn ts() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn five_day_scenario() {
        let engine = MetricsEngine::default();
        let closes = [100.0, 102.0, 101.0, 105.0, 103.0];
        let out = engine.compute_series(&series("X", &closes), None, ts());

        assert_eq!(out.len(), 5);
        assert_eq!(out[0].return_1d, None);
        assert!((out[1].return_1d.unwrap() - 0.02).abs() < EPS);
        assert!((out[2].drawdown.unwrap() - (101.0 - 102.0) / 102.0).abs() < EPS);
        assert!((out[2].drawdown.unwrap() + 0.0098).abs() < 1e-4);
        assert_eq!(out[3].drawdown, Some(0.0));
        assert!((out[4].cumulative_return.unwrap() - 0.03).abs() < EPS);
        assert!(out.iter().all(|m| m.return_5d.is_none() && m.return_1m.is_none()));
    }

    #[test]
    fn cumulative_return_starts_at_exactly_zero() {
        let engine = MetricsEngine::default();
        let out = engine.compute_series(&series("X", &path(30, 1.3)), None, ts());
        assert_eq!(out[0].cumulative_return, Some(0.0));
    }

    #[test]
    fn multi_period_returns_use_observation_lags() {
        let closes = path(30, 0.2);
        let out = MetricsEngine::default().compute_series(&series("X", &closes), None, ts());
        assert_eq!(out[4].return_5d, None);
        assert!((out[5].return_5d.unwrap() - (closes[5] / closes[0] - 1.0)).abs() < EPS);
        assert_eq!(out[20].return_1m, None);
        assert!((out[21].return_1m.unwrap() - (closes[21] / closes[0] - 1.0)).abs() < EPS);
    }

    #[test]
    fn volatility_warms_up_after_twenty_returns() {
        let out = MetricsEngine::default().compute_series(&series("X", &path(40, 0.5)), None, ts());
        for m in &out[..20] {
            assert_eq!(m.rolling_vol_20d, None);
        }
        for m in &out[20..] {
            assert!(m.rolling_vol_20d.unwrap() >= 0.0);
        }
    }

    #[test]
    fn volatility_is_annualized_sample_std_dev() {
        let closes = path(21, 0.9);
        let out = MetricsEngine::default().compute_series(&series("X", &closes), None, ts());
        let returns: Vec<f64> = closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
        let expected = sample_std_dev(&returns).unwrap() * 252f64.sqrt();
        assert!((out[20].rolling_vol_20d.unwrap() - expected).abs() < EPS);
    }

    #[test]
    fn beta_against_itself_is_one() {
        let closes = path(90, 2.0);
        let stock = series("X", &closes);
        let bench = series("SPY", &closes);
        let out = MetricsEngine::default().compute_series(&stock, Some(&bench), ts());

        for m in &out[..60] {
            assert_eq!(m.rolling_beta_60d, None);
        }
        for m in &out[60..] {
            assert!((m.rolling_beta_60d.unwrap() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn beta_of_a_levered_series_tracks_the_leverage() {
        let bench_closes = path(80, 0.1);
        let mut price = 50.0;
        let mut stock_closes = vec![price];
        for w in bench_closes.windows(2) {
            price *= 1.0 + 2.0 * (w[1] / w[0] - 1.0);
            stock_closes.push(price);
        }
        let out = MetricsEngine::default().compute_series(
            &series("X", &stock_closes),
            Some(&series("SPY", &bench_closes)),
            ts(),
        );
        assert!((out[70].rolling_beta_60d.unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn flat_benchmark_leaves_beta_undefined() {
        let out = MetricsEngine::default().compute_series(
            &series("X", &path(70, 0.3)),
            Some(&series("SPY", &[100.0; 70])),
            ts(),
        );
        assert!(out.iter().all(|m| m.rolling_beta_60d.is_none()));
    }

    #[test]
    fn missing_benchmark_leaves_every_beta_undefined() {
        let panel = align(&rows("X", &path(80, 0.4)), "SPY");
        assert!(panel.benchmark_missing());
        let out = MetricsEngine::default().compute_panel(&panel, &["X".to_string()], ts());
        assert!(out["X"].iter().all(|m| m.rolling_beta_60d.is_none()));
        assert!(out["X"][30].rolling_vol_20d.is_some());
    }

    #[test]
    fn benchmark_gap_excludes_the_date_from_the_window() {
        let closes = path(80, 0.6);
        let stock = series("X", &closes);
        let mut bench_rows = rows("SPY", &closes);
        bench_rows.remove(40);
        let bench = build_series("SPY", bench_rows).unwrap();
        let out = MetricsEngine::default().compute_series(&stock, Some(&bench), ts());

        // Dates 40 and 41 have no matching benchmark return, so every window
        // containing them is short of 60 pairs.
        assert!(out[60..=79].iter().all(|m| m.rolling_beta_60d.is_none()));
    }

    #[test]
    fn stock_gap_drops_the_return_spanning_it() {
        let closes = path(130, 0.6);
        let mut stock_rows = rows("X", &closes);
        stock_rows.remove(40);
        let stock = build_series("X", stock_rows).unwrap();
        let bench = series("SPY", &closes);
        let out = MetricsEngine::default().compute_series(&stock, Some(&bench), ts());
        assert_eq!(out.len(), 129);

        // Position 40 holds date 41; its return spans dates 39..41 while the
        // benchmark return on that date spans 40..41, so it has no pair.
        assert_eq!(out[40].date, start() + chrono::Duration::days(41));
        assert!(out[59..100].iter().all(|m| m.rolling_beta_60d.is_none()));
        for m in &out[100..] {
            assert!((m.rolling_beta_60d.unwrap() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn gaps_produce_no_rows() {
        let mut stock_rows = rows("X", &path(10, 0.1));
        stock_rows.remove(3);
        let mut all = stock_rows;
        all.extend(rows("SPY", &path(10, 0.2)));
        let panel = align(&all, "SPY");
        let tickers = ["X".to_string(), "SPY".to_string()];
        let out = MetricsEngine::default().compute_panel(&panel, &tickers, ts());
        assert_eq!(out["X"].len(), 9);
        assert_eq!(out["SPY"].len(), 10);
    }

    #[test]
    fn recomputation_is_bit_for_bit_identical() {
        let mut all = rows("X", &path(120, 0.8));
        all.extend(rows("SPY", &path(120, 1.9)));
        let panel = align(&all, "SPY");
        let tickers = vec!["X".to_string(), "SPY".to_string()];
        let engine = MetricsEngine::default();

        let first = engine.compute_panel(&panel, &tickers, ts());
        let second = engine.compute_panel(&panel, &tickers, ts() + chrono::Duration::hours(1));
        for ticker in &tickers {
            assert_eq!(first[ticker].len(), second[ticker].len());
            assert!(first[ticker].iter().zip(&second[ticker]).all(|(a, b)| a.same_values(b)));
        }
    }

    proptest! {
        #[test]
        fn drawdown_never_positive(closes in prop::collection::vec(0.01f64..10_000.0, 1..200)) {
            let out = MetricsEngine::default().compute_series(&series("P", &closes), None, ts());
            for m in &out {
                prop_assert!(m.drawdown.unwrap() <= 0.0);
            }
            prop_assert_eq!(out[0].cumulative_return, Some(0.0));
        }
    }
}
