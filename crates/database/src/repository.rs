use crate::DbError;
use crate::store::{MetricsStore, batch_range};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use core_types::{CheckStatus, PricePoint, ReturnMetric, ValidationResult};
use sqlx::Row;
use sqlx::postgres::{PgPool, PgRow};
use uuid::Uuid;

/// The `DbRepository` provides a high-level, application-specific interface
/// to the database. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// NULL prices come back as NaN so the validator reports them as missing.
fn price_column(row: &PgRow, column: &str) -> Result<f64, sqlx::Error> {
    Ok(row.try_get::<Option<f64>, _>(column)?.unwrap_or(f64::NAN))
}

fn price_from_row(row: &PgRow) -> Result<PricePoint, sqlx::Error> {
    Ok(PricePoint {
        date: row.try_get("date")?,
        ticker: row.try_get("ticker")?,
        open: price_column(row, "open")?,
        high: price_column(row, "high")?,
        low: price_column(row, "low")?,
        close: price_column(row, "close")?,
        adj_close: price_column(row, "adj_close")?,
        volume: row.try_get("volume")?,
    })
}

fn metric_from_row(row: &PgRow) -> Result<ReturnMetric, sqlx::Error> {
    Ok(ReturnMetric {
        date: row.try_get("date")?,
        ticker: row.try_get("ticker")?,
        return_1d: row.try_get("return_1d")?,
        return_5d: row.try_get("return_5d")?,
        return_1m: row.try_get("return_1m")?,
        cumulative_return: row.try_get("cumulative_return")?,
        rolling_vol_20d: row.try_get("rolling_vol_20d")?,
        rolling_beta_60d: row.try_get("rolling_beta_60d")?,
        drawdown: row.try_get("drawdown")?,
        load_timestamp: row.try_get("load_timestamp")?,
    })
}

#[async_trait]
impl MetricsStore for DbRepository {
    async fn fetch_prices(
        &self,
        tickers: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT date, ticker, open, high, low, close, adj_close, volume
            FROM prices_daily
            WHERE ticker = ANY($1) AND date >= $2 AND date <= $3
            ORDER BY ticker ASC, date ASC
            "#,
        )
        .bind(tickers)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let prices = rows.iter().map(price_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(prices)
    }

    /// Mirrors the ingest step: later loads of the same (date, ticker) win.
    async fn upsert_prices(&self, rows: &[PricePoint], source: &str) -> Result<u64, DbError> {
        let load_timestamp = Utc::now();
        let mut tx = self.pool.begin().await?;

        for p in rows {
            sqlx::query(
                r#"
                INSERT INTO prices_daily
                    (date, ticker, open, high, low, close, adj_close, volume, source, load_timestamp)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (date, ticker) DO UPDATE SET
                    open = EXCLUDED.open,
                    high = EXCLUDED.high,
                    low = EXCLUDED.low,
                    close = EXCLUDED.close,
                    adj_close = EXCLUDED.adj_close,
                    volume = EXCLUDED.volume,
                    source = EXCLUDED.source,
                    load_timestamp = EXCLUDED.load_timestamp
                "#,
            )
            .bind(p.date)
            .bind(&p.ticker)
            .bind(p.open)
            .bind(p.high)
            .bind(p.low)
            .bind(p.close)
            .bind(p.adj_close)
            .bind(p.volume)
            .bind(source)
            .bind(load_timestamp)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(rows = rows.len(), source, "Upserted raw price rows.");
        Ok(rows.len() as u64)
    }

    async fn replace_metrics(&self, ticker: &str, rows: &[ReturnMetric]) -> Result<u64, DbError> {
        let Some((first, last)) = batch_range(ticker, rows)? else {
            return Ok(0);
        };

        // Dropping `tx` on an early return rolls the whole batch back.
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query(
            "DELETE FROM returns_daily WHERE ticker = $1 AND date >= $2 AND date <= $3",
        )
        .bind(ticker)
        .bind(first)
        .bind(last)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        for m in rows {
            sqlx::query(
                r#"
                INSERT INTO returns_daily (
                    date, ticker, return_1d, return_5d, return_1m, cumulative_return,
                    rolling_vol_20d, rolling_beta_60d, drawdown, load_timestamp
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (date, ticker) DO UPDATE SET
                    return_1d = EXCLUDED.return_1d,
                    return_5d = EXCLUDED.return_5d,
                    return_1m = EXCLUDED.return_1m,
                    cumulative_return = EXCLUDED.cumulative_return,
                    rolling_vol_20d = EXCLUDED.rolling_vol_20d,
                    rolling_beta_60d = EXCLUDED.rolling_beta_60d,
                    drawdown = EXCLUDED.drawdown,
                    load_timestamp = EXCLUDED.load_timestamp
                "#,
            )
            .bind(m.date)
            .bind(&m.ticker)
            .bind(m.return_1d)
            .bind(m.return_5d)
            .bind(m.return_1m)
            .bind(m.cumulative_return)
            .bind(m.rolling_vol_20d)
            .bind(m.rolling_beta_60d)
            .bind(m.drawdown)
            .bind(m.load_timestamp)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(
            ticker,
            %first,
            %last,
            deleted,
            written = rows.len(),
            "Replaced metric rows."
        );
        Ok(rows.len() as u64)
    }

    async fn fetch_metrics(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ReturnMetric>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT date, ticker, return_1d, return_5d, return_1m, cumulative_return,
                   rolling_vol_20d, rolling_beta_60d, drawdown, load_timestamp
            FROM returns_daily
            WHERE ticker = $1 AND date >= $2 AND date <= $3
            ORDER BY date ASC
            "#,
        )
        .bind(ticker)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let metrics = rows.iter().map(metric_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(metrics)
    }

    async fn append_validation(&self, results: &[ValidationResult]) -> Result<u64, DbError> {
        let mut tx = self.pool.begin().await?;

        for r in results {
            sqlx::query(
                r#"
                INSERT INTO data_quality_log (run_id, check_name, status, details, timestamp)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(r.run_id)
            .bind(&r.check_name)
            .bind(r.status.as_str())
            .bind(&r.details)
            .bind(r.timestamp)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(results.len() as u64)
    }

    async fn fetch_validation(&self, run_id: Uuid) -> Result<Vec<ValidationResult>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT run_id, check_name, status, details, timestamp
            FROM data_quality_log
            WHERE run_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ValidationResult, DbError> {
                let status: String = row.try_get("status")?;
                Ok(ValidationResult {
                    run_id: row.try_get("run_id")?,
                    check_name: row.try_get("check_name")?,
                    status: status.parse::<CheckStatus>()?,
                    details: row.try_get("details")?,
                    timestamp: row.try_get("timestamp")?,
                })
            })
            .collect()
    }
}
