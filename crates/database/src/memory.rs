use crate::DbError;
use crate::store::{MetricsStore, batch_range};
use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::{PricePoint, ReturnMetric, ValidationResult};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

type Key = (String, NaiveDate);

#[derive(Debug, Default)]
struct Tables {
    prices: BTreeMap<Key, PricePoint>,
    metrics: BTreeMap<Key, ReturnMetric>,
    validation: Vec<ValidationResult>,
}

/// A `MetricsStore` that lives entirely in process memory.
///
/// Keys are (ticker, date), so range scans come back in the same order the SQL
/// store returns them. Each method takes the lock once, which makes every call
/// atomic with respect to the others.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn metric_count(&self) -> usize {
        self.tables.read().await.metrics.len()
    }

    pub async fn validation_count(&self) -> usize {
        self.tables.read().await.validation.len()
    }
}

fn range_of(ticker: &str, from: NaiveDate, to: NaiveDate) -> std::ops::RangeInclusive<Key> {
    (ticker.to_string(), from)..=(ticker.to_string(), to)
}

#[async_trait]
impl MetricsStore for InMemoryStore {
    async fn fetch_prices(
        &self,
        tickers: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, DbError> {
        if from > to {
            return Ok(Vec::new());
        }
        let tables = self.tables.read().await;
        let mut wanted: Vec<&String> = tickers.iter().collect();
        wanted.sort();
        wanted.dedup();

        Ok(wanted
            .into_iter()
            .flat_map(|t| tables.prices.range(range_of(t, from, to)).map(|(_, p)| p.clone()))
            .collect())
    }

    async fn upsert_prices(&self, rows: &[PricePoint], source: &str) -> Result<u64, DbError> {
        let mut tables = self.tables.write().await;
        for p in rows {
            tables.prices.insert((p.ticker.clone(), p.date), p.clone());
        }
        tracing::debug!(rows = rows.len(), source, "Upserted raw price rows in memory.");
        Ok(rows.len() as u64)
    }

    async fn replace_metrics(&self, ticker: &str, rows: &[ReturnMetric]) -> Result<u64, DbError> {
        let Some((first, last)) = batch_range(ticker, rows)? else {
            return Ok(0);
        };

        let mut tables = self.tables.write().await;
        let stale: Vec<Key> = tables
            .metrics
            .range(range_of(ticker, first, last))
            .map(|(k, _)| k.clone())
            .collect();
        for key in stale {
            tables.metrics.remove(&key);
        }
        for m in rows {
            tables.metrics.insert((m.ticker.clone(), m.date), m.clone());
        }
        Ok(rows.len() as u64)
    }

    async fn fetch_metrics(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ReturnMetric>, DbError> {
        if from > to {
            return Ok(Vec::new());
        }
        let tables = self.tables.read().await;
        Ok(tables
            .metrics
            .range(range_of(ticker, from, to))
            .map(|(_, m)| m.clone())
            .collect())
    }

    async fn append_validation(&self, results: &[ValidationResult]) -> Result<u64, DbError> {
        let mut tables = self.tables.write().await;
        tables.validation.extend_from_slice(results);
        Ok(results.len() as u64)
    }

    async fn fetch_validation(&self, run_id: Uuid) -> Result<Vec<ValidationResult>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .validation
            .iter()
            .filter(|r| r.run_id == run_id)
            .cloned()
            .collect())
    }
}
