//! Offline price loads.
//!
//! Reads a `date,ticker,open,high,low,close,adj_close,volume` export. Rows are
//! returned as found: out-of-order and duplicate rows are the aligner's concern.

use crate::error::PipelineError;
use chrono::NaiveDate;
use core_types::PricePoint;
use serde::Deserialize;
use std::path::Path;

/// Stands in for an empty volume cell; `PricePoint::violations` reports it as negative volume.
pub const MISSING_VOLUME: i64 = -1;

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    ticker: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    adj_close: Option<f64>,
    volume: Option<i64>,
}

impl From<CsvRow> for PricePoint {
    /// Empty cells become invalid values, so the validator reports them and the import goes on.
    fn from(row: CsvRow) -> Self {
        let price = |v: Option<f64>| v.unwrap_or(f64::NAN);
        PricePoint {
            date: row.date,
            ticker: row.ticker,
            open: price(row.open),
            high: price(row.high),
            low: price(row.low),
            close: price(row.close),
            adj_close: price(row.adj_close),
            volume: row.volume.unwrap_or(MISSING_VOLUME),
        }
    }
}

pub fn read_prices_csv(path: impl AsRef<Path>) -> Result<Vec<PricePoint>, PipelineError> {
    let path = path.as_ref();
    let wrap = |source: csv::Error| PipelineError::Import {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(wrap)?;

    let mut rows = Vec::new();
    for record in reader.deserialize::<CsvRow>() {
        rows.push(PricePoint::from(record.map_err(wrap)?));
    }

    tracing::info!(path = %path.display(), rows = rows.len(), "Read price file.");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::PriceViolation;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn reads_rows_in_file_order() {
        let file = write_csv(
            "date,ticker,open,high,low,close,adj_close,volume\n\
             2024-01-03,AAPL,185.0,186.1,183.2,184.2,183.9,5800000\n\
             2024-01-02, SPY ,472.1,473.6,470.5,472.6,468.8,123000\n",
        );
        let rows = read_prices_csv(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ticker, "AAPL");
        assert_eq!(rows[1].ticker, "SPY");
        assert_eq!(rows[1].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(rows[0].adj_close, 183.9);
        assert!(rows.iter().all(|r| r.is_valid()));
    }

    #[test]
    fn empty_price_cells_become_invalid_rows() {
        let file = write_csv(
            "date,ticker,open,high,low,close,adj_close,volume\n\
             2024-01-02,MSFT,370.0,,368.0,370.6,369.1,100\n",
        );
        let rows = read_prices_csv(file.path()).unwrap();
        assert!(rows[0].high.is_nan());
        assert!(!rows[0].is_valid());
    }

    #[test]
    fn empty_volume_cells_become_invalid_rows() {
        let file = write_csv(
            "date,ticker,open,high,low,close,adj_close,volume\n\
             2024-01-02,MSFT,370.0,371.0,368.0,370.6,369.1,\n\
             2024-01-03,MSFT,370.6,372.0,369.0,371.2,369.7,2500\n",
        );
        let rows = read_prices_csv(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].volume, MISSING_VOLUME);
        assert_eq!(rows[0].violations(), vec![PriceViolation::NegativeVolume]);
        assert!(rows[1].is_valid());
    }

    #[test]
    fn malformed_dates_are_reported_with_the_path() {
        let file = write_csv(
            "date,ticker,open,high,low,close,adj_close,volume\n\
             02/01/2024,MSFT,1,1,1,1,1,1\n",
        );
        let err = read_prices_csv(file.path()).unwrap_err();
        assert!(matches!(err, PipelineError::Import { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }
}
