//! CSV directory data adapter.
//!
//! One `<TICKER>.csv` per instrument with the header
//! `date,open,high,low,close,volume`. A missing file means the ticker has no
//! data; a malformed file is an error.

use crate::domain::error::StratlabError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path
            .join(format!("{}.csv", ticker.trim().to_uppercase()))
    }

    fn read_all(&self, ticker: &str) -> Result<Option<Vec<Bar>>, StratlabError> {
        let path = self.csv_path(ticker);
        if !path.exists() {
            return Ok(None);
        }

        let mut rdr = csv::Reader::from_path(&path).map_err(|e| StratlabError::Database {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut bars = Vec::new();
        for (line, result) in rdr.deserialize::<Bar>().enumerate() {
            let bar = result.map_err(|e| StratlabError::DatabaseQuery {
                reason: format!("{} row {}: {}", path.display(), line + 1, e),
            })?;
            bars.push(bar);
        }

        bars.sort_by_key(|b| b.date);
        Ok(Some(bars))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, StratlabError> {
        let bars = self.read_all(ticker)?.unwrap_or_default();
        Ok(bars
            .into_iter()
            .filter(|b| b.date >= start_date && b.date <= end_date)
            .collect())
    }

    fn list_tickers(&self) -> Result<Vec<String>, StratlabError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| StratlabError::Database {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut tickers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StratlabError::Database {
                reason: format!("directory entry error: {}", e),
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    tickers.push(stem.to_string_lossy().to_uppercase());
                }
            }
        }

        tickers.sort();
        Ok(tickers)
    }

    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StratlabError> {
        let Some(bars) = self.read_all(ticker)? else {
            return Ok(None);
        };
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}
