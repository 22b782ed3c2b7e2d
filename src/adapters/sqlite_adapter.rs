//! SQLite data adapter.
//!
//! Schema: `stock_data(ticker, date, open, high, low, close, volume)` keyed by
//! `(ticker, date)`, plus a `tickers` table listing the known symbols. Dates
//! are stored as `YYYY-MM-DD` text so range filters compare lexically.

use crate::domain::error::StratlabError;
use crate::domain::ohlcv::Bar;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn query_err(e: rusqlite::Error) -> StratlabError {
    StratlabError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, StratlabError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| StratlabError::Database {
        reason: format!("invalid stored date '{raw}': {e}"),
    })
}

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StratlabError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| StratlabError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e| StratlabError::Database {
                reason: format!("{db_path}: {e}"),
            })?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, StratlabError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| StratlabError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StratlabError> {
        self.pool.get().map_err(|e| StratlabError::Database {
            reason: e.to_string(),
        })
    }

    pub fn initialize_schema(&self) -> Result<(), StratlabError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS stock_data (
                    ticker TEXT NOT NULL,
                    date TEXT NOT NULL,
                    open REAL NOT NULL,
                    high REAL NOT NULL,
                    low REAL NOT NULL,
                    close REAL NOT NULL,
                    volume REAL,
                    PRIMARY KEY (ticker, date)
                );
                CREATE TABLE IF NOT EXISTS tickers (
                    ticker TEXT PRIMARY KEY
                );",
            )
            .map_err(query_err)
    }

    /// Upserts bars for one ticker.
    pub fn insert_bars(&self, ticker: &str, bars: &[Bar]) -> Result<(), StratlabError> {
        let ticker = ticker.to_uppercase();
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO stock_data (ticker, date, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    ticker,
                    bar.date.format(DATE_FORMAT).to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)
    }

    pub fn insert_tickers(&self, tickers: &[&str]) -> Result<(), StratlabError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        for ticker in tickers {
            tx.execute(
                "INSERT OR IGNORE INTO tickers (ticker) VALUES (?1)",
                params![ticker.to_uppercase()],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)
    }
}

impl DataPort for SqliteAdapter {
    fn fetch_bars(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, StratlabError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT date, open, high, low, close, COALESCE(volume, 0)
                 FROM stock_data
                 WHERE ticker = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(
                params![
                    ticker.to_uppercase(),
                    start_date.format(DATE_FORMAT).to_string(),
                    end_date.format(DATE_FORMAT).to_string()
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, f64>(5)?,
                    ))
                },
            )
            .map_err(query_err)?;

        let mut bars = Vec::new();
        for row in rows {
            let (date, open, high, low, close, volume) = row.map_err(query_err)?;
            bars.push(Bar {
                date: parse_date(&date)?,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        Ok(bars)
    }

    fn list_tickers(&self) -> Result<Vec<String>, StratlabError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT ticker FROM tickers ORDER BY ticker")
            .map_err(query_err)?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(query_err)?;

        rows.map(|row| row.map_err(query_err)).collect()
    }

    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StratlabError> {
        let conn = self.conn()?;
        let (min, max, count): (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(date), MAX(date), COUNT(*) FROM stock_data WHERE ticker = ?1",
                params![ticker.to_uppercase()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_err)?;

        match (min, max) {
            (Some(min), Some(max)) if count > 0 => {
                Ok(Some((parse_date(&min)?, parse_date(&max)?, count as usize)))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyConfig;

    impl ConfigPort for EmptyConfig {
        fn get_string(&self, _section: &str, _key: &str) -> Option<String> {
            None
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
        fn get_double(&self, _section: &str, _key: &str, default: f64) -> f64 {
            default
        }
    }

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close - 0.5,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000.0,
        }
    }

    fn seeded() -> SqliteAdapter {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();
        adapter
            .insert_bars("aapl", &[bar(1, 100.5), bar(2, 101.5), bar(5, 102.5)])
            .unwrap();
        adapter.insert_bars("MSFT", &[bar(1, 300.0)]).unwrap();
        adapter.insert_tickers(&["MSFT", "aapl"]).unwrap();
        adapter
    }

    #[test]
    fn from_config_missing_path() {
        match SqliteAdapter::from_config(&EmptyConfig) {
            Err(StratlabError::ConfigMissing { section, key }) => {
                assert_eq!(section, "sqlite");
                assert_eq!(key, "path");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn schema_is_idempotent() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();
        adapter.initialize_schema().unwrap();
    }

    #[test]
    fn fetch_bars_in_range() {
        let adapter = seeded();
        let fetched = adapter
            .fetch_bars(
                "AAPL",
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            )
            .unwrap();

        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].close, 100.5);
        assert_eq!(fetched[1].close, 101.5);
        assert_eq!(fetched[1].volume, 1_000.0);
    }

    #[test]
    fn fetch_bars_ticker_case_insensitive() {
        let adapter = seeded();
        let fetched = adapter
            .fetch_bars(
                "msft",
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            )
            .unwrap();
        assert_eq!(fetched.len(), 1);
    }

    #[test]
    fn insert_replaces_existing_date() {
        let adapter = seeded();
        adapter.insert_bars("AAPL", &[bar(1, 99.0)]).unwrap();
        let range = adapter.data_range("AAPL").unwrap().unwrap();
        assert_eq!(range.2, 3);
    }

    #[test]
    fn list_tickers_sorted() {
        assert_eq!(seeded().list_tickers().unwrap(), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn data_range_bounds() {
        let (min, max, count) = seeded().data_range("AAPL").unwrap().unwrap();
        assert_eq!(min, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(max, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(count, 3);
    }

    #[test]
    fn data_range_no_data() {
        assert!(seeded().data_range("ZZZ").unwrap().is_none());
    }
}
