#![allow(dead_code)]

use chrono::NaiveDate;
use stratlab::domain::backtest::BacktestConfig;
use stratlab::domain::error::StratlabError;
pub use stratlab::domain::ohlcv::Bar;
use stratlab::domain::series::InstrumentSeries;
use stratlab::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, StratlabError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(StratlabError::Database {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(ticker)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_tickers(&self) -> Result<Vec<String>, StratlabError> {
        let mut tickers: Vec<String> = self.data.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }

    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StratlabError> {
        match self.data.get(ticker) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date: NaiveDate, close: f64) -> Bar {
    Bar {
        date,
        open: close,
        high: close + 1.0,
        low: (close - 1.0).max(0.0),
        close,
        volume: 1_000.0,
    }
}

/// Consecutive calendar days from 2024-01-01, one bar per close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let start = date(2024, 1, 1);
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(start + chrono::Duration::days(i as i64), c))
        .collect()
}

pub fn series_from_closes(ticker: &str, closes: &[f64]) -> InstrumentSeries {
    InstrumentSeries::new(ticker, bars_from_closes(closes)).unwrap()
}

pub fn config_from(simulation_start: NaiveDate, initial_capital: f64) -> BacktestConfig {
    BacktestConfig {
        initial_capital,
        simulation_start,
    }
}

/// Rising then falling series long enough for every default strategy.
pub fn wave_closes(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| 100.0 + 20.0 * ((i as f64) / 7.0).sin() + (i % 3) as f64)
        .collect()
}
