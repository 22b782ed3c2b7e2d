//! Ticker lists and loading the instruments for a run.
//!
//! Tickers are parsed from configuration, then fetched through the data port.
//! Tickers that fail to load or have no bars are skipped with a warning; the
//! run fails only when nothing is left.

use crate::domain::error::StratlabError;
use crate::domain::series::InstrumentSeries;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in ticker list")]
    EmptyToken,

    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),
}

/// Comma-separated tickers, trimmed and uppercased. Order is kept.
pub fn parse_tickers(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut tickers = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let ticker = trimmed.to_uppercase();
        if !seen.insert(ticker.clone()) {
            return Err(UniverseError::DuplicateTicker(ticker));
        }
        tickers.push(ticker);
    }

    Ok(tickers)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    LoadFailed(String),
    NoData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedTicker {
    pub ticker: String,
    pub reason: SkipReason,
}

#[derive(Debug)]
pub struct LoadedUniverse {
    pub instruments: Vec<InstrumentSeries>,
    pub skipped: Vec<SkippedTicker>,
}

/// Fetches every ticker in order. Errors with `NoData` if none has bars.
pub fn load_instruments(
    data_port: &dyn DataPort,
    tickers: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<LoadedUniverse, StratlabError> {
    let mut instruments = Vec::new();
    let mut skipped = Vec::new();

    for ticker in tickers {
        let bars = match data_port.fetch_bars(ticker, start_date, end_date) {
            Ok(bars) => bars,
            Err(e) => {
                warn!(%ticker, error = %e, "skipping ticker");
                skipped.push(SkippedTicker {
                    ticker: ticker.clone(),
                    reason: SkipReason::LoadFailed(e.to_string()),
                });
                continue;
            }
        };

        if bars.is_empty() {
            warn!(%ticker, %start_date, %end_date, "skipping ticker: no data in range");
            skipped.push(SkippedTicker {
                ticker: ticker.clone(),
                reason: SkipReason::NoData,
            });
            continue;
        }

        let count = bars.len();
        match InstrumentSeries::new(ticker.as_str(), bars) {
            Ok(series) => {
                info!(%ticker, bars = count, "loaded");
                instruments.push(series);
            }
            Err(e) => {
                warn!(%ticker, error = %e, "skipping ticker: invalid series");
                skipped.push(SkippedTicker {
                    ticker: ticker.clone(),
                    reason: SkipReason::LoadFailed(e.to_string()),
                });
            }
        }
    }

    if instruments.is_empty() {
        return Err(StratlabError::NoData {
            ticker: tickers.join(","),
        });
    }

    Ok(LoadedUniverse {
        instruments,
        skipped,
    })
}
