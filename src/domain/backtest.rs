//! Simulation driver.
//!
//! Walks the union calendar of all series from the simulation start, runs the
//! strategy once per date that has at least one bar, marks the portfolio to
//! market and records a snapshot. Every run owns a fresh ledger.
//!
//! Only the first instrument (in input order) with a bar on a given date is
//! traded that day.

use crate::domain::error::SimError;
use crate::domain::metrics::{self, PerformanceReport};
use crate::domain::portfolio::Portfolio;
use crate::domain::series::{build_calendar, InstrumentSeries};
use crate::domain::strategy::{self, StrategyParams};
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub simulation_start: NaiveDate,
}

pub fn run_strategy(
    params: &StrategyParams,
    instruments: &[InstrumentSeries],
    config: &BacktestConfig,
) -> Result<PerformanceReport, SimError> {
    if instruments.iter().all(|s| s.is_empty()) {
        return Err(SimError::NoData);
    }

    let dates: Vec<NaiveDate> = build_calendar(instruments)
        .into_iter()
        .filter(|d| *d >= config.simulation_start)
        .collect();
    if dates.is_empty() {
        return Err(SimError::EmptyRange {
            start: config.simulation_start,
        });
    }

    info!(
        strategy = %params.kind(),
        instruments = instruments.len(),
        dates = dates.len(),
        start = %config.simulation_start,
        "starting simulation"
    );

    let mut portfolio = Portfolio::new(config.initial_capital);
    let mut last_close: HashMap<String, f64> = HashMap::new();

    for date in dates {
        let mut traded = false;
        for series in instruments {
            let Some(history) = series.history_through(date) else {
                continue;
            };
            if let Some(bar) = history.last() {
                last_close.insert(series.ticker.clone(), bar.close);
            }
            if !traded {
                traded = true;
                if let Some(fill) = strategy::execute(params, &mut portfolio, &series.ticker, history)
                {
                    debug!(
                        %date,
                        ticker = %series.ticker,
                        filled = fill.is_filled(),
                        ?fill,
                        "strategy order"
                    );
                }
            }
        }
        if !traded {
            continue;
        }

        let total_value = portfolio.market_value(&last_close);
        portfolio.record_snapshot(date, total_value);
    }

    info!(
        trades = portfolio.transactions().len(),
        snapshots = portfolio.history().len(),
        cash = portfolio.cash(),
        "simulation finished"
    );

    let (transactions, history) = portfolio.into_records();
    metrics::analyze(transactions, history, config.simulation_start)
}
