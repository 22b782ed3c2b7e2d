//! Performance analysis over the snapshot history.
//!
//! Only snapshots on or after the simulation start count. Values are daily,
//! annualised over 252 trading days with a 2% risk-free rate. Ratios that
//! cannot be computed (zero volatility, zero drawdown, too few snapshots) are
//! reported as `"N/A"` instead of failing.

use crate::domain::error::SimError;
use crate::domain::indicator::{mean, population_stddev};
use crate::domain::portfolio::{round_to, PortfolioSnapshot, Transaction};
use chrono::NaiveDate;
use serde::{Serialize, Serializer};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const RISK_FREE_RATE: f64 = 0.02;

const SHORT_HISTORY_MESSAGE: &str = "Not enough daily returns to calculate advanced metrics. \
This can happen if no trades were made or the simulation period is too short.";

/// A metric that may be unavailable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Value(f64),
    NotAvailable,
    NoDownsideVolatility,
}

impl MetricValue {
    pub fn value(&self) -> Option<f64> {
        match self {
            MetricValue::Value(v) => Some(*v),
            _ => None,
        }
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Value(v) => write!(f, "{:.2}", v),
            MetricValue::NotAvailable => f.write_str("N/A"),
            MetricValue::NoDownsideVolatility => f.write_str("N/A (No downside volatility)"),
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetricValue::Value(v) => serializer.serialize_f64(*v),
            other => serializer.collect_str(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub initial_capital: f64,
    pub final_portfolio_value: f64,
    pub total_return_percent: f64,
    pub annualized_return_percent: MetricValue,
    pub annualized_volatility_percent: MetricValue,
    pub sharpe_ratio: MetricValue,
    pub max_drawdown_percent: MetricValue,
    pub calmar_ratio: MetricValue,
    pub sortino_ratio: MetricValue,
    pub transactions: Vec<Transaction>,
    pub portfolio_history: Vec<PortfolioSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Builds the report from a full run. `history` is kept whole in the report;
/// metrics use only the part on or after `simulation_start`.
pub fn analyze(
    transactions: Vec<Transaction>,
    history: Vec<PortfolioSnapshot>,
    simulation_start: NaiveDate,
) -> Result<PerformanceReport, SimError> {
    let values: Vec<f64> = history
        .iter()
        .filter(|s| s.date >= simulation_start)
        .map(|s| s.total_value)
        .collect();

    let (Some(&initial), Some(&last)) = (values.first(), values.last()) else {
        return Err(SimError::EmptyHistory {
            start: simulation_start,
        });
    };

    let total_return = if initial != 0.0 {
        (last - initial) / initial * 100.0
    } else {
        0.0
    };

    let mut report = PerformanceReport {
        initial_capital: round_to(initial, 2),
        final_portfolio_value: round_to(last, 2),
        total_return_percent: round_to(total_return, 2),
        annualized_return_percent: MetricValue::NotAvailable,
        annualized_volatility_percent: MetricValue::NotAvailable,
        sharpe_ratio: MetricValue::NotAvailable,
        max_drawdown_percent: MetricValue::NotAvailable,
        calmar_ratio: MetricValue::NotAvailable,
        sortino_ratio: MetricValue::NotAvailable,
        transactions,
        portfolio_history: history,
        message: None,
    };

    let returns = daily_returns(&values);
    let (Some(mean_return), Some(daily_volatility)) = (mean(&returns), population_stddev(&returns))
    else {
        report.message = Some(SHORT_HISTORY_MESSAGE.to_string());
        return Ok(report);
    };

    let annualized_return = (1.0 + mean_return).powf(TRADING_DAYS_PER_YEAR) - 1.0;
    let annualized_volatility = daily_volatility * TRADING_DAYS_PER_YEAR.sqrt();
    report.annualized_return_percent = MetricValue::Value(round_to(annualized_return * 100.0, 2));
    report.annualized_volatility_percent =
        MetricValue::Value(round_to(annualized_volatility * 100.0, 2));

    if annualized_volatility != 0.0 {
        let sharpe = (annualized_return - RISK_FREE_RATE) / annualized_volatility;
        report.sharpe_ratio = MetricValue::Value(round_to(sharpe, 2));
    }

    let drawdown = max_drawdown(&values);
    report.max_drawdown_percent = MetricValue::Value(round_to(drawdown * 100.0, 2));
    if drawdown.abs() > 0.0 {
        report.calmar_ratio = MetricValue::Value(round_to(annualized_return / drawdown.abs(), 2));
    }

    report.sortino_ratio = sortino(&returns, annualized_return);

    Ok(report)
}

/// Day-over-day returns; a zero previous value yields a zero return.
pub fn daily_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| if w[0] != 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

/// Most negative peak-to-trough decline as a fraction (0 or negative). The
/// running peak starts at the first value.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let Some(&first) = values.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut worst = 0.0_f64;
    for &value in values {
        if value > peak {
            peak = value;
        }
        if peak != 0.0 {
            worst = worst.min((value - peak) / peak);
        }
    }
    worst
}

fn sortino(returns: &[f64], annualized_return: f64) -> MetricValue {
    let downside: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
    let Some(deviation) = population_stddev(&downside) else {
        return MetricValue::NoDownsideVolatility;
    };
    let downside_deviation = deviation * TRADING_DAYS_PER_YEAR.sqrt();
    if downside_deviation == 0.0 {
        return MetricValue::NotAvailable;
    }
    MetricValue::Value(round_to(
        (annualized_return - RISK_FREE_RATE) / downside_deviation,
        2,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn history(values: &[f64]) -> Vec<PortfolioSnapshot> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| PortfolioSnapshot {
                date: date(i as u32 + 1),
                cash: v,
                positions: BTreeMap::new(),
                total_value: v,
            })
            .collect()
    }

    #[test]
    fn flat_line() {
        let report = analyze(vec![], history(&[1_000.0; 5]), date(1)).unwrap();
        assert_relative_eq!(report.total_return_percent, 0.0);
        assert_eq!(report.max_drawdown_percent, MetricValue::Value(0.0));
        assert_eq!(report.annualized_return_percent, MetricValue::Value(0.0));
        assert_eq!(report.annualized_volatility_percent, MetricValue::Value(0.0));
        assert_eq!(report.sharpe_ratio, MetricValue::NotAvailable);
        assert_eq!(report.calmar_ratio, MetricValue::NotAvailable);
        assert_eq!(report.sortino_ratio, MetricValue::NoDownsideVolatility);
        assert!(report.message.is_none());
    }

    #[test]
    fn single_snapshot_marks_advanced_metrics_unavailable() {
        let report = analyze(vec![], history(&[1_000.0]), date(1)).unwrap();
        assert_relative_eq!(report.initial_capital, 1_000.0);
        assert_relative_eq!(report.final_portfolio_value, 1_000.0);
        assert_eq!(report.annualized_return_percent, MetricValue::NotAvailable);
        assert_eq!(report.sharpe_ratio, MetricValue::NotAvailable);
        assert_eq!(report.max_drawdown_percent, MetricValue::NotAvailable);
        assert_eq!(report.sortino_ratio, MetricValue::NotAvailable);
        assert!(report.message.is_some());
    }

    #[test]
    fn empty_after_filter_is_error() {
        let err = analyze(vec![], history(&[1.0, 2.0]), date(10)).unwrap_err();
        assert_eq!(err, SimError::EmptyHistory { start: date(10) });
    }

    #[test]
    fn metrics_use_filtered_history_but_report_keeps_all() {
        let report = analyze(vec![], history(&[500.0, 1_000.0, 1_100.0]), date(2)).unwrap();
        assert_relative_eq!(report.initial_capital, 1_000.0);
        assert_relative_eq!(report.total_return_percent, 10.0);
        assert_eq!(report.portfolio_history.len(), 3);
    }

    #[test]
    fn drawdown_and_calmar() {
        // returns: +10%, -50%, +20%
        let values = [100.0, 110.0, 55.0, 66.0];
        assert_relative_eq!(max_drawdown(&values), -0.5);

        let report = analyze(vec![], history(&values), date(1)).unwrap();
        assert_eq!(report.max_drawdown_percent, MetricValue::Value(-50.0));
        assert_relative_eq!(report.total_return_percent, -34.0);

        let mean_return = (0.1 - 0.5 + 0.2) / 3.0;
        let annualized: f64 = (1.0_f64 + mean_return).powf(252.0) - 1.0;
        assert_eq!(
            report.calmar_ratio,
            MetricValue::Value(round_to(annualized / 0.5, 2))
        );
        // a single negative return has zero dispersion
        assert_eq!(report.sortino_ratio, MetricValue::NotAvailable);
    }

    #[test]
    fn sharpe_and_sortino_values() {
        let values = [100.0, 102.0, 99.96, 101.9592, 99.920016];
        let report = analyze(vec![], history(&values), date(1)).unwrap();

        let returns = daily_returns(&values);
        let m = mean(&returns).unwrap();
        let annualized = (1.0 + m).powf(252.0) - 1.0;
        let vol = population_stddev(&returns).unwrap() * 252f64.sqrt();
        assert_eq!(
            report.sharpe_ratio,
            MetricValue::Value(round_to((annualized - 0.02) / vol, 2))
        );
    }

    #[test]
    fn sortino_with_varied_downside() {
        let values = [100.0, 95.0, 100.0, 90.0, 100.0];
        let report = analyze(vec![], history(&values), date(1)).unwrap();
        assert!(report.sortino_ratio.value().is_some());
    }

    #[test]
    fn daily_returns_zero_previous() {
        assert_eq!(daily_returns(&[0.0, 10.0, 20.0]), vec![0.0, 1.0]);
    }

    #[test]
    fn report_json_shape() {
        let report = analyze(vec![], history(&[1_000.0]), date(1)).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["initial_capital"], 1_000.0);
        assert_eq!(json["sharpe_ratio"], "N/A");
        assert!(json["message"].is_string());
        assert!(json["transactions"].as_array().unwrap().is_empty());

        let report = analyze(vec![], history(&[1_000.0, 1_000.0]), date(1)).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["sortino_ratio"], "N/A (No downside volatility)");
        assert_eq!(json["max_drawdown_percent"], 0.0);
        assert!(json.get("message").is_none());
    }
}
