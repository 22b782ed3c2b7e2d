//! Configuration and strategy parameter validation.
//!
//! Runs before any data is fetched so bad input fails fast with the offending
//! section and key.

use crate::domain::error::StratlabError;
use crate::domain::rule::{Condition, Rule};
use crate::domain::strategy::StrategyParams;
use crate::domain::universe::parse_tickers;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> StratlabError {
    StratlabError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), StratlabError> {
    validate_initial_capital(config)?;
    validate_dates(config)?;
    validate_tickers(config)?;
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), StratlabError> {
    if let Some(raw) = config.get_string("backtest", "initial_capital") {
        match raw.trim().parse::<f64>() {
            Ok(v) if v > 0.0 && v.is_finite() => {}
            _ => {
                return Err(invalid(
                    "backtest",
                    "initial_capital",
                    "initial_capital must be a positive number",
                ));
            }
        }
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), StratlabError> {
    let data_start = parse_date(config, "data_start_date")?;
    let data_end = parse_date(config, "data_end_date")?;
    let sim_start = parse_date(config, "simulation_start_date")?;

    if data_start >= data_end {
        return Err(invalid(
            "backtest",
            "data_start_date",
            "data_start_date must be before data_end_date",
        ));
    }
    if sim_start < data_start || sim_start > data_end {
        return Err(invalid(
            "backtest",
            "simulation_start_date",
            "simulation_start_date must be within the data range",
        ));
    }
    Ok(())
}

pub fn parse_date(config: &dyn ConfigPort, key: &str) -> Result<NaiveDate, StratlabError> {
    let value = config
        .get_string("backtest", key)
        .ok_or_else(|| StratlabError::ConfigMissing {
            section: "backtest".to_string(),
            key: key.to_string(),
        })?;
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| invalid("backtest", key, format!("invalid {key} format, expected YYYY-MM-DD")))
}

fn validate_tickers(config: &dyn ConfigPort) -> Result<(), StratlabError> {
    let (key, value) = match (
        config.get_string("backtest", "tickers"),
        config.get_string("backtest", "ticker"),
    ) {
        (Some(list), _) => ("tickers", list),
        (None, Some(single)) => ("ticker", single),
        (None, None) => {
            return Err(StratlabError::ConfigMissing {
                section: "backtest".to_string(),
                key: "ticker".to_string(),
            });
        }
    };
    parse_tickers(&value)
        .map(|_| ())
        .map_err(|e| invalid("backtest", key, e.to_string()))
}

/// Checks the numeric constraints of a strategy's parameters.
pub fn validate_strategy_params(params: &StrategyParams) -> Result<(), StratlabError> {
    match params {
        StrategyParams::MaCrossover {
            short_window,
            long_window,
        } => {
            positive("short_window", *short_window)?;
            positive("long_window", *long_window)?;
            if short_window >= long_window {
                return Err(invalid(
                    "strategy",
                    "short_window",
                    "short_window must be less than long_window",
                ));
            }
        }
        StrategyParams::BollingerBands {
            window,
            num_std_dev,
        } => {
            positive("window", *window)?;
            if !(*num_std_dev > 0.0) {
                return Err(invalid("strategy", "num_std_dev", "num_std_dev must be greater than 0"));
            }
        }
        StrategyParams::Macd { fast, slow, signal } => {
            positive("fast", *fast)?;
            positive("slow", *slow)?;
            positive("signal", *signal)?;
            if fast >= slow {
                return Err(invalid("strategy", "fast", "fast must be less than slow"));
            }
        }
        StrategyParams::DonchianBreakout { window } => positive("window", *window)?,
        StrategyParams::Stochastic {
            k_period,
            d_period,
            oversold,
            overbought,
        } => {
            positive("k_period", *k_period)?;
            positive("d_period", *d_period)?;
            if !(0.0..=100.0).contains(oversold) || !(0.0..=100.0).contains(overbought) {
                return Err(invalid(
                    "strategy",
                    "oversold",
                    "oversold and overbought must be between 0 and 100",
                ));
            }
            if oversold >= overbought {
                return Err(invalid(
                    "strategy",
                    "oversold",
                    "oversold must be less than overbought",
                ));
            }
        }
        StrategyParams::Custom { rules } => {
            validate_rule("buy", &rules.buy)?;
            validate_rule("sell", &rules.sell)?;
        }
    }
    Ok(())
}

fn positive(key: &str, value: usize) -> Result<(), StratlabError> {
    if value == 0 {
        return Err(invalid("strategy", key, format!("{key} must be greater than 0")));
    }
    Ok(())
}

fn validate_rule(side: &str, rule: &Rule) -> Result<(), StratlabError> {
    if rule.conditions.is_empty() {
        return Err(StratlabError::RuleInvalid {
            reason: format!("{side} rule needs at least one condition"),
        });
    }
    for (i, condition) in rule.conditions.iter().enumerate() {
        validate_condition(condition).map_err(|reason| StratlabError::RuleInvalid {
            reason: format!("{side} condition {}: {reason}", i + 1),
        })?;
    }
    Ok(())
}

fn validate_condition(condition: &Condition) -> Result<(), String> {
    match condition {
        Condition::PriceThreshold { value, .. } => {
            if !(*value > 0.0) {
                return Err("price threshold must be greater than 0".to_string());
            }
        }
        Condition::MaCrossover {
            short_window,
            long_window,
            ..
        } => {
            if *short_window == 0 || *long_window == 0 {
                return Err("MA windows must be greater than 0".to_string());
            }
            if short_window >= long_window {
                return Err("short window must be less than long window".to_string());
            }
        }
        Condition::Rsi { period, value, .. } => {
            if *period == 0 {
                return Err("RSI period must be greater than 0".to_string());
            }
            if !(0.0..=100.0).contains(value) {
                return Err("RSI value must be between 0 and 100".to_string());
            }
        }
        Condition::BollingerBand {
            window,
            num_std_dev,
            ..
        } => {
            if *window == 0 {
                return Err("Bollinger window must be greater than 0".to_string());
            }
            if !(*num_std_dev > 0.0) {
                return Err("Bollinger standard deviations must be greater than 0".to_string());
            }
        }
    }
    Ok(())
}
