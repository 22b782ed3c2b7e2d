//! Custom rule evaluation.
//!
//! Evaluates a rule against the closing prices up to and including today.
//!
//! # Evaluation Semantics
//!
//! - `AND` folds from `true`, `OR` folds from `false`; every condition is
//!   evaluated (no short-circuit)
//! - A condition without enough history evaluates to `false`
//! - `PRICE = v` and `RSI(n) = v` compare with a 1e-9 tolerance
//! - `MA_CROSS` tests the current relation of the short and long SMA
//! - `BOLLINGER` tests a cross of the close through the band between
//!   yesterday and today

use crate::domain::indicator::{bollinger, rsi, sma};
use crate::domain::rule::{Band, Combinator, Comparison, Condition, CrossDirection, MaDirection, Rule};

const EPSILON: f64 = 1e-9;

pub fn evaluate(rule: &Rule, closes: &[f64]) -> bool {
    match rule.operator {
        Combinator::And => rule
            .conditions
            .iter()
            .fold(true, |acc, c| evaluate_condition(c, closes) && acc),
        Combinator::Or => rule
            .conditions
            .iter()
            .fold(false, |acc, c| evaluate_condition(c, closes) || acc),
    }
}

pub fn evaluate_condition(condition: &Condition, closes: &[f64]) -> bool {
    match condition {
        Condition::PriceThreshold { operator, value } => match closes.last() {
            Some(&close) => compare(close, *operator, *value),
            None => false,
        },
        Condition::MaCrossover {
            short_window,
            long_window,
            direction,
        } => {
            let (Some(short), Some(long)) = (sma(closes, *short_window), sma(closes, *long_window))
            else {
                return false;
            };
            match direction {
                MaDirection::Above => short > long,
                MaDirection::Below => short < long,
            }
        }
        Condition::Rsi {
            period,
            operator,
            value,
        } => rsi(closes, *period).is_some_and(|r| compare(r, *operator, *value)),
        Condition::BollingerBand {
            window,
            num_std_dev,
            band,
            direction,
        } => {
            if closes.len() < 2 {
                return false;
            }
            let previous = &closes[..closes.len() - 1];
            let (Some(today), Some(yesterday)) = (
                bollinger(closes, *window, *num_std_dev),
                bollinger(previous, *window, *num_std_dev),
            ) else {
                return false;
            };
            let (level, prev_level) = match band {
                Band::Upper => (today.upper, yesterday.upper),
                Band::Lower => (today.lower, yesterday.lower),
            };
            let close = closes[closes.len() - 1];
            let prev_close = previous[previous.len() - 1];
            match direction {
                CrossDirection::CrossAbove => prev_close <= prev_level && close > level,
                CrossDirection::CrossBelow => prev_close >= prev_level && close < level,
            }
        }
    }
}

fn compare(left: f64, operator: Comparison, right: f64) -> bool {
    match operator {
        Comparison::Lt => left < right,
        Comparison::Gt => left > right,
        Comparison::Eq => (left - right).abs() < EPSILON,
    }
}
