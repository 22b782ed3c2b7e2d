//! MACD (Moving Average Convergence Divergence).
//!
//! Everything is recomputed from the trailing `slow + signal` closes:
//! - line = EMA(fast) - EMA(slow) over the whole trailing window
//! - a MACD sequence of `signal + 1` values, one per `slow`-sized sub-window
//!   sliding across the trailing window
//! - signal = mean of the last `signal` sequence values
//! - prev_line / prev_signal = first sequence value / mean of the first
//!   `signal` sequence values, i.e. the same pair one step earlier
//!
//! Requires `fast <= slow`.

use super::ema::ema;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Macd {
    pub line: f64,
    pub signal: f64,
    pub prev_line: f64,
    pub prev_signal: f64,
}

pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Option<Macd> {
    if fast == 0 || signal == 0 || fast > slow || closes.len() < slow + signal {
        return None;
    }

    let window = &closes[closes.len() - slow - signal..];
    let line = ema(window, fast)? - ema(window, slow)?;

    let mut sequence = Vec::with_capacity(signal + 1);
    for start in 0..=signal {
        let sub = &window[start..start + slow];
        sequence.push(ema(sub, fast)? - ema(sub, slow)?);
    }

    let signal_line = sequence[1..].iter().sum::<f64>() / signal as f64;
    let prev_signal = sequence[..signal].iter().sum::<f64>() / signal as f64;

    Some(Macd {
        line,
        signal: signal_line,
        prev_line: sequence[0],
        prev_signal,
    })
}
