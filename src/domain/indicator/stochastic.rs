//! Stochastic oscillator over closing prices.
//!
//! %K = (C - LL) / (HH - LL) * 100, where HH/LL are the highest/lowest close of
//! the trailing k bars including today (closes, not intrabar highs/lows).
//! %D = mean of %K recomputed at each of the last d offsets.
//!
//! A flat window (HH == LL) has no defined %K and yields `None`.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stochastic {
    pub k: f64,
    pub d: f64,
}

pub fn stochastic_k(closes: &[f64], k_period: usize) -> Option<f64> {
    if k_period == 0 || closes.len() < k_period {
        return None;
    }

    let window = &closes[closes.len() - k_period..];
    let high = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let low = window.iter().copied().fold(f64::INFINITY, f64::min);
    let range = high - low;
    if range == 0.0 {
        return None;
    }

    let close = closes[closes.len() - 1];
    Some((close - low) / range * 100.0)
}

/// Needs `k_period + d_period - 1` closes.
pub fn stochastic(closes: &[f64], k_period: usize, d_period: usize) -> Option<Stochastic> {
    if k_period == 0 || d_period == 0 || closes.len() < k_period + d_period - 1 {
        return None;
    }

    let k = stochastic_k(closes, k_period)?;
    let mut sum = 0.0;
    for offset in 0..d_period {
        sum += stochastic_k(&closes[..closes.len() - offset], k_period)?;
    }

    Some(Stochastic {
        k,
        d: sum / d_period as f64,
    })
}
