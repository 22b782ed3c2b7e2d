//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the SMA of the first n values of the slice, then
//! EMA = C*k + EMA_prev*(1-k) for every remaining value. The result depends on
//! where the slice starts; callers choose the window.

pub fn ema(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let seed = closes[..period].iter().sum::<f64>() / period as f64;

    Some(
        closes[period..]
            .iter()
            .fold(seed, |prev, &close| close * k + prev * (1.0 - k)),
    )
}
