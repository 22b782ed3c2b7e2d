//! Technical indicator library.
//!
//! Every function is pure: it takes a chronologically ordered slice of closing
//! prices (oldest first, today last) and returns `None` when the slice is too
//! short for the requested window. Callers treat `None` as "no signal".
//!
//! Nothing here keeps state between calls; each value is recomputed from the
//! slice it is given.

pub mod bollinger;
pub mod donchian;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod stddev;
pub mod stochastic;

pub use bollinger::{bollinger, BollingerBands};
pub use donchian::{donchian, DonchianChannel};
pub use ema::ema;
pub use macd::{macd, Macd};
pub use rsi::rsi;
pub use stddev::{mean, population_stddev};
pub use stochastic::{stochastic, stochastic_k, Stochastic};

/// Simple moving average of the trailing `window` closes.
pub fn sma(closes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || closes.len() < window {
        return None;
    }
    mean(&closes[closes.len() - window..])
}
