//! Bollinger Bands.
//!
//! Middle = SMA(n), Upper = Middle + k * STDDEV(n), Lower = Middle - k * STDDEV(n),
//! using the population standard deviation of the trailing n closes (today included).

use super::stddev::{mean, population_stddev};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

pub fn bollinger(closes: &[f64], window: usize, num_std_dev: f64) -> Option<BollingerBands> {
    if window == 0 || closes.len() < window {
        return None;
    }

    let slice = &closes[closes.len() - window..];
    let middle = mean(slice)?;
    let sigma = population_stddev(slice)?;

    Some(BollingerBands {
        upper: middle + num_std_dev * sigma,
        middle,
        lower: middle - num_std_dev * sigma,
    })
}
