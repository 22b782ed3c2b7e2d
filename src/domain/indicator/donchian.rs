//! Donchian channel over closing prices.
//!
//! Highest and lowest close of the `window` bars immediately before today;
//! today's close is excluded. Uses closes, not intrabar highs/lows.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DonchianChannel {
    pub highest: f64,
    pub lowest: f64,
}

/// `closes` ends with today. Needs `window + 1` values.
pub fn donchian(closes: &[f64], window: usize) -> Option<DonchianChannel> {
    if window == 0 || closes.len() < window + 1 {
        return None;
    }

    let end = closes.len() - 1;
    let prior = &closes[end - window..end];
    let highest = prior.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let lowest = prior.iter().copied().fold(f64::INFINITY, f64::min);

    Some(DonchianChannel { highest, lowest })
}
