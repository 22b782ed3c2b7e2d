//! RSI (Relative Strength Index).
//!
//! Simple averaging over the trailing `period` price changes, not Wilder's
//! smoothing:
//! - avg_gain = sum(gains) / n
//! - avg_loss = max(sum(losses) / n, LOSS_FLOOR)
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//!
//! Needs n + 1 closes (n changes).

const LOSS_FLOOR: f64 = 1e-10;

pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let window = &closes[closes.len() - period - 1..];
    let (gains, losses) = window.windows(2).fold((0.0, 0.0), |(g, l), w| {
        let change = w[1] - w[0];
        if change > 0.0 {
            (g + change, l)
        } else {
            (g, l - change)
        }
    });

    let avg_gain = gains / period as f64;
    let avg_loss = (losses / period as f64).max(LOSS_FLOOR);

    Some(100.0 - 100.0 / (1.0 + avg_gain / avg_loss))
}
