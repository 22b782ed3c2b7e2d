//! Built-in strategies and the custom rule strategy.
//!
//! Strategy selection is resolved once into `StrategyParams`; each day the
//! driver asks [`decide`] for a [`Signal`] and hands it to [`execute`], which
//! sizes the order and applies it to the ledger.
//!
//! Sizing is uniform across variants: buy `floor(cash / close)` shares only
//! when flat, sell the whole position only when long. No shorting.

use crate::domain::error::StratlabError;
use crate::domain::indicator::{bollinger, donchian, macd, sma, stochastic};
use crate::domain::ohlcv::Bar;
use crate::domain::portfolio::{FillResult, Portfolio};
use crate::domain::rule::Rule;
use crate::domain::rule_eval;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    MaCrossover,
    BollingerBands,
    Macd,
    DonchianBreakout,
    Stochastic,
    Custom,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 6] = [
        StrategyKind::MaCrossover,
        StrategyKind::BollingerBands,
        StrategyKind::Macd,
        StrategyKind::DonchianBreakout,
        StrategyKind::Stochastic,
        StrategyKind::Custom,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::MaCrossover => "maCrossover",
            StrategyKind::BollingerBands => "bollingerBands",
            StrategyKind::Macd => "MACD",
            StrategyKind::DonchianBreakout => "donchianChannelBreakout",
            StrategyKind::Stochastic => "stochasticOscillator",
            StrategyKind::Custom => "customStrategy",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = StratlabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s.trim())
            .ok_or_else(|| StratlabError::UnknownStrategy {
                name: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomRules {
    pub buy: Rule,
    pub sell: Rule,
}

/// Strategy variant with its parameters. Serialises as
/// `{"strategyName": "...", "strategyParams": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "strategyName",
    content = "strategyParams",
    rename_all_fields = "camelCase"
)]
pub enum StrategyParams {
    #[serde(rename = "maCrossover")]
    MaCrossover { short_window: usize, long_window: usize },
    #[serde(rename = "bollingerBands")]
    BollingerBands { window: usize, num_std_dev: f64 },
    #[serde(rename = "MACD")]
    Macd { fast: usize, slow: usize, signal: usize },
    #[serde(rename = "donchianChannelBreakout")]
    DonchianBreakout { window: usize },
    #[serde(rename = "stochasticOscillator")]
    Stochastic {
        k_period: usize,
        d_period: usize,
        oversold: f64,
        overbought: f64,
    },
    #[serde(rename = "customStrategy")]
    Custom { rules: CustomRules },
}

impl StrategyParams {
    /// Parameters used when a variant is selected without explicit values.
    /// `Custom` has no sensible default and returns `None`.
    pub fn defaults(kind: StrategyKind) -> Option<Self> {
        match kind {
            StrategyKind::MaCrossover => Some(StrategyParams::MaCrossover {
                short_window: 5,
                long_window: 20,
            }),
            StrategyKind::BollingerBands => Some(StrategyParams::BollingerBands {
                window: 20,
                num_std_dev: 2.0,
            }),
            StrategyKind::Macd => Some(StrategyParams::Macd {
                fast: 12,
                slow: 26,
                signal: 9,
            }),
            StrategyKind::DonchianBreakout => Some(StrategyParams::DonchianBreakout { window: 20 }),
            StrategyKind::Stochastic => Some(StrategyParams::Stochastic {
                k_period: 14,
                d_period: 3,
                oversold: 20.0,
                overbought: 80.0,
            }),
            StrategyKind::Custom => None,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            StrategyParams::MaCrossover { .. } => StrategyKind::MaCrossover,
            StrategyParams::BollingerBands { .. } => StrategyKind::BollingerBands,
            StrategyParams::Macd { .. } => StrategyKind::Macd,
            StrategyParams::DonchianBreakout { .. } => StrategyKind::DonchianBreakout,
            StrategyParams::Stochastic { .. } => StrategyKind::Stochastic,
            StrategyParams::Custom { .. } => StrategyKind::Custom,
        }
    }

    /// Bars (including today) needed before the strategy will act.
    pub fn min_history(&self) -> usize {
        match self {
            StrategyParams::MaCrossover { long_window, .. } => long_window + 1,
            StrategyParams::BollingerBands { window, .. } => *window,
            StrategyParams::Macd { slow, signal, .. } => slow + signal,
            StrategyParams::DonchianBreakout { window } => window + 1,
            StrategyParams::Stochastic {
                k_period, d_period, ..
            } => k_period + d_period,
            StrategyParams::Custom { .. } => 1,
        }
    }
}

impl fmt::Display for StrategyParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyParams::MaCrossover {
                short_window,
                long_window,
            } => write!(f, "maCrossover(short={}, long={})", short_window, long_window),
            StrategyParams::BollingerBands {
                window,
                num_std_dev,
            } => write!(f, "bollingerBands(window={}, k={})", window, num_std_dev),
            StrategyParams::Macd { fast, slow, signal } => {
                write!(f, "MACD(fast={}, slow={}, signal={})", fast, slow, signal)
            }
            StrategyParams::DonchianBreakout { window } => {
                write!(f, "donchianChannelBreakout(window={})", window)
            }
            StrategyParams::Stochastic {
                k_period,
                d_period,
                oversold,
                overbought,
            } => write!(
                f,
                "stochasticOscillator(k={}, d={}, oversold={}, overbought={})",
                k_period, d_period, oversold, overbought
            ),
            StrategyParams::Custom { rules } => {
                write!(f, "customStrategy(buy={}, sell={})", rules.buy, rules.sell)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

/// Decides today's action from the closes up to and including today and the
/// shares currently held. Buys are only signalled when flat, sells only when
/// long.
pub fn decide(params: &StrategyParams, closes: &[f64], held: u64) -> Signal {
    if closes.len() < params.min_history() {
        return Signal::Hold;
    }
    let flat = held == 0;
    let close = closes[closes.len() - 1];
    let previous = &closes[..closes.len() - 1];

    let (buy, sell) = match params {
        StrategyParams::MaCrossover {
            short_window,
            long_window,
        } => {
            let (Some(short), Some(long), Some(prev_short), Some(prev_long)) = (
                sma(closes, *short_window),
                sma(closes, *long_window),
                sma(previous, *short_window),
                sma(previous, *long_window),
            ) else {
                return Signal::Hold;
            };
            (
                short > long && prev_short <= prev_long,
                short < long && prev_short >= prev_long,
            )
        }
        StrategyParams::BollingerBands {
            window,
            num_std_dev,
        } => match bollinger(closes, *window, *num_std_dev) {
            Some(bands) => (close < bands.lower, close > bands.upper),
            None => return Signal::Hold,
        },
        StrategyParams::Macd { fast, slow, signal } => match macd(closes, *fast, *slow, *signal) {
            Some(m) => (
                m.prev_line <= m.prev_signal && m.line > m.signal,
                m.prev_line >= m.prev_signal && m.line < m.signal,
            ),
            None => return Signal::Hold,
        },
        StrategyParams::DonchianBreakout { window } => match donchian(closes, *window) {
            Some(channel) => (close > channel.highest, close < channel.lowest),
            None => return Signal::Hold,
        },
        StrategyParams::Stochastic {
            k_period,
            d_period,
            oversold,
            overbought,
        } => match stochastic(closes, *k_period, *d_period) {
            Some(s) => (
                s.k < *oversold && s.k > s.d,
                s.k > *overbought && s.k < s.d,
            ),
            None => return Signal::Hold,
        },
        StrategyParams::Custom { rules } => (
            rule_eval::evaluate(&rules.buy, closes),
            rule_eval::evaluate(&rules.sell, closes),
        ),
    };

    if buy && flat {
        Signal::Buy
    } else if sell && !flat {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

/// Runs the strategy for one ticker on one day and applies the resulting
/// order to the ledger. `history` ends with today's bar.
pub fn execute(
    params: &StrategyParams,
    portfolio: &mut Portfolio,
    ticker: &str,
    history: &[Bar],
) -> Option<FillResult> {
    let today = history.last()?;
    let closes: Vec<f64> = history.iter().map(|bar| bar.close).collect();
    let held = portfolio.shares(ticker);

    match decide(params, &closes, held) {
        Signal::Buy => {
            if today.close <= 0.0 {
                return None;
            }
            let shares = (portfolio.cash() / today.close).floor() as u64;
            if shares == 0 {
                return None;
            }
            Some(portfolio.buy(ticker, shares, today.close, today.date))
        }
        Signal::Sell => Some(portfolio.sell(ticker, held, today.close, today.date)),
        Signal::Hold => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::{Comparison, Condition};
    use chrono::NaiveDate;

    fn bars(closes: &[f64]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1_000.0,
            })
            .collect()
    }

    #[test]
    fn kind_round_trips_through_name() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.name().parse::<StrategyKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_is_error() {
        let err = "meanReversion".parse::<StrategyKind>().unwrap_err();
        assert!(matches!(err, StratlabError::UnknownStrategy { .. }));
    }

    #[test]
    fn defaults_match_kind() {
        for kind in StrategyKind::ALL {
            if let Some(params) = StrategyParams::defaults(kind) {
                assert_eq!(params.kind(), kind);
            }
        }
        assert!(StrategyParams::defaults(StrategyKind::Custom).is_none());
    }

    #[test]
    fn min_history_per_variant() {
        let cases = [
            (StrategyParams::defaults(StrategyKind::MaCrossover), 21),
            (StrategyParams::defaults(StrategyKind::BollingerBands), 20),
            (StrategyParams::defaults(StrategyKind::Macd), 35),
            (StrategyParams::defaults(StrategyKind::DonchianBreakout), 21),
            (StrategyParams::defaults(StrategyKind::Stochastic), 17),
        ];
        for (params, expected) in cases {
            assert_eq!(params.unwrap().min_history(), expected);
        }
    }

    #[test]
    fn ma_crossover_golden_and_death_cross() {
        let params = StrategyParams::MaCrossover {
            short_window: 2,
            long_window: 3,
        };
        // day 4 (12): short 11 > long 10.67, previous short 10 <= long 10
        assert_eq!(decide(&params, &[10.0, 10.0, 10.0, 12.0], 0), Signal::Buy);
        // already long: no second buy
        assert_eq!(decide(&params, &[10.0, 10.0, 10.0, 12.0], 5), Signal::Hold);
        // day 5 (8): short 10 == long 10, no cross yet
        assert_eq!(decide(&params, &[10.0, 10.0, 10.0, 12.0, 8.0], 5), Signal::Hold);
        assert_eq!(decide(&params, &[10.0, 10.0, 10.0, 12.0, 8.0], 0), Signal::Hold);
        // day 6 (15): short 11.5 < long 11.67, previous 10 >= 10
        let closes = [10.0, 10.0, 10.0, 12.0, 8.0, 15.0];
        assert_eq!(decide(&params, &closes, 5), Signal::Sell);
        assert_eq!(decide(&params, &closes, 0), Signal::Hold);
    }

    #[test]
    fn ma_crossover_needs_long_window_plus_one() {
        let params = StrategyParams::MaCrossover {
            short_window: 2,
            long_window: 3,
        };
        assert_eq!(decide(&params, &[10.0, 10.0, 12.0], 0), Signal::Hold);
    }

    #[test]
    fn bollinger_buys_below_lower_band() {
        let params = StrategyParams::BollingerBands {
            window: 3,
            num_std_dev: 1.0,
        };
        assert_eq!(decide(&params, &[10.0, 10.0, 5.0], 0), Signal::Buy);
        assert_eq!(decide(&params, &[10.0, 10.0, 20.0], 0), Signal::Hold);
        assert_eq!(decide(&params, &[10.0, 10.0, 20.0], 1), Signal::Sell);
        assert_eq!(decide(&params, &[10.0, 10.0, 10.0], 1), Signal::Hold);
    }

    #[test]
    fn donchian_breakout() {
        let params = StrategyParams::DonchianBreakout { window: 2 };
        assert_eq!(decide(&params, &[5.0, 6.0, 7.0, 20.0], 0), Signal::Buy);
        assert_eq!(decide(&params, &[5.0, 6.0, 7.0, 20.0, 3.0], 10), Signal::Sell);
        assert_eq!(decide(&params, &[5.0, 6.0], 0), Signal::Hold);
    }

    #[test]
    fn stochastic_oversold_turning_up() {
        let params = StrategyParams::Stochastic {
            k_period: 3,
            d_period: 2,
            oversold: 20.0,
            overbought: 80.0,
        };
        // today window [10,0,1]: %K 10; yesterday window [5,10,0]: %K 0; %D 5
        assert_eq!(decide(&params, &[9.0, 5.0, 10.0, 0.0, 1.0], 0), Signal::Buy);
        // held: no buy
        assert_eq!(decide(&params, &[9.0, 5.0, 10.0, 0.0, 1.0], 3), Signal::Hold);
    }

    #[test]
    fn stochastic_overbought_turning_down() {
        let params = StrategyParams::Stochastic {
            k_period: 3,
            d_period: 2,
            oversold: 20.0,
            overbought: 80.0,
        };
        // today window [0,10,9]: %K 90; yesterday window [5,0,10]: %K 100; %D 95
        assert_eq!(decide(&params, &[1.0, 5.0, 0.0, 10.0, 9.0], 3), Signal::Sell);
    }

    #[test]
    fn stochastic_needs_k_plus_d_bars() {
        let params = StrategyParams::Stochastic {
            k_period: 3,
            d_period: 2,
            oversold: 20.0,
            overbought: 80.0,
        };
        assert_eq!(decide(&params, &[5.0, 10.0, 0.0, 1.0], 0), Signal::Hold);
    }

    #[test]
    fn macd_crosses() {
        let params = StrategyParams::Macd {
            fast: 1,
            slow: 2,
            signal: 1,
        };
        // [0,10,10]: line 1.667, signal 0, prev line = prev signal = 5
        assert_eq!(decide(&params, &[0.0, 10.0, 10.0], 0), Signal::Buy);
        assert_eq!(decide(&params, &[0.0, 10.0, 10.0], 4), Signal::Hold);
        // [10,0,0]: line -1.667, signal 0
        assert_eq!(decide(&params, &[10.0, 0.0, 0.0], 4), Signal::Sell);
    }

    #[test]
    fn macd_flat_prices_hold() {
        let params = StrategyParams::Macd {
            fast: 2,
            slow: 4,
            signal: 2,
        };
        assert_eq!(decide(&params, &[5.0; 10], 0), Signal::Hold);
    }

    #[test]
    fn custom_rule_buy_and_sell() {
        let params = StrategyParams::Custom {
            rules: CustomRules {
                buy: Rule::all(vec![Condition::PriceThreshold {
                    operator: Comparison::Lt,
                    value: 50.0,
                }]),
                sell: Rule::all(vec![Condition::PriceThreshold {
                    operator: Comparison::Gt,
                    value: 60.0,
                }]),
            },
        };
        assert_eq!(decide(&params, &[45.0], 0), Signal::Buy);
        assert_eq!(decide(&params, &[45.0], 10), Signal::Hold);
        assert_eq!(decide(&params, &[65.0], 10), Signal::Sell);
        assert_eq!(decide(&params, &[55.0], 10), Signal::Hold);
    }

    #[test]
    fn execute_buys_all_in_and_sells_all() {
        let params = StrategyParams::DonchianBreakout { window: 2 };
        let history = bars(&[5.0, 6.0, 7.0, 20.0, 3.0]);
        let mut portfolio = Portfolio::new(1_000.0);

        let fill = execute(&params, &mut portfolio, "XYZ", &history[..4]);
        assert_eq!(
            fill,
            Some(FillResult::Filled {
                shares: 50,
                price: 20.0
            })
        );
        assert_eq!(portfolio.shares("XYZ"), 50);
        assert!((portfolio.cash() - 0.0).abs() < 1e-9);

        let fill = execute(&params, &mut portfolio, "XYZ", &history);
        assert_eq!(
            fill,
            Some(FillResult::Filled {
                shares: 50,
                price: 3.0
            })
        );
        assert_eq!(portfolio.shares("XYZ"), 0);
        assert!((portfolio.cash() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn execute_skips_buy_when_cash_below_price() {
        let params = StrategyParams::Custom {
            rules: CustomRules {
                buy: Rule::all(vec![Condition::PriceThreshold {
                    operator: Comparison::Gt,
                    value: 0.0,
                }]),
                sell: Rule::any(vec![]),
            },
        };
        let mut portfolio = Portfolio::new(10.0);
        assert_eq!(execute(&params, &mut portfolio, "XYZ", &bars(&[25.0])), None);
        assert!(portfolio.transactions().is_empty());
    }

    #[test]
    fn params_json_shape() {
        let params = StrategyParams::Stochastic {
            k_period: 14,
            d_period: 3,
            oversold: 20.0,
            overbought: 80.0,
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["strategyName"], "stochasticOscillator");
        assert_eq!(json["strategyParams"]["kPeriod"], 14);
        assert_eq!(json["strategyParams"]["overbought"], 80.0);
    }

    #[test]
    fn custom_params_from_json() {
        let json = r#"{
            "strategyName": "customStrategy",
            "strategyParams": {
                "rules": {
                    "buy": {"operator": "AND", "conditions": [{"type": "rsi", "period": 14, "operator": "lt", "value": 30}]},
                    "sell": {"operator": "OR", "conditions": [{"type": "priceThreshold", "operator": "gt", "value": 200}]}
                }
            }
        }"#;
        let params: StrategyParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.kind(), StrategyKind::Custom);
        assert_eq!(params.min_history(), 1);
    }

    #[test]
    fn params_display() {
        let params = StrategyParams::MaCrossover {
            short_window: 5,
            long_window: 20,
        };
        assert_eq!(params.to_string(), "maCrossover(short=5, long=20)");
    }
}
