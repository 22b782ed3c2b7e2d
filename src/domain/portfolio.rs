//! Portfolio ledger: cash, share counts, transaction log and snapshot history.
//!
//! `buy` and `sell` are the only ways positions and cash change. Rejected
//! trades are not errors; they leave the ledger untouched and report why.
//! Arithmetic runs at full precision; transaction and snapshot records are
//! rounded (prices to 4 places, money to 2).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeType {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

/// One executed trade. Exactly one of `cost` / `revenue` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    pub ticker: String,
    pub shares: u64,
    pub price: f64,
    pub cost: Option<f64>,
    pub revenue: Option<f64>,
    pub cash_after: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub date: NaiveDate,
    pub cash: f64,
    pub positions: BTreeMap<String, u64>,
    pub total_value: f64,
}

/// Outcome of a `buy` / `sell` request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FillResult {
    Filled { shares: u64, price: f64 },
    InsufficientCash { required: f64, available: f64 },
    InsufficientShares { requested: u64, held: u64 },
}

impl FillResult {
    pub fn is_filled(&self) -> bool {
        matches!(self, FillResult::Filled { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub initial_capital: f64,
    cash: f64,
    positions: BTreeMap<String, u64>,
    transactions: Vec<Transaction>,
    history: Vec<PortfolioSnapshot>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            initial_capital,
            cash: initial_capital,
            positions: BTreeMap::new(),
            transactions: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Shares held; absence is zero.
    pub fn shares(&self, ticker: &str) -> u64 {
        self.positions.get(ticker).copied().unwrap_or(0)
    }

    pub fn positions(&self) -> &BTreeMap<String, u64> {
        &self.positions
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn history(&self) -> &[PortfolioSnapshot] {
        &self.history
    }

    pub fn buy(&mut self, ticker: &str, shares: u64, price: f64, date: NaiveDate) -> FillResult {
        let cost = shares as f64 * price;
        if self.cash < cost {
            debug!(%date, ticker, shares, price, cash = self.cash, "buy skipped: insufficient cash");
            return FillResult::InsufficientCash {
                required: cost,
                available: self.cash,
            };
        }

        self.cash -= cost;
        *self.positions.entry(ticker.to_string()).or_insert(0) += shares;
        self.transactions.push(Transaction {
            date,
            trade_type: TradeType::Buy,
            ticker: ticker.to_string(),
            shares,
            price: round_to(price, 4),
            cost: Some(round_to(cost, 2)),
            revenue: None,
            cash_after: round_to(self.cash, 2),
        });
        debug!(%date, ticker, shares, price, cash = self.cash, "buy filled");

        FillResult::Filled { shares, price }
    }

    pub fn sell(&mut self, ticker: &str, shares: u64, price: f64, date: NaiveDate) -> FillResult {
        let held = self.shares(ticker);
        if held == 0 || held < shares {
            debug!(%date, ticker, shares, held, "sell skipped: insufficient shares");
            return FillResult::InsufficientShares {
                requested: shares,
                held,
            };
        }

        let revenue = shares as f64 * price;
        self.cash += revenue;
        if held == shares {
            self.positions.remove(ticker);
        } else {
            self.positions.insert(ticker.to_string(), held - shares);
        }
        self.transactions.push(Transaction {
            date,
            trade_type: TradeType::Sell,
            ticker: ticker.to_string(),
            shares,
            price: round_to(price, 4),
            cost: None,
            revenue: Some(round_to(revenue, 2)),
            cash_after: round_to(self.cash, 2),
        });
        debug!(%date, ticker, shares, price, cash = self.cash, "sell filled");

        FillResult::Filled { shares, price }
    }

    /// Cash plus each position marked at its price in `prices`. Positions
    /// without a price contribute nothing.
    pub fn market_value(&self, prices: &HashMap<String, f64>) -> f64 {
        let positions_value: f64 = self
            .positions
            .iter()
            .filter_map(|(ticker, &shares)| prices.get(ticker).map(|p| shares as f64 * p))
            .sum();
        self.cash + positions_value
    }

    pub fn record_snapshot(&mut self, date: NaiveDate, total_value: f64) {
        self.history.push(PortfolioSnapshot {
            date,
            cash: round_to(self.cash, 2),
            positions: self.positions.clone(),
            total_value: round_to(total_value, 2),
        });
    }

    /// Consumes the ledger, returning its transaction log and snapshot history.
    pub fn into_records(self) -> (Vec<Transaction>, Vec<PortfolioSnapshot>) {
        (self.transactions, self.history)
    }
}
