//! Per-ticker bar series and the unified simulation calendar.

use crate::domain::error::SimError;
use crate::domain::ohlcv::Bar;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

/// Bars for one ticker, strictly increasing by date.
#[derive(Debug, Clone)]
pub struct InstrumentSeries {
    pub ticker: String,
    bars: Vec<Bar>,
    date_index: HashMap<NaiveDate, usize>,
}

impl InstrumentSeries {
    pub fn new(ticker: impl Into<String>, bars: Vec<Bar>) -> Result<Self, SimError> {
        let ticker = ticker.into();
        if let Some(w) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(SimError::InvalidSeries {
                ticker,
                reason: format!(
                    "dates must be strictly increasing ({} followed by {})",
                    w[0].date, w[1].date
                ),
            });
        }
        let date_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();
        Ok(Self {
            ticker,
            bars,
            date_index,
        })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Bars up to and including `date`, or `None` if there is no bar on `date`.
    pub fn history_through(&self, date: NaiveDate) -> Option<&[Bar]> {
        self.date_index.get(&date).map(|&i| &self.bars[..=i])
    }
}

/// Sorted union of distinct dates across all series.
pub fn build_calendar(series: &[InstrumentSeries]) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = series
        .iter()
        .flat_map(|s| s.bars.iter().map(|bar| bar.date))
        .collect();
    unique_dates.into_iter().collect()
}
