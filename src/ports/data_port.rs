//! Historical price data access.

use crate::domain::error::StratlabError;
use crate::domain::ohlcv::Bar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `ticker` with `start <= date <= end`, ascending by date.
    fn fetch_bars(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, StratlabError>;

    /// Known tickers, sorted.
    fn list_tickers(&self) -> Result<Vec<String>, StratlabError>;

    /// First date, last date and bar count, or `None` if the ticker is unknown.
    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StratlabError>;
}
