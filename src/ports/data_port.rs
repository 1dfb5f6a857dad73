//! Data access port trait.

use crate::domain::error::TurtleError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

/// A source of daily bars for one instrument.
pub trait DataPort {
    /// Bars with `start <= date <= end`, oldest first. `None` leaves that
    /// side of the range open.
    fn fetch_ohlcv(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, TurtleError>;

    /// First date, last date and bar count, or `None` for an empty source.
    fn get_data_range(&self) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TurtleError>;
}
