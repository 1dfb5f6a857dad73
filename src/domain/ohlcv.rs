//! Daily OHLCV bar.

use chrono::NaiveDate;

use crate::domain::position::Direction;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Not every vendor file carries volume; the engine never reads it.
    pub volume: Option<f64>,
}

impl OhlcvBar {
    /// Wilder's true range. Without a prior close this is just high - low.
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        let hl = self.high - self.low;
        match prev_close {
            Some(pc) => hl.max((self.high - pc).abs()).max((self.low - pc).abs()),
            None => hl,
        }
    }

    /// True when the bar trades through `level` against a `direction` position.
    pub fn reaches_against(&self, direction: Direction, level: f64) -> bool {
        match direction {
            Direction::Long => self.low <= level,
            Direction::Short => self.high >= level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar() -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            open: 50.0,
            high: 54.0,
            low: 47.0,
            close: 52.0,
            volume: None,
        }
    }

    #[test]
    fn true_range_without_prior_close() {
        assert_eq!(bar().true_range(None), 7.0);
    }

    #[test]
    fn true_range_takes_largest_span() {
        let b = bar();
        assert_eq!(b.true_range(Some(50.0)), 7.0);
        // gap up from 40: |54 - 40| = 14
        assert_eq!(b.true_range(Some(40.0)), 14.0);
        // gap down from 60: |47 - 60| = 13
        assert_eq!(b.true_range(Some(60.0)), 13.0);
    }

    #[test]
    fn reaches_against_checks_adverse_side() {
        let b = bar();
        assert!(b.reaches_against(Direction::Long, 47.0));
        assert!(!b.reaches_against(Direction::Long, 46.9));
        assert!(b.reaches_against(Direction::Short, 54.0));
        assert!(!b.reaches_against(Direction::Short, 54.5));
    }
}
