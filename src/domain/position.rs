//! Units, the single-instrument position, and closed trades.

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Stop,
    ChannelExit,
    EndOfData,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::Stop => "stop",
            ExitReason::ChannelExit => "channel_exit",
            ExitReason::EndOfData => "end_of_data",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pyramided entry lot.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    pub size: i64,
    pub stop_price: f64,
}

impl Unit {
    pub fn unrealized_pnl(&self, price: f64, point_value: f64) -> f64 {
        self.direction.sign() * (price - self.entry_price) * self.size as f64 * point_value
    }

    /// True when the bar's adverse extreme reaches the stop.
    pub fn stop_hit(&self, high: f64, low: f64) -> bool {
        match self.direction {
            Direction::Long => low <= self.stop_price,
            Direction::Short => high >= self.stop_price,
        }
    }
}

/// Open units for the instrument. Flat when `direction` is `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Position {
    pub direction: Option<Direction>,
    pub units: Vec<Unit>,
}

impl Position {
    pub fn is_flat(&self) -> bool {
        self.direction.is_none()
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Sum of open unit sizes.
    pub fn exposure(&self) -> i64 {
        self.units.iter().map(|u| u.size).sum()
    }

    pub fn last_unit(&self) -> Option<&Unit> {
        self.units.last()
    }

    pub fn unrealized_pnl(&self, price: f64, point_value: f64) -> f64 {
        self.units
            .iter()
            .map(|u| u.unrealized_pnl(price, point_value))
            .sum()
    }

    /// Append a unit and ratchet the earlier stops to it.
    ///
    /// Opening the first unit sets the position's direction.
    pub fn add_unit(&mut self, unit: Unit) {
        debug_assert!(self.direction.is_none_or(|d| d == unit.direction));
        self.direction = Some(unit.direction);
        self.units.push(unit);
        ratchet_stops(&mut self.units);
    }

    /// Remove and return every unit matching `pred`, oldest first.
    /// Goes flat when the last unit leaves.
    pub fn take_units<F>(&mut self, pred: F) -> Vec<Unit>
    where
        F: Fn(&Unit) -> bool,
    {
        let (taken, kept): (Vec<Unit>, Vec<Unit>) =
            std::mem::take(&mut self.units).into_iter().partition(|u| pred(u));
        self.units = kept;
        if self.units.is_empty() {
            self.direction = None;
        }
        taken
    }
}

/// Move earlier units' stops up to the newest unit's stop.
///
/// Only tightens: a stop that is already tighter than the newest one stays
/// where it is. A ratcheted stop never crosses its own unit's entry price.
pub fn ratchet_stops(units: &mut [Unit]) {
    let Some((newest, earlier)) = units.split_last_mut() else {
        return;
    };
    let target = newest.stop_price;

    for unit in earlier {
        unit.stop_price = match unit.direction {
            Direction::Long => unit.stop_price.max(target.min(unit.entry_price)),
            Direction::Short => unit.stop_price.min(target.max(unit.entry_price)),
        };
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub direction: Direction,
    pub size: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub gross_pnl: f64,
    pub commission: f64,
    pub pnl: f64,
    pub exit_reason: ExitReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn unit(direction: Direction, entry: f64, stop: f64) -> Unit {
        Unit {
            direction,
            entry_price: entry,
            entry_date: date(),
            size: 10,
            stop_price: stop,
        }
    }

    #[test]
    fn direction_sign_and_display() {
        assert_eq!(Direction::Long.sign(), 1.0);
        assert_eq!(Direction::Short.sign(), -1.0);
        assert_eq!(Direction::Short.to_string(), "short");
        assert_eq!(ExitReason::ChannelExit.to_string(), "channel_exit");
    }

    #[test]
    fn unrealized_pnl_long_and_short() {
        let long = unit(Direction::Long, 100.0, 98.0);
        assert!((long.unrealized_pnl(105.0, 1.0) - 50.0).abs() < f64::EPSILON);
        assert!((long.unrealized_pnl(105.0, 50.0) - 2500.0).abs() < f64::EPSILON);

        let short = unit(Direction::Short, 100.0, 102.0);
        assert!((short.unrealized_pnl(95.0, 1.0) - 50.0).abs() < f64::EPSILON);
        assert!((short.unrealized_pnl(104.0, 1.0) - (-40.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn stop_hit_uses_adverse_extreme() {
        let long = unit(Direction::Long, 100.0, 98.0);
        assert!(long.stop_hit(101.0, 98.0));
        assert!(!long.stop_hit(101.0, 98.5));

        let short = unit(Direction::Short, 100.0, 102.0);
        assert!(short.stop_hit(102.0, 99.0));
        assert!(!short.stop_hit(101.9, 90.0));
    }

    #[test]
    fn exposure_sums_unit_sizes() {
        let mut pos = Position::default();
        assert!(pos.is_flat());
        assert_eq!(pos.exposure(), 0);

        pos.add_unit(unit(Direction::Long, 100.0, 98.0));
        pos.add_unit(Unit {
            size: 7,
            ..unit(Direction::Long, 101.0, 99.0)
        });
        assert_eq!(pos.direction, Some(Direction::Long));
        assert_eq!(pos.unit_count(), 2);
        assert_eq!(pos.exposure(), 17);
    }

    #[test]
    fn add_unit_ratchets_earlier_stops() {
        let mut pos = Position::default();
        pos.add_unit(unit(Direction::Long, 100.0, 98.0));
        pos.add_unit(unit(Direction::Long, 100.5, 98.5));
        pos.add_unit(unit(Direction::Long, 101.0, 99.0));

        assert!(pos.units.iter().all(|u| (u.stop_price - 99.0).abs() < f64::EPSILON));
    }

    #[test]
    fn take_units_goes_flat_when_empty() {
        let mut pos = Position::default();
        pos.add_unit(unit(Direction::Short, 100.0, 102.0));
        pos.add_unit(unit(Direction::Short, 99.0, 101.0));

        let none = pos.take_units(|u| u.stop_hit(100.5, 95.0));
        assert!(none.is_empty());
        assert!(!pos.is_flat());

        let all = pos.take_units(|_| true);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].entry_price, 100.0);
        assert!(pos.is_flat());
        assert!(pos.units.is_empty());
    }

    #[test]
    fn take_units_partial_keeps_direction() {
        let mut pos = Position::default();
        pos.direction = Some(Direction::Long);
        pos.units = vec![unit(Direction::Long, 100.0, 97.0), unit(Direction::Long, 101.0, 99.0)];

        let stopped = pos.take_units(|u| u.stop_hit(102.0, 98.0));
        assert_eq!(stopped.len(), 1);
        assert_eq!(stopped[0].entry_price, 101.0);
        assert_eq!(pos.direction, Some(Direction::Long));
        assert_eq!(pos.exposure(), 10);
    }

    mod ratchet {
        use super::*;

        #[test]
        fn empty_and_single_unit_untouched() {
            let mut none: Vec<Unit> = vec![];
            ratchet_stops(&mut none);

            let mut one = vec![unit(Direction::Long, 100.0, 98.0)];
            ratchet_stops(&mut one);
            assert_eq!(one[0].stop_price, 98.0);
        }

        #[test]
        fn long_moves_up_to_newest() {
            let mut units = vec![
                unit(Direction::Long, 100.0, 98.0),
                unit(Direction::Long, 100.5, 98.5),
            ];
            ratchet_stops(&mut units);
            assert_eq!(units[0].stop_price, 98.5);
            assert_eq!(units[1].stop_price, 98.5);
        }

        #[test]
        fn short_moves_down_to_newest() {
            let mut units = vec![
                unit(Direction::Short, 100.0, 102.0),
                unit(Direction::Short, 99.5, 101.5),
            ];
            ratchet_stops(&mut units);
            assert_eq!(units[0].stop_price, 101.5);
        }

        #[test]
        fn never_loosens() {
            // ATR expanded: the newest stop sits below the first unit's stop.
            let mut units = vec![
                unit(Direction::Long, 100.0, 98.0),
                unit(Direction::Long, 100.5, 96.5),
            ];
            ratchet_stops(&mut units);
            assert_eq!(units[0].stop_price, 98.0);
            assert_eq!(units[1].stop_price, 96.5);
        }

        #[test]
        fn clamped_at_own_entry_long() {
            // Gap add far above the first entry: its stop stops at breakeven.
            let mut units = vec![
                unit(Direction::Long, 100.0, 98.0),
                unit(Direction::Long, 105.0, 103.0),
            ];
            ratchet_stops(&mut units);
            assert_eq!(units[0].stop_price, 100.0);
            assert_eq!(units[1].stop_price, 103.0);
        }

        #[test]
        fn clamped_at_own_entry_short() {
            let mut units = vec![
                unit(Direction::Short, 100.0, 102.0),
                unit(Direction::Short, 95.0, 97.0),
            ];
            ratchet_stops(&mut units);
            assert_eq!(units[0].stop_price, 100.0);
        }

        #[test]
        fn stops_stay_on_losing_side() {
            let mut units = vec![
                unit(Direction::Long, 100.0, 98.0),
                unit(Direction::Long, 100.6, 98.6),
                unit(Direction::Long, 101.2, 99.2),
                unit(Direction::Long, 108.0, 106.0),
            ];
            ratchet_stops(&mut units);
            for u in &units {
                assert!(u.stop_price <= u.entry_price);
            }
        }
    }
}
