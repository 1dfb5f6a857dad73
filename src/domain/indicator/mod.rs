//! Indicator engine: Donchian channels and ATR.
//!
//! Each indicator produces an [`IndicatorSeries`] aligned one-to-one with the
//! input bars. [`compute_indicators`] zips the series for the two breakout
//! windows and the ATR into [`IndicatorRow`]s, which is what the backtest
//! engine consumes.

pub mod atr;
pub mod donchian;

use chrono::NaiveDate;

use crate::domain::error::TurtleError;
use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: f64,
}

impl IndicatorPoint {
    pub fn get(&self) -> Option<f64> {
        self.valid.then_some(self.value)
    }
}

/// One point per input bar, in bar order.
#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    fn value_at(&self, i: usize) -> Option<f64> {
        self.values.get(i).and_then(IndicatorPoint::get)
    }
}

/// Indicator values for one bar.
///
/// The long window is the entry (breakout) channel, the short window the exit
/// channel. A row is only `valid` once every window has enough history; the
/// individual values may already be defined a little earlier but must not be
/// traded on.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRow {
    pub date: NaiveDate,
    pub valid: bool,
    pub donchian_high_short: Option<f64>,
    pub donchian_low_short: Option<f64>,
    pub donchian_high_long: Option<f64>,
    pub donchian_low_long: Option<f64>,
    pub atr: Option<f64>,
}

/// Fully-defined indicator values of a valid row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Channels {
    pub exit_high: f64,
    pub exit_low: f64,
    pub entry_high: f64,
    pub entry_low: f64,
    pub atr: f64,
}

impl IndicatorRow {
    pub fn channels(&self) -> Option<Channels> {
        if !self.valid {
            return None;
        }
        Some(Channels {
            exit_high: self.donchian_high_short?,
            exit_low: self.donchian_low_short?,
            entry_high: self.donchian_high_long?,
            entry_low: self.donchian_low_long?,
            atr: self.atr?,
        })
    }
}

/// Number of leading bars that can never produce a signal.
pub fn warmup_bars(short: usize, long: usize, atr_period: usize) -> usize {
    short.max(long).max(atr_period)
}

/// Reject duplicate or decreasing dates. Input is never reordered.
pub fn validate_ordering(bars: &[OhlcvBar]) -> Result<(), TurtleError> {
    for (i, pair) in bars.windows(2).enumerate() {
        if pair[1].date <= pair[0].date {
            return Err(TurtleError::DataOrdering {
                index: i + 1,
                previous: pair[0].date,
                current: pair[1].date,
            });
        }
    }
    Ok(())
}

pub fn compute_indicators(
    bars: &[OhlcvBar],
    short: usize,
    long: usize,
    atr_period: usize,
) -> Result<Vec<IndicatorRow>, TurtleError> {
    validate_ordering(bars)?;

    let high_short = donchian::donchian_high(bars, short);
    let low_short = donchian::donchian_low(bars, short);
    let high_long = donchian::donchian_high(bars, long);
    let low_long = donchian::donchian_low(bars, long);
    let atr = atr::calc_atr(bars, atr_period);

    let windows_usable = short > 0 && long > 0 && atr_period > 0;
    let warmup = warmup_bars(short, long, atr_period);

    let rows = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorRow {
            date: bar.date,
            valid: windows_usable && i >= warmup,
            donchian_high_short: high_short.value_at(i),
            donchian_low_short: low_short.value_at(i),
            donchian_high_long: high_long.value_at(i),
            donchian_low_long: low_long.value_at(i),
            atr: atr.value_at(i),
        })
        .collect();

    Ok(rows)
}
