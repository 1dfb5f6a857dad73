//! Donchian channel (breakout reference).
//!
//! DONCHIAN_HIGH(n)[i] = max(H[i-n..i]), DONCHIAN_LOW(n)[i] = min(L[i-n..i]).
//! The window ends at the previous bar, so bar i never sees its own extreme.
//! Warmup: first n bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries};
use crate::domain::ohlcv::OhlcvBar;

pub fn donchian_high(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    IndicatorSeries {
        values: prior_window(bars, period, |window| {
            window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max)
        }),
    }
}

pub fn donchian_low(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    IndicatorSeries {
        values: prior_window(bars, period, |window| {
            window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min)
        }),
    }
}

fn prior_window<F>(bars: &[OhlcvBar], period: usize, reduce: F) -> Vec<IndicatorPoint>
where
    F: Fn(&[OhlcvBar]) -> f64,
{
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let valid = period > 0 && i >= period;
            let value = if valid {
                reduce(&bars[i - period..i])
            } else {
                0.0
            };
            IndicatorPoint {
                date: bar.date,
                valid,
                value,
            }
        })
        .collect()
}
