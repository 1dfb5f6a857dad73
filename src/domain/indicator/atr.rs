//! Average True Range with Wilder smoothing.
//!
//! TR[0] = H[0] - L[0], TR[i] = max(H-L, |H-C[i-1]|, |L-C[i-1]|).
//! ATR[n-1] = mean(TR[0..n]), ATR[i] = (ATR[i-1] * (n-1) + TR[i]) / n.
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries};
use crate::domain::ohlcv::OhlcvBar;

pub fn calc_atr(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries {
            values: bars
                .iter()
                .map(|bar| IndicatorPoint {
                    date: bar.date,
                    valid: false,
                    value: 0.0,
                })
                .collect(),
        };
    }

    let tr_values: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| bar.true_range(i.checked_sub(1).map(|p| bars[p].close)))
        .collect();

    let mut results: Vec<IndicatorPoint> = Vec::with_capacity(bars.len());
    let mut prev_atr = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i + 1 < period {
            results.push(IndicatorPoint {
                date: bar.date,
                valid: false,
                value: 0.0,
            });
            continue;
        }

        let atr = if i + 1 == period {
            tr_values[0..=i].iter().sum::<f64>() / period as f64
        } else {
            (prev_atr * (period - 1) as f64 + tr_values[i]) / period as f64
        };
        prev_atr = atr;

        results.push(IndicatorPoint {
            date: bar.date,
            valid: true,
            value: atr,
        });
    }

    IndicatorSeries { values: results }
}
