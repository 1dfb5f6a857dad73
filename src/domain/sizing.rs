//! Volatility-based unit sizing and tick rounding.
//!
//! A unit risks `risk_per_unit` of equity if price travels the full stop
//! distance: size = floor(risk_per_unit * equity / (stop_atr_multiple * N * point_value)).

use std::fmt;

/// Why an entry or pyramid signal was not acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NonPositiveAtr,
    NonPositiveEquity,
    SizeRoundsToZero,
    SkippedAfterWinner,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::NonPositiveAtr => "non_positive_atr",
            RejectReason::NonPositiveEquity => "non_positive_equity",
            RejectReason::SizeRoundsToZero => "size_rounds_to_zero",
            RejectReason::SkippedAfterWinner => "skipped_after_winner",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to the sizing rule that do not change during a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingParams {
    pub risk_per_unit: f64,
    pub stop_atr_multiple: f64,
    pub point_value: f64,
}

/// Whole contracts for one unit, or the reason none can be opened.
pub fn unit_size(equity: f64, atr: f64, params: &SizingParams) -> Result<i64, RejectReason> {
    if !atr.is_finite() || atr <= 0.0 {
        return Err(RejectReason::NonPositiveAtr);
    }
    if equity.is_nan() || equity <= 0.0 {
        return Err(RejectReason::NonPositiveEquity);
    }

    let dollar_risk = equity * params.risk_per_unit;
    let per_contract_risk = params.stop_atr_multiple * atr * params.point_value;
    if !(dollar_risk > 0.0 && per_contract_risk > 0.0) {
        return Err(RejectReason::SizeRoundsToZero);
    }

    // NaN or infinite inputs must never reach the integer cast.
    let size = (dollar_risk / per_contract_risk).floor();
    if !size.is_finite() || size < 1.0 {
        return Err(RejectReason::SizeRoundsToZero);
    }
    Ok(size as i64)
}

/// Round to the nearest tick. A non-positive tick size disables rounding.
pub fn round_to_tick(price: f64, tick_size: f64) -> f64 {
    if tick_size <= 0.0 {
        return price;
    }
    (price / tick_size).round() * tick_size
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> SizingParams {
        SizingParams {
            risk_per_unit: 0.01,
            stop_atr_multiple: 2.0,
            point_value: 1.0,
        }
    }

    #[test]
    fn size_from_risk_budget() {
        // 1% of 100k = 1000; 2 * 2.5 * 1 = 5 per contract → 200
        assert_eq!(unit_size(100_000.0, 2.5, &params()), Ok(200));
    }

    #[test]
    fn size_floors_fractional_contracts() {
        // 1000 / (2 * 3) = 166.67
        assert_eq!(unit_size(100_000.0, 3.0, &params()), Ok(166));
    }

    #[test]
    fn point_value_scales_risk() {
        let p = SizingParams {
            point_value: 50.0,
            ..params()
        };
        // 1000 / (2 * 2 * 50) = 5
        assert_eq!(unit_size(100_000.0, 2.0, &p), Ok(5));
    }

    #[test]
    fn zero_atr_rejected() {
        assert_eq!(unit_size(100_000.0, 0.0, &params()), Err(RejectReason::NonPositiveAtr));
        assert_eq!(unit_size(100_000.0, -1.0, &params()), Err(RejectReason::NonPositiveAtr));
        assert_eq!(
            unit_size(100_000.0, f64::NAN, &params()),
            Err(RejectReason::NonPositiveAtr)
        );
    }

    #[test]
    fn non_positive_equity_rejected() {
        assert_eq!(unit_size(0.0, 2.0, &params()), Err(RejectReason::NonPositiveEquity));
        assert_eq!(unit_size(-500.0, 2.0, &params()), Err(RejectReason::NonPositiveEquity));
    }

    #[test]
    fn tiny_budget_rounds_to_zero() {
        // 1% of 1000 = 10; per contract 2 * 20 = 40
        assert_eq!(unit_size(1_000.0, 20.0, &params()), Err(RejectReason::SizeRoundsToZero));
    }

    #[test]
    fn zero_stop_multiple_rejected() {
        let p = SizingParams {
            stop_atr_multiple: 0.0,
            ..params()
        };
        assert_eq!(unit_size(100_000.0, 2.0, &p), Err(RejectReason::SizeRoundsToZero));
    }

    #[test]
    fn non_finite_params_rejected() {
        for p in [
            SizingParams { risk_per_unit: f64::NAN, ..params() },
            SizingParams { stop_atr_multiple: f64::NAN, ..params() },
            SizingParams { point_value: f64::NAN, ..params() },
            SizingParams { point_value: f64::INFINITY, ..params() },
            SizingParams { risk_per_unit: f64::INFINITY, ..params() },
        ] {
            assert_eq!(unit_size(100_000.0, 2.0, &p), Err(RejectReason::SizeRoundsToZero));
        }
    }

    #[test]
    fn round_to_tick_nearest() {
        assert_relative_eq!(round_to_tick(100.13, 0.25), 100.25, epsilon = 1e-12);
        assert_relative_eq!(round_to_tick(100.12, 0.25), 100.0, epsilon = 1e-12);
        assert_relative_eq!(round_to_tick(4321.7, 0.5), 4321.5, epsilon = 1e-12);
    }

    #[test]
    fn round_to_tick_disabled() {
        assert_eq!(round_to_tick(100.1234, 0.0), 100.1234);
        assert_eq!(round_to_tick(100.1234, -1.0), 100.1234);
    }

    #[test]
    fn reject_reason_display() {
        assert_eq!(RejectReason::SizeRoundsToZero.to_string(), "size_rounds_to_zero");
    }
}
