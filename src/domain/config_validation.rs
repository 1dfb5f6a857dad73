//! Configuration validation.
//!
//! Checks every `[backtest]`, `[instrument]` and `[strategy]` value before a
//! run starts. Missing optional keys fall back to the same defaults the CLI
//! uses when it builds the run.

use crate::domain::error::TurtleError;
use crate::domain::strategy::{System, TradeDirection};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    validate_initial_capital(config)?;
    validate_commission(config)?;
    validate_risk_free_rate(config)?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_instrument_config(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    validate_symbol(config)?;
    validate_point_value(config)?;
    validate_tick_size(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    validate_system(config)?;
    validate_direction(config)?;
    for key in ["s1_entry", "s1_exit", "s2_entry", "s2_exit", "atr_period", "max_units"] {
        validate_at_least_one(config, key)?;
    }
    validate_risk_per_unit(config)?;
    validate_stop_atr(config)?;
    validate_pyramid_atr(config)?;
    Ok(())
}

/// All three sections, in the order a user would fix them.
pub fn validate_all(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    validate_backtest_config(config)?;
    validate_instrument_config(config)?;
    validate_strategy_config(config)
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let value = config.get_double("backtest", "initial_capital", 100_000.0);
    if !(value.is_finite() && value > 0.0) {
        return Err(TurtleError::invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let value = config.get_double("backtest", "commission_per_contract", 0.0);
    if !(value.is_finite() && value >= 0.0) {
        return Err(TurtleError::invalid(
            "backtest",
            "commission_per_contract",
            "commission_per_contract must be non-negative",
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let value = config.get_double("backtest", "risk_free_rate", 0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(TurtleError::invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let start = parse_date(config, "start_date")?;
    let end = parse_date(config, "end_date")?;

    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(TurtleError::invalid(
                "backtest",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok(())
}

/// Optional `[backtest]` date. Absent or blank means unbounded.
pub fn parse_date(config: &dyn ConfigPort, key: &str) -> Result<Option<NaiveDate>, TurtleError> {
    match config.get_string("backtest", key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                TurtleError::invalid(
                    "backtest",
                    key,
                    format!("invalid {} format, expected YYYY-MM-DD", key),
                )
            }),
    }
}

fn validate_symbol(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    match config.get_string("instrument", "symbol") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(TurtleError::ConfigMissing {
            section: "instrument".to_string(),
            key: "symbol".to_string(),
        }),
    }
}

fn validate_point_value(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let value = config.get_double("instrument", "point_value", 1.0);
    if !(value.is_finite() && value > 0.0) {
        return Err(TurtleError::invalid(
            "instrument",
            "point_value",
            "point_value must be positive",
        ));
    }
    Ok(())
}

fn validate_tick_size(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let value = config.get_double("instrument", "tick_size", 0.0);
    if !(value.is_finite() && value >= 0.0) {
        return Err(TurtleError::invalid(
            "instrument",
            "tick_size",
            "tick_size must be non-negative",
        ));
    }
    Ok(())
}

fn validate_system(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    if let Some(s) = config.get_string("strategy", "system") {
        s.parse::<System>()
            .map_err(|reason| TurtleError::invalid("strategy", "system", reason))?;
    }
    Ok(())
}

fn validate_direction(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    if let Some(s) = config.get_string("strategy", "direction") {
        s.parse::<TradeDirection>()
            .map_err(|reason| TurtleError::invalid("strategy", "direction", reason))?;
    }
    Ok(())
}

fn validate_at_least_one(config: &dyn ConfigPort, key: &str) -> Result<(), TurtleError> {
    // Defaults are all >= 1, so only an explicit value can fail.
    let Some(raw) = config.get_string("strategy", key) else {
        return Ok(());
    };
    match raw.trim().parse::<i64>() {
        Ok(value) if value >= 1 => Ok(()),
        Ok(_) => Err(TurtleError::invalid(
            "strategy",
            key,
            format!("{} must be at least 1", key),
        )),
        Err(_) => Err(TurtleError::invalid(
            "strategy",
            key,
            format!("{} must be an integer", key),
        )),
    }
}

fn validate_risk_per_unit(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let value = config.get_double("strategy", "risk_per_unit", 0.01);
    if !(value > 0.0 && value <= 1.0) {
        return Err(TurtleError::invalid(
            "strategy",
            "risk_per_unit",
            "risk_per_unit must be in (0, 1]",
        ));
    }
    Ok(())
}

fn validate_stop_atr(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let value = config.get_double("strategy", "stop_atr", 2.0);
    if !(value.is_finite() && value > 0.0) {
        return Err(TurtleError::invalid(
            "strategy",
            "stop_atr",
            "stop_atr must be positive",
        ));
    }
    Ok(())
}

fn validate_pyramid_atr(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let value = config.get_double("strategy", "pyramid_atr", 0.5);
    if !(value.is_finite() && value >= 0.0) {
        return Err(TurtleError::invalid(
            "strategy",
            "pyramid_atr",
            "pyramid_atr must be non-negative",
        ));
    }
    Ok(())
}
