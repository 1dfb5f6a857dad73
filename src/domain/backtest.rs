//! Backtest engine and event loop.
//!
//! One pass over the bars in date order. Each bar runs, in this order:
//!
//! 1. stop check (per unit, filled at the unit's stop),
//! 2. exit-channel check (whole position, filled at the channel),
//! 3. entry or pyramid on the close (skipped on a bar that already exited),
//! 4. end-of-data liquidation on the last bar,
//! 5. equity mark at the close.

use chrono::NaiveDate;
use log::{debug, info, warn};

use super::account::{Account, EquityPoint, RejectedSignal};
use super::error::TurtleError;
use super::indicator::{compute_indicators, Channels};
use super::ohlcv::OhlcvBar;
use super::position::{ClosedTrade, Direction, ExitReason, Unit};
use super::sizing::{round_to_tick, unit_size, RejectReason, SizingParams};
use super::strategy::TurtleStrategy;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Charged on entry and again on exit, per contract.
    pub commission_per_contract: f64,
    pub risk_free_rate: f64,
    /// Optional data window; the engine runs on whatever bars it is given.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 100_000.0,
            commission_per_contract: 0.0,
            risk_free_rate: 0.0,
            start_date: None,
            end_date: None,
        }
    }
}

/// Contract specification of the traded instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub symbol: String,
    pub point_value: f64,
    /// Zero disables price rounding.
    pub tick_size: f64,
}

impl Default for Instrument {
    fn default() -> Self {
        Instrument {
            symbol: String::new(),
            point_value: 1.0,
            tick_size: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub symbol: String,
    pub initial_capital: f64,
    pub trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub rejected_signals: Vec<RejectedSignal>,
    /// Leading bars without enough history to trade.
    pub insufficient_bars: usize,
    pub final_equity: f64,
}

pub fn run_backtest(
    bars: &[OhlcvBar],
    strategy: &TurtleStrategy,
    instrument: &Instrument,
    config: &BacktestConfig,
) -> Result<BacktestResult, TurtleError> {
    let windows = strategy.windows();
    let rows = compute_indicators(bars, windows.exit, windows.entry, strategy.atr_period)?;

    let insufficient_bars = rows.iter().filter(|r| !r.valid).count();
    if !bars.is_empty() && insufficient_bars == bars.len() {
        warn!(
            "{} bars never reach the {}-bar warmup; no signals generated",
            bars.len(),
            windows.entry.max(windows.exit).max(strategy.atr_period)
        );
    } else if insufficient_bars > 0 {
        debug!("skipping {} warmup bars", insufficient_bars);
    }

    let mut engine = Engine::new(strategy, instrument, config);
    let last = bars.len().saturating_sub(1);
    for (i, (bar, row)) in bars.iter().zip(&rows).enumerate() {
        engine.step(bar, row.channels(), i == last);
    }

    let account = engine.account;
    let final_equity = account
        .equity_curve
        .last()
        .map(|p| p.equity)
        .unwrap_or(account.initial_capital);

    info!(
        "backtest {}: {} bars, {} trades, {} rejected signals, final equity {:.2}",
        instrument.symbol,
        bars.len(),
        account.closed_trades.len(),
        account.rejected_signals.len(),
        final_equity
    );

    Ok(BacktestResult {
        symbol: instrument.symbol.clone(),
        initial_capital: account.initial_capital,
        trades: account.closed_trades,
        equity_curve: account.equity_curve,
        rejected_signals: account.rejected_signals,
        insufficient_bars,
        final_equity,
    })
}

struct Engine<'a> {
    strategy: &'a TurtleStrategy,
    instrument: &'a Instrument,
    config: &'a BacktestConfig,
    sizing: SizingParams,
    account: Account,
    /// Net P&L of the position currently open, across its units.
    position_pnl: f64,
    last_was_winner: WinnerFlags,
}

/// Whether the last closed position in each direction made money.
#[derive(Debug, Default)]
struct WinnerFlags {
    long: bool,
    short: bool,
}

impl WinnerFlags {
    fn slot(&mut self, direction: Direction) -> &mut bool {
        match direction {
            Direction::Long => &mut self.long,
            Direction::Short => &mut self.short,
        }
    }

    fn set(&mut self, direction: Direction, winner: bool) {
        *self.slot(direction) = winner;
    }

    /// Read and clear the flag, so a winner suppresses one signal only.
    fn take(&mut self, direction: Direction) -> bool {
        std::mem::take(self.slot(direction))
    }
}

impl<'a> Engine<'a> {
    fn new(
        strategy: &'a TurtleStrategy,
        instrument: &'a Instrument,
        config: &'a BacktestConfig,
    ) -> Self {
        Engine {
            strategy,
            instrument,
            config,
            sizing: SizingParams {
                risk_per_unit: strategy.risk_per_unit,
                stop_atr_multiple: strategy.stop_atr_multiple,
                point_value: instrument.point_value,
            },
            account: Account::new(config.initial_capital),
            position_pnl: 0.0,
            last_was_winner: WinnerFlags::default(),
        }
    }

    fn step(&mut self, bar: &OhlcvBar, channels: Option<Channels>, is_last: bool) {
        let mut exited = self.check_stops(bar);

        if let Some(ch) = channels {
            exited |= self.check_channel_exit(bar, &ch);
            if !exited {
                self.check_entry(bar, &ch);
            }
        }

        if is_last {
            self.liquidate(bar);
        }

        self.account
            .record_equity(bar.date, bar.close, self.instrument.point_value);
    }

    fn check_stops(&mut self, bar: &OhlcvBar) -> bool {
        if self.account.position.is_flat() {
            return false;
        }
        let stopped = self
            .account
            .position
            .take_units(|u| u.stop_hit(bar.high, bar.low));
        if stopped.is_empty() {
            return false;
        }
        self.close_units(stopped, bar.date, ExitReason::Stop, |u| u.stop_price);
        true
    }

    fn check_channel_exit(&mut self, bar: &OhlcvBar, ch: &Channels) -> bool {
        let Some(direction) = self.account.position.direction else {
            return false;
        };
        let level = match direction {
            Direction::Long => ch.exit_low,
            Direction::Short => ch.exit_high,
        };
        if !bar.reaches_against(direction, level) {
            return false;
        }

        let price = round_to_tick(level, self.instrument.tick_size);
        let units = self.account.position.take_units(|_| true);
        self.close_units(units, bar.date, ExitReason::ChannelExit, |_| price);
        true
    }

    fn check_entry(&mut self, bar: &OhlcvBar, ch: &Channels) {
        match self.account.position.direction {
            None => {
                let signal = if bar.close > ch.entry_high {
                    Some(Direction::Long)
                } else if bar.close < ch.entry_low {
                    Some(Direction::Short)
                } else {
                    None
                };
                let Some(direction) = signal.filter(|d| self.strategy.direction.allows(*d))
                else {
                    return;
                };

                if self.strategy.skips_after_winner()
                    && self.last_was_winner.take(direction)
                {
                    self.reject(bar.date, direction, RejectReason::SkippedAfterWinner);
                    return;
                }
                self.open_unit(bar, direction, ch.atr);
            }
            Some(direction) => {
                let position = &self.account.position;
                if position.unit_count() >= self.strategy.max_units {
                    return;
                }
                let Some(last) = position.last_unit() else {
                    return;
                };
                let trigger =
                    last.entry_price + direction.sign() * self.strategy.pyramid_atr_step * ch.atr;
                let reached = match direction {
                    Direction::Long => bar.close >= trigger,
                    Direction::Short => bar.close <= trigger,
                };
                if reached {
                    self.open_unit(bar, direction, ch.atr);
                }
            }
        }
    }

    fn open_unit(&mut self, bar: &OhlcvBar, direction: Direction, atr: f64) {
        let equity = self.account.realized_equity();
        let size = match unit_size(equity, atr, &self.sizing) {
            Ok(size) => size,
            Err(reason) => {
                self.reject(bar.date, direction, reason);
                return;
            }
        };

        let tick = self.instrument.tick_size;
        let entry_price = round_to_tick(bar.close, tick);
        let stop_price = round_to_tick(
            entry_price - direction.sign() * self.strategy.stop_atr_multiple * atr,
            tick,
        );

        debug!(
            "{} {} unit {} x{} @ {:.4}, stop {:.4}, N {:.4}",
            bar.date,
            direction,
            self.account.position.unit_count() + 1,
            size,
            entry_price,
            stop_price,
            atr
        );

        self.account.position.add_unit(Unit {
            direction,
            entry_price,
            entry_date: bar.date,
            size,
            stop_price,
        });
    }

    fn liquidate(&mut self, bar: &OhlcvBar) {
        if self.account.position.is_flat() {
            return;
        }
        let price = round_to_tick(bar.close, self.instrument.tick_size);
        let units = self.account.position.take_units(|_| true);
        self.close_units(units, bar.date, ExitReason::EndOfData, |_| price);
    }

    fn close_units<F>(&mut self, units: Vec<Unit>, date: NaiveDate, reason: ExitReason, price_of: F)
    where
        F: Fn(&Unit) -> f64,
    {
        let Some(direction) = units.first().map(|u| u.direction) else {
            return;
        };
        let point_value = self.instrument.point_value;

        for unit in units {
            let exit_price = price_of(&unit);
            let gross_pnl = unit.unrealized_pnl(exit_price, point_value);
            let commission = 2.0 * self.config.commission_per_contract * unit.size as f64;
            let pnl = gross_pnl - commission;

            debug!(
                "{} close {} x{} @ {:.4} ({}), pnl {:.2}",
                date, unit.direction, unit.size, exit_price, reason, pnl
            );

            self.position_pnl += pnl;
            self.account.record_trade(ClosedTrade {
                direction: unit.direction,
                size: unit.size,
                entry_price: unit.entry_price,
                exit_price,
                entry_date: unit.entry_date,
                exit_date: date,
                gross_pnl,
                commission,
                pnl,
                exit_reason: reason,
            });
        }

        if self.account.position.is_flat() {
            self.last_was_winner.set(direction, self.position_pnl > 0.0);
            self.position_pnl = 0.0;
        }
    }

    fn reject(&mut self, date: NaiveDate, direction: Direction, reason: RejectReason) {
        warn!("{} {} signal rejected: {}", date, direction, reason);
        self.account.record_rejection(date, direction, reason);
    }
}
