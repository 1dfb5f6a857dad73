//! Account state and equity tracking for the single instrument.

use chrono::NaiveDate;

use super::position::{ClosedTrade, Direction, Position};
use super::sizing::RejectReason;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
    pub unrealized_pnl: f64,
    pub open_size: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedSignal {
    pub date: NaiveDate,
    pub direction: Direction,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub initial_capital: f64,
    /// Net P&L of every closed trade.
    pub realized_pnl: f64,
    pub position: Position,
    pub closed_trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub rejected_signals: Vec<RejectedSignal>,
}

impl Account {
    pub fn new(initial_capital: f64) -> Self {
        Account {
            initial_capital,
            realized_pnl: 0.0,
            position: Position::default(),
            closed_trades: Vec::new(),
            equity_curve: Vec::new(),
            rejected_signals: Vec::new(),
        }
    }

    /// Initial capital plus everything realized so far.
    pub fn realized_equity(&self) -> f64 {
        self.initial_capital + self.realized_pnl
    }

    pub fn record_trade(&mut self, trade: ClosedTrade) {
        self.realized_pnl += trade.pnl;
        self.closed_trades.push(trade);
    }

    pub fn record_equity(&mut self, date: NaiveDate, price: f64, point_value: f64) {
        let unrealized_pnl = self.position.unrealized_pnl(price, point_value);
        self.equity_curve.push(EquityPoint {
            date,
            equity: self.realized_equity() + unrealized_pnl,
            unrealized_pnl,
            open_size: self.position.exposure(),
        });
    }

    pub fn record_rejection(&mut self, date: NaiveDate, direction: Direction, reason: RejectReason) {
        self.rejected_signals.push(RejectedSignal {
            date,
            direction,
            reason,
        });
    }
}
