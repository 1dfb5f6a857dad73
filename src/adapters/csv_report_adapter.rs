//! CSV report writer.
//!
//! Writes four files into the output directory:
//! `trades.csv`, `equity_curve.csv`, `rejected_signals.csv` and `summary.csv`.
//! Headers are always written, so an empty run still produces readable files.

use std::fs;
use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TurtleError;
use crate::domain::metrics::Metrics;
use crate::ports::report_port::ReportPort;

pub const TRADES_FILE: &str = "trades.csv";
pub const EQUITY_FILE: &str = "equity_curve.csv";
pub const REJECTED_FILE: &str = "rejected_signals.csv";
pub const SUMMARY_FILE: &str = "summary.csv";

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn io_err(e: csv::Error) -> TurtleError {
    TurtleError::Io(e.into())
}

fn write_trades(result: &BacktestResult, path: &Path) -> Result<(), TurtleError> {
    let mut wtr = csv::Writer::from_path(path).map_err(io_err)?;
    wtr.write_record([
        "direction",
        "size",
        "entry_date",
        "entry_price",
        "exit_date",
        "exit_price",
        "gross_pnl",
        "commission",
        "pnl",
        "exit_reason",
    ])
    .map_err(io_err)?;

    for t in &result.trades {
        wtr.write_record([
            t.direction.to_string(),
            t.size.to_string(),
            t.entry_date.to_string(),
            t.entry_price.to_string(),
            t.exit_date.to_string(),
            t.exit_price.to_string(),
            format!("{:.2}", t.gross_pnl),
            format!("{:.2}", t.commission),
            format!("{:.2}", t.pnl),
            t.exit_reason.to_string(),
        ])
        .map_err(io_err)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_equity(result: &BacktestResult, path: &Path) -> Result<(), TurtleError> {
    let mut wtr = csv::Writer::from_path(path).map_err(io_err)?;
    wtr.write_record(["date", "equity", "unrealized_pnl", "open_size"])
        .map_err(io_err)?;

    for p in &result.equity_curve {
        wtr.write_record([
            p.date.to_string(),
            format!("{:.2}", p.equity),
            format!("{:.2}", p.unrealized_pnl),
            p.open_size.to_string(),
        ])
        .map_err(io_err)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_rejected(result: &BacktestResult, path: &Path) -> Result<(), TurtleError> {
    let mut wtr = csv::Writer::from_path(path).map_err(io_err)?;
    wtr.write_record(["date", "direction", "reason"])
        .map_err(io_err)?;

    for r in &result.rejected_signals {
        wtr.write_record([r.date.to_string(), r.direction.to_string(), r.reason.to_string()])
            .map_err(io_err)?;
    }
    wtr.flush()?;
    Ok(())
}

fn summary_rows(result: &BacktestResult, m: &Metrics) -> Vec<(&'static str, String)> {
    vec![
        ("symbol", result.symbol.clone()),
        ("initial_capital", format!("{:.2}", m.initial_capital)),
        ("final_equity", format!("{:.2}", m.final_equity)),
        ("total_return", format!("{:.6}", m.total_return)),
        ("annualized_return", format!("{:.6}", m.annualized_return)),
        ("sharpe_ratio", format!("{:.4}", m.sharpe_ratio)),
        ("sortino_ratio", format!("{:.4}", m.sortino_ratio)),
        ("max_drawdown", format!("{:.6}", m.max_drawdown)),
        ("max_drawdown_duration", m.max_drawdown_duration.to_string()),
        ("total_trades", m.total_trades.to_string()),
        ("trades_won", m.trades_won.to_string()),
        ("trades_lost", m.trades_lost.to_string()),
        ("trades_breakeven", m.trades_breakeven.to_string()),
        ("win_rate", format!("{:.4}", m.win_rate)),
        ("profit_factor", format!("{:.4}", m.profit_factor)),
        ("avg_trade", format!("{:.2}", m.avg_trade)),
        ("avg_win", format!("{:.2}", m.avg_win)),
        ("avg_loss", format!("{:.2}", m.avg_loss)),
        ("largest_win", format!("{:.2}", m.largest_win)),
        ("largest_loss", format!("{:.2}", m.largest_loss)),
        ("avg_trade_duration", format!("{:.1}", m.avg_trade_duration)),
        ("total_commission", format!("{:.2}", m.total_commission)),
        ("stop_exits", m.stop_exits.to_string()),
        ("channel_exits", m.channel_exits.to_string()),
        ("rejected_signals", m.rejected_signals.to_string()),
        ("insufficient_bars", result.insufficient_bars.to_string()),
    ]
}

fn write_summary(result: &BacktestResult, metrics: &Metrics, path: &Path) -> Result<(), TurtleError> {
    let mut wtr = csv::Writer::from_path(path).map_err(io_err)?;
    wtr.write_record(["metric", "value"]).map_err(io_err)?;
    for (name, value) in summary_rows(result, metrics) {
        wtr.write_record([name, value.as_str()]).map_err(io_err)?;
    }
    wtr.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &Metrics,
        output_dir: &Path,
    ) -> Result<(), TurtleError> {
        fs::create_dir_all(output_dir)?;

        write_trades(result, &output_dir.join(TRADES_FILE))?;
        write_equity(result, &output_dir.join(EQUITY_FILE))?;
        write_rejected(result, &output_dir.join(REJECTED_FILE))?;
        write_summary(result, metrics, &output_dir.join(SUMMARY_FILE))?;

        log::info!("report written to {}", output_dir.display());
        Ok(())
    }
}
