//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult, Instrument};
use crate::domain::config_validation::{parse_date, validate_all};
use crate::domain::error::TurtleError;
use crate::domain::indicator::warmup_bars;
use crate::domain::metrics::Metrics;
use crate::domain::strategy::{BreakoutWindows, System, TradeDirection, TurtleStrategy};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_OUTPUT_DIR: &str = "out";

#[derive(Parser, Debug)]
#[command(name = "turtle", about = "Turtle Trading backtester", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// OHLCV CSV file; overrides `[backtest] data`
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Report output directory
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the date range of an OHLCV CSV file
    Info {
        #[arg(long)]
        csv: PathBuf,
    },
}

/// Everything one backtest run needs, resolved from config.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub backtest: BacktestConfig,
    pub instrument: Instrument,
    pub strategy: TurtleStrategy,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            csv,
            out,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, csv.as_deref())
            } else {
                run_backtest(&config, csv.as_deref(), out.as_deref())
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Info { csv } => run_info(&csv),
    }
}

fn report_error(err: &TurtleError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| report_error(&e))
}

pub fn run_backtest(config_path: &Path, csv: Option<&Path>, out: Option<&Path>) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let settings = match build_run_settings(&adapter) {
        Ok(s) => s,
        Err(e) => return report_error(&e),
    };
    eprintln!("Loading strategy: {}", settings.strategy.name);

    // Stage 2: Resolve data source
    let data_path = match resolve_data_path(csv, config_path, &adapter) {
        Ok(p) => p,
        Err(e) => return report_error(&e),
    };
    eprintln!("Loading bars from {}", data_path.display());
    let data_port = CsvAdapter::new(&data_path);

    // Stage 3: Run
    let (result, metrics) =
        match run_backtest_pipeline(&data_port, &data_path.display().to_string(), &settings) {
            Ok(r) => r,
            Err(e) => return report_error(&e),
        };

    // Stage 4: Console summary
    print_summary(&settings, &result, &metrics);

    // Stage 5: Report
    let output = out.unwrap_or_else(|| Path::new(DEFAULT_OUTPUT_DIR));
    match CsvReportAdapter::new().write(&result, &metrics, output) {
        Ok(()) => {
            eprintln!("\nReport written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

/// Validate every section, then build the typed run settings.
pub fn build_run_settings(config: &dyn ConfigPort) -> Result<RunSettings, TurtleError> {
    validate_all(config)?;
    let settings = RunSettings {
        backtest: build_backtest_config(config)?,
        instrument: build_instrument(config)?,
        strategy: build_strategy(config)?,
    };
    log::debug!("run settings: {:?}", settings);
    Ok(settings)
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, TurtleError> {
    let defaults = BacktestConfig::default();
    Ok(BacktestConfig {
        initial_capital: config.get_double("backtest", "initial_capital", defaults.initial_capital),
        commission_per_contract: config.get_double(
            "backtest",
            "commission_per_contract",
            defaults.commission_per_contract,
        ),
        risk_free_rate: config.get_double("backtest", "risk_free_rate", defaults.risk_free_rate),
        start_date: parse_date(config, "start_date")?,
        end_date: parse_date(config, "end_date")?,
    })
}

pub fn build_instrument(config: &dyn ConfigPort) -> Result<Instrument, TurtleError> {
    let symbol = config
        .get_string("instrument", "symbol")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TurtleError::ConfigMissing {
            section: "instrument".into(),
            key: "symbol".into(),
        })?;

    let defaults = Instrument::default();
    Ok(Instrument {
        symbol,
        point_value: config.get_double("instrument", "point_value", defaults.point_value),
        tick_size: config.get_double("instrument", "tick_size", defaults.tick_size),
    })
}

pub fn build_strategy(config: &dyn ConfigPort) -> Result<TurtleStrategy, TurtleError> {
    let defaults = TurtleStrategy::default();

    let system = match config.get_string("strategy", "system") {
        Some(s) => s
            .parse::<System>()
            .map_err(|reason| TurtleError::invalid("strategy", "system", reason))?,
        None => defaults.system,
    };
    let direction = match config.get_string("strategy", "direction") {
        Some(s) => s
            .parse::<TradeDirection>()
            .map_err(|reason| TurtleError::invalid("strategy", "direction", reason))?,
        None => defaults.direction,
    };

    let window = |key: &str, default: usize| -> Result<usize, TurtleError> {
        let value = config.get_int("strategy", key, default as i64);
        usize::try_from(value)
            .ok()
            .filter(|v| *v >= 1)
            .ok_or_else(|| TurtleError::invalid("strategy", key, format!("{} must be at least 1", key)))
    };

    Ok(TurtleStrategy {
        name: config
            .get_string("strategy", "name")
            .unwrap_or(defaults.name),
        system,
        system1: BreakoutWindows {
            entry: window("s1_entry", defaults.system1.entry)?,
            exit: window("s1_exit", defaults.system1.exit)?,
        },
        system2: BreakoutWindows {
            entry: window("s2_entry", defaults.system2.entry)?,
            exit: window("s2_exit", defaults.system2.exit)?,
        },
        atr_period: window("atr_period", defaults.atr_period)?,
        stop_atr_multiple: config.get_double("strategy", "stop_atr", defaults.stop_atr_multiple),
        pyramid_atr_step: config.get_double("strategy", "pyramid_atr", defaults.pyramid_atr_step),
        max_units: window("max_units", defaults.max_units)?,
        risk_per_unit: config.get_double("strategy", "risk_per_unit", defaults.risk_per_unit),
        direction,
        skip_after_winner: config.get_bool("strategy", "skip_winner_s1", defaults.skip_after_winner),
    })
}

/// `--csv` wins over `[backtest] data`. A relative `data` path is taken
/// relative to the config file's directory.
pub fn resolve_data_path(
    csv_override: Option<&Path>,
    config_path: &Path,
    config: &dyn ConfigPort,
) -> Result<PathBuf, TurtleError> {
    if let Some(path) = csv_override {
        return Ok(path.to_path_buf());
    }

    let data = config
        .get_string("backtest", "data")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TurtleError::ConfigMissing {
            section: "backtest".into(),
            key: "data".into(),
        })?;

    let path = PathBuf::from(data);
    if path.is_relative() {
        if let Some(dir) = config_path.parent() {
            return Ok(dir.join(path));
        }
    }
    Ok(path)
}

/// Fetch bars, run the engine and compute metrics.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    source: &str,
    settings: &RunSettings,
) -> Result<(BacktestResult, Metrics), TurtleError> {
    let bt = &settings.backtest;
    let bars = data_port.fetch_ohlcv(bt.start_date, bt.end_date)?;
    if bars.is_empty() {
        return Err(TurtleError::NoData {
            path: source.to_string(),
        });
    }

    let windows = settings.strategy.windows();
    eprintln!(
        "Running backtest: {} {} bars, {} to {}",
        settings.instrument.symbol,
        bars.len(),
        bars[0].date,
        bars[bars.len() - 1].date,
    );
    eprintln!(
        "  System {}: entry {}, exit {}, ATR {}",
        settings.strategy.system, windows.entry, windows.exit, settings.strategy.atr_period
    );

    let result =
        backtest_engine::run_backtest(&bars, &settings.strategy, &settings.instrument, bt)?;
    let metrics = Metrics::compute(&result, bt.risk_free_rate);
    Ok((result, metrics))
}

fn print_summary(settings: &RunSettings, result: &BacktestResult, metrics: &Metrics) {
    eprintln!("\n=== {} Results ===", settings.instrument.symbol);
    eprintln!("Start Equity:     {:.2}", metrics.initial_capital);
    eprintln!("End Equity:       {:.2}", metrics.final_equity);
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!(
        "Annualized:       {:.2}%",
        metrics.annualized_return * 100.0
    );
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", metrics.sortino_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", metrics.total_trades);
    eprintln!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", metrics.profit_factor);
    eprintln!("Commission:       {:.2}", metrics.total_commission);

    eprintln!("\n=== Exits ===");
    eprintln!("  stop:           {}", metrics.stop_exits);
    eprintln!("  channel_exit:   {}", metrics.channel_exits);
    eprintln!(
        "  end_of_data:    {}",
        metrics.total_trades - metrics.stop_exits - metrics.channel_exits
    );

    if !result.rejected_signals.is_empty() {
        eprintln!("\n=== Rejected Signals ===");
        for r in &result.rejected_signals {
            eprintln!("  {}  {:<5}  {}", r.date, r.direction.as_str(), r.reason);
        }
    }
    if result.insufficient_bars > 0 {
        eprintln!("\nWarmup bars skipped: {}", result.insufficient_bars);
    }
}

pub fn run_dry_run(config_path: &Path, csv: Option<&Path>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let settings = match build_run_settings(&adapter) {
        Ok(s) => s,
        Err(e) => return report_error(&e),
    };
    eprintln!("Config validated successfully");

    let s = &settings.strategy;
    let windows = s.windows();
    eprintln!("\nStrategy: {}", s.name);
    eprintln!("  system:        {}", s.system);
    eprintln!("  entry/exit:    {}/{}", windows.entry, windows.exit);
    eprintln!("  atr_period:    {}", s.atr_period);
    eprintln!("  stop:          {} N", s.stop_atr_multiple);
    eprintln!("  pyramid step:  {} N, max {} units", s.pyramid_atr_step, s.max_units);
    eprintln!("  risk per unit: {:.2}%", s.risk_per_unit * 100.0);
    eprintln!("  direction:     {}", s.direction);
    eprintln!(
        "  warmup bars:   {}",
        warmup_bars(windows.exit, windows.entry, s.atr_period)
    );

    let i = &settings.instrument;
    eprintln!("\nInstrument: {}", i.symbol);
    eprintln!("  point value:   {}", i.point_value);
    eprintln!("  tick size:     {}", i.tick_size);

    match resolve_data_path(csv, config_path, &adapter) {
        Ok(path) => eprintln!("\nData: {}", path.display()),
        Err(e) => return report_error(&e),
    }

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

pub fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match build_run_settings(&adapter) {
        Ok(settings) => {
            eprintln!(
                "  {} on {}, system {}",
                settings.strategy.name, settings.instrument.symbol, settings.strategy.system
            );
            eprintln!("\nConfiguration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

pub fn run_info(csv: &Path) -> ExitCode {
    let adapter = CsvAdapter::new(csv);
    match adapter.get_data_range() {
        Ok(Some((min_date, max_date, count))) => {
            println!(
                "{}: {} bars, {} to {}",
                csv.display(),
                count,
                min_date,
                max_date
            );
            ExitCode::SUCCESS
        }
        Ok(None) => report_error(&TurtleError::NoData {
            path: csv.display().to_string(),
        }),
        Err(e) => report_error(&e),
    }
}
