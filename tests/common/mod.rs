#![allow(dead_code)]

use chrono::NaiveDate;
use std::path::Path;
use turtle::domain::backtest::{BacktestConfig, Instrument};
use turtle::domain::error::TurtleError;
pub use turtle::domain::ohlcv::OhlcvBar;
use turtle::domain::strategy::{BreakoutWindows, System, TradeDirection, TurtleStrategy};
use turtle::ports::data_port::DataPort;

pub struct MockDataPort {
    pub bars: Vec<OhlcvBar>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            bars: Vec::new(),
            error: None,
        }
    }

    pub fn with_bars(mut self, bars: Vec<OhlcvBar>) -> Self {
        self.bars = bars;
        self
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }

    fn check(&self) -> Result<(), TurtleError> {
        match &self.error {
            Some(reason) => Err(TurtleError::DataSource {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, TurtleError> {
        self.check()?;
        Ok(self
            .bars
            .iter()
            .filter(|b| start.is_none_or(|s| b.date >= s) && end.is_none_or(|e| b.date <= e))
            .cloned()
            .collect())
    }

    fn get_data_range(&self) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TurtleError> {
        self.check()?;
        match (self.bars.first(), self.bars.last()) {
            (Some(first), Some(last)) => Ok(Some((first.date, last.date, self.bars.len()))),
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn day(i: usize) -> NaiveDate {
    date(2020, 1, 1) + chrono::Duration::days(i as i64)
}

/// Bar `i` closing at `close` with a symmetric 2.0 range.
pub fn make_bar(i: usize, close: f64) -> OhlcvBar {
    OhlcvBar {
        date: day(i),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: Some(1000.0),
    }
}

pub fn bars_from_closes(closes: &[f64]) -> Vec<OhlcvBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i, c))
        .collect()
}

/// 60 bars rising 2.0 per bar from 100, then 40 bars falling 2.0 per bar.
pub fn trend_then_reversal() -> Vec<OhlcvBar> {
    let closes: Vec<f64> = (0..100)
        .map(|i| {
            if i < 60 {
                100.0 + 2.0 * i as f64
            } else {
                218.0 - 2.0 * (i - 59) as f64
            }
        })
        .collect();
    bars_from_closes(&closes)
}

/// System 2 with 20/10 channels and a 20-bar ATR.
pub fn sample_strategy() -> TurtleStrategy {
    TurtleStrategy {
        name: "Test".into(),
        system: System::System2,
        system2: BreakoutWindows { entry: 20, exit: 10 },
        atr_period: 20,
        direction: TradeDirection::Both,
        ..Default::default()
    }
}

pub fn sample_instrument() -> Instrument {
    Instrument {
        symbol: "TEST".into(),
        point_value: 1.0,
        tick_size: 0.0,
    }
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        initial_capital: 100_000.0,
        commission_per_contract: 0.0,
        risk_free_rate: 0.0,
        start_date: None,
        end_date: None,
    }
}

pub fn write_bars_csv(path: &Path, bars: &[OhlcvBar]) {
    let mut wtr = csv::Writer::from_path(path).unwrap();
    wtr.write_record(["date", "open", "high", "low", "close", "volume"])
        .unwrap();
    for b in bars {
        wtr.write_record([
            b.date.to_string(),
            b.open.to_string(),
            b.high.to_string(),
            b.low.to_string(),
            b.close.to_string(),
            b.volume.map(|v| v.to_string()).unwrap_or_default(),
        ])
        .unwrap();
    }
    wtr.flush().unwrap();
}

/// INI matching `sample_strategy` and `sample_instrument`, reading `data`.
pub fn sample_ini(data: &str) -> String {
    format!(
        r#"
[backtest]
initial_capital = 100000
commission_per_contract = 0
risk_free_rate = 0.0
data = {data}

[instrument]
symbol = TEST
point_value = 1
tick_size = 0

[strategy]
name = Test
system = S2
s2_entry = 20
s2_exit = 10
atr_period = 20
stop_atr = 2.0
pyramid_atr = 0.5
max_units = 4
risk_per_unit = 0.01
direction = both
"#
    )
}
