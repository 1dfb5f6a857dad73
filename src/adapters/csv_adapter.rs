//! CSV file data adapter.
//!
//! Reads `date,open,high,low,close[,volume]` with a header row. Columns are
//! matched by header name, case-insensitively, so extra or reordered columns
//! are fine. Dates are `YYYY-MM-DD`; longer timestamps are cut to the date.

use crate::domain::error::TurtleError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

const REQUIRED_COLUMNS: [&str; 5] = ["date", "open", "high", "low", "close"];

#[derive(Debug, Clone)]
pub struct CsvAdapter {
    path: PathBuf,
}

struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, TurtleError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        match REQUIRED_COLUMNS.map(find) {
            [Some(date), Some(open), Some(high), Some(low), Some(close)] => Ok(Columns {
                date,
                open,
                high,
                low,
                close,
                volume: find("volume"),
            }),
            _ => {
                let missing: Vec<&str> = REQUIRED_COLUMNS
                    .into_iter()
                    .filter(|c| find(c).is_none())
                    .collect();
                Err(TurtleError::DataSource {
                    reason: format!("CSV missing required columns: {}", missing.join(", ")),
                })
            }
        }
    }
}

impl CsvAdapter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Every bar in the file, sorted by date.
    fn read_all(&self) -> Result<Vec<OhlcvBar>, TurtleError> {
        let content = fs::read_to_string(&self.path).map_err(|e| TurtleError::DataSource {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = rdr.headers().map_err(|e| TurtleError::DataSource {
            reason: format!("CSV header error: {}", e),
        })?;
        let columns = Columns::from_headers(headers)?;

        let mut bars = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| TurtleError::DataSource {
                reason: format!("CSV parse error: {}", e),
            })?;
            // Header is line 1.
            bars.push(parse_record(&record, &columns, row + 2)?);
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

fn parse_record(
    record: &csv::StringRecord,
    columns: &Columns,
    line: usize,
) -> Result<OhlcvBar, TurtleError> {
    let date_str = record.get(columns.date).unwrap_or_default();
    let date = parse_date(date_str).ok_or_else(|| TurtleError::DataSource {
        reason: format!("line {}: invalid date '{}'", line, date_str),
    })?;

    let price = |index: usize, name: &str| -> Result<f64, TurtleError> {
        let raw = record.get(index).unwrap_or_default();
        let value = raw.parse::<f64>().map_err(|e| TurtleError::DataSource {
            reason: format!("line {}: invalid {} value '{}': {}", line, name, raw, e),
        })?;
        if !value.is_finite() {
            return Err(TurtleError::DataSource {
                reason: format!("line {}: {} must be finite, got '{}'", line, name, raw),
            });
        }
        Ok(value)
    };

    // Blank or unparseable volume is treated as absent.
    let volume = columns
        .volume
        .and_then(|i| record.get(i))
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite());

    Ok(OhlcvBar {
        date,
        open: price(columns.open, "open")?,
        high: price(columns.high, "high")?,
        low: price(columns.low, "low")?,
        close: price(columns.close, "close")?,
        volume,
    })
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let day = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, TurtleError> {
        let bars = self
            .read_all()?
            .into_iter()
            .filter(|b| start.is_none_or(|s| b.date >= s) && end.is_none_or(|e| b.date <= e))
            .collect();
        Ok(bars)
    }

    fn get_data_range(&self) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TurtleError> {
        let bars = self.read_all()?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}
