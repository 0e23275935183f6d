//! CSV-backed market data feed.
//!
//! One file per symbol under the base directory, named `<SYMBOL>.csv`, with
//! columns `timestamp,open,high,low,close,volume`. Timestamps are RFC 3339 or
//! a plain `YYYY-MM-DD` date (read as midnight UTC).

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::error::EngineError;
use crate::domain::market::PriceBar;
use crate::ports::market_data::MarketDataPort;

pub struct CsvFeed {
    base_path: PathBuf,
}

impl CsvFeed {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, EngineError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(EngineError::Data {
        reason: format!("invalid timestamp '{value}'"),
    })
}

fn parse_field(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, EngineError> {
    record
        .get(index)
        .ok_or_else(|| EngineError::Data {
            reason: format!("missing {name} column"),
        })?
        .trim()
        .parse()
        .map_err(|e| EngineError::Data {
            reason: format!("invalid {name} value: {e}"),
        })
}

impl MarketDataPort for CsvFeed {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>, EngineError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| EngineError::Data {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;

        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in reader.records() {
            let record = result.map_err(|e| EngineError::Data {
                reason: format!("CSV parse error: {e}"),
            })?;

            let raw = record.get(0).ok_or_else(|| EngineError::Data {
                reason: "missing timestamp column".into(),
            })?;
            let timestamp = parse_timestamp(raw)?;
            if timestamp < start || timestamp > end {
                continue;
            }

            bars.push(PriceBar {
                symbol: symbol.to_string(),
                timestamp,
                open: parse_field(&record, 1, "open")?,
                high: parse_field(&record, 2, "high")?,
                low: parse_field(&record, 3, "low")?,
                close: parse_field(&record, 4, "close")?,
                volume: parse_field(&record, 5, "volume")?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, EngineError> {
        let mut symbols = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("csv") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    symbols.push(stem.to_string());
                }
            }
        }
        symbols.sort();
        Ok(symbols)
    }
}
