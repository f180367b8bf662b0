//! Tick ingestion — parser for tab-separated MetaTrader-style tick exports.
//!
//! Expected schema (header row required):
//!
//! ```text
//! <DATE>\t<TIME>\t<BID>\t<ASK>\t<LAST>\t<VOLUME>\t<FLAGS>
//! ```
//!
//! `DATE` is `YYYY.MM.DD`, `TIME` is `HH:MM:SS` with an optional `.fff`
//! fraction. Empty numeric fields inherit the previous tick's value. The
//! `<LAST>` column is skipped; `<FLAGS>` must decode to a known flag code.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::domain::{Tick, TickFlag};

const TIMESTAMP_FORMAT: &str = "%Y.%m.%d %H:%M:%S%.f";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to open tick file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record: {0}")]
    Csv(#[from] csv::Error),

    #[error("record {record}: missing column {column}")]
    MissingColumn { record: u64, column: &'static str },

    #[error("record {record}: unparsable timestamp '{value}'")]
    Timestamp { record: u64, value: String },

    #[error("record {record}: unexpected flag value '{value}'")]
    Flag { record: u64, value: String },
}

/// Parser for the tick TSV schema above.
///
/// Carries the previous tick's numeric fields forward into records that
/// leave them empty, starting from zeroes.
#[derive(Debug, Default)]
pub struct TickParser;

impl TickParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse all ticks from a file.
    pub fn parse_file(&self, path: &Path) -> Result<Vec<Tick>, ParseError> {
        self.parse_reader(File::open(path)?)
    }

    /// Parse all ticks from any reader.
    pub fn parse_reader<R: Read>(&self, reader: R) -> Result<Vec<Tick>, ParseError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut ticks = Vec::new();
        let mut previous_bid = 0.0;
        let mut previous_ask = 0.0;
        let mut previous_volume = 0.0;

        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            // 1-based data record number, for error messages.
            let number = index as u64 + 1;

            let date = field(&record, 0, "DATE", number)?;
            let time = field(&record, 1, "TIME", number)?;
            let timestamp_text = format!("{date} {time}");
            let timestamp = NaiveDateTime::parse_from_str(&timestamp_text, TIMESTAMP_FORMAT)
                .map_err(|_| ParseError::Timestamp { record: number, value: timestamp_text })?
                .and_utc();

            let bid = number_or(field(&record, 2, "BID", number)?, previous_bid);
            let ask = number_or(field(&record, 3, "ASK", number)?, previous_ask);
            // Column 4 (<LAST>) is skipped.
            let volume = number_or(field(&record, 5, "VOLUME", number)?, previous_volume);

            let flag_text = field(&record, 6, "FLAGS", number)?;
            let flags = flag_text
                .trim()
                .parse::<u32>()
                .ok()
                .and_then(TickFlag::from_raw)
                .ok_or_else(|| ParseError::Flag {
                    record: number,
                    value: flag_text.to_string(),
                })?;

            previous_bid = bid;
            previous_ask = ask;
            previous_volume = volume;
            ticks.push(Tick::new(timestamp, bid, ask, volume, flags));
        }

        Ok(ticks)
    }
}

fn field<'r>(
    record: &'r csv::StringRecord,
    index: usize,
    column: &'static str,
    number: u64,
) -> Result<&'r str, ParseError> {
    record
        .get(index)
        .ok_or(ParseError::MissingColumn { record: number, column })
}

/// Parse a numeric field, falling back to the previous tick's value when
/// the field is empty or malformed.
fn number_or(text: &str, previous: f64) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return previous;
    }
    trimmed.parse().unwrap_or(previous)
}
