//! Bar — OHLCV aggregate over a half-open time bucket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Tick;

/// Single OHLCV bar covering `[open_timestamp, open_timestamp + timeframe)`.
///
/// Bars are derived from ticks; the canonical tick price used for bar
/// construction is the bid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub open_timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Count of ticks folded into this bar.
    pub tick_volume: u64,
}

impl Bar {
    /// Open a fresh bar from the first tick of its bucket.
    pub fn open_from(tick: &Tick) -> Self {
        let price = tick.bid;
        Self {
            open_timestamp: tick.timestamp,
            open: price,
            high: price,
            low: price,
            close: price,
            tick_volume: 1,
        }
    }

    /// Fold a later tick of the same bucket into this bar.
    pub fn fold(&mut self, tick: &Tick) {
        let price = tick.bid;
        if price > self.high {
            self.high = price;
        }
        if price < self.low {
            self.low = price;
        }
        self.close = price;
        self.tick_volume += 1;
    }

    /// Validate bar invariants: `low <= {open, close} <= high`.
    pub fn validate(&self) -> Result<(), BarError> {
        if self.high < self.low {
            return Err(BarError::InvalidRange { high: self.high, low: self.low });
        }
        if !(self.low..=self.high).contains(&self.open) {
            return Err(BarError::OpenOutOfRange);
        }
        if !(self.low..=self.high).contains(&self.close) {
            return Err(BarError::CloseOutOfRange);
        }
        Ok(())
    }

    /// Bar range (high - low).
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

#[derive(Debug, Error)]
pub enum BarError {
    #[error("invalid bar range: high={high}, low={low}")]
    InvalidRange { high: f64, low: f64 },

    #[error("open price outside high/low range")]
    OpenOutOfRange,

    #[error("close price outside high/low range")]
    CloseOutOfRange,
}
