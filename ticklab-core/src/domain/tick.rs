//! Tick — a timestamped bid/ask quote, the engine's unit of market data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which quote fields changed on a tick, as integer-coded in MetaTrader
/// tick exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TickFlag {
    Bid = 2,
    Ask = 4,
    AskAndBid = 6,
    Volume = 16,
}

impl TickFlag {
    /// Decode the integer wire value. Unknown values are a parse error,
    /// not a tick.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            2 => Some(TickFlag::Bid),
            4 => Some(TickFlag::Ask),
            6 => Some(TickFlag::AskAndBid),
            16 => Some(TickFlag::Volume),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u32 {
        self as u32
    }
}

/// Immutable quote snapshot.
///
/// Timestamps are expected to be non-decreasing across a tick sequence.
/// `bid <= ask` is expected but not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub timestamp: DateTime<Utc>,
    pub bid: f64,
    pub ask: f64,
    pub volume: f64,
    pub flags: TickFlag,
}

impl Tick {
    pub fn new(timestamp: DateTime<Utc>, bid: f64, ask: f64, volume: f64, flags: TickFlag) -> Self {
        Self { timestamp, bid, ask, volume, flags }
    }
}
