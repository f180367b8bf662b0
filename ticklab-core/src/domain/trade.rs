//! Trade — a realized round trip, immutable once recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseType {
    StopLoss,
    TakeProfit,
    /// Closed explicitly by the strategy.
    Manual,
    /// Closed by the engine (margin stop-out or end-of-run close-all).
    Forced,
}

/// Realized trade record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub open_price: f64,
    pub close_price: f64,
    pub volume: f64,
    pub is_long: bool,
    pub close_type: CloseType,
    pub comment: String,
}

impl Trade {
    /// Realized profit: `(close - open) * volume` for longs, negated for
    /// shorts.
    pub fn profit(&self) -> f64 {
        let per_unit = if self.is_long {
            self.close_price - self.open_price
        } else {
            self.open_price - self.close_price
        };
        per_unit * self.volume
    }
}
