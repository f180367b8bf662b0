//! Position — an open, unrealized exposure held by the position book.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an open position. Assigned monotonically within a run and
/// never reused, which makes it a stable handle for the trigger queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An open position of a given side, volume, and open price.
///
/// Created by the broker's `try_create_position` and destroyed when closed
/// by stop-loss, take-profit, explicit close, or forced liquidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub open_time: DateTime<Utc>,
    pub open_price: f64,
    pub volume: f64,
    pub is_long: bool,
    pub comment: String,
    pub stoploss: Option<f64>,
    pub takeprofit: Option<f64>,
}

impl Position {
    /// Exposure charged against margin: `volume * open_price`.
    pub fn expense(&self) -> f64 {
        self.volume * self.open_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn expense_is_volume_times_open_price() {
        let position = Position {
            id: PositionId(1),
            open_time: Utc::now(),
            open_price: 1.2,
            volume: 1000.0,
            is_long: true,
            comment: String::new(),
            stoploss: None,
            takeprofit: None,
        };
        assert_eq!(position.expense(), 1200.0);
    }

    #[test]
    fn id_display() {
        assert_eq!(PositionId(42).to_string(), "#42");
    }
}
