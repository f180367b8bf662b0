//! Order — a request to open a position at the current market price.

use serde::{Deserialize, Serialize};

/// Immediate market order with optional stop-loss / take-profit levels.
///
/// Whether a stop-loss is sensible relative to the open price is the
/// strategy's responsibility; the engine registers whatever is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub is_long: bool,
    pub volume: f64,
    pub stoploss: Option<f64>,
    pub takeprofit: Option<f64>,
    pub comment: String,
}

impl Order {
    pub fn long(volume: f64) -> Self {
        Self {
            is_long: true,
            volume,
            stoploss: None,
            takeprofit: None,
            comment: String::new(),
        }
    }

    pub fn short(volume: f64) -> Self {
        Self { is_long: false, ..Self::long(volume) }
    }

    pub fn with_stoploss(mut self, price: f64) -> Self {
        self.stoploss = Some(price);
        self
    }

    pub fn with_takeprofit(mut self, price: f64) -> Self {
        self.takeprofit = Some(price);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_levels() {
        let order = Order::long(1000.0)
            .with_stoploss(1.199)
            .with_takeprofit(1.202)
            .with_comment("breakout");

        assert!(order.is_long);
        assert_eq!(order.stoploss, Some(1.199));
        assert_eq!(order.takeprofit, Some(1.202));
        assert_eq!(order.comment, "breakout");
    }

    #[test]
    fn short_defaults_have_no_levels() {
        let order = Order::short(500.0);
        assert!(!order.is_long);
        assert_eq!(order.stoploss, None);
        assert_eq!(order.takeprofit, None);
    }
}
