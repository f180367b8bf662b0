//! Moving-average crossover strategy.
//!
//! Classic trend-following entry: go long when the fast SMA crosses above
//! the slow SMA, short when it crosses below. Every position is bracketed
//! by a stop-loss sized from an allowed-loss fraction and a take-profit at
//! that loss times a risk/reward ratio; exits are left entirely to those
//! levels.

use crate::domain::{Bar, Order, Tick, Timeframe};
use crate::strategy::{Broker, Strategy, Verdict};

/// Volume of each position the strategy opens.
const TRADE_VOLUME: f64 = 1000.0;

/// Parameter set for [`MaCrossover`], the unit of an optimizer sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct MaCrossoverParams {
    pub fast_period: usize,
    pub slow_period: usize,
    /// Tolerated adverse move per trade, as a fraction of the open price.
    pub allowed_loss: f64,
    /// Take-profit distance as a multiple of the allowed loss.
    pub risk_reward_ratio: f64,
}

/// Moving-average crossover over one-minute bars.
#[derive(Debug, Clone)]
pub struct MaCrossover {
    params: MaCrossoverParams,
    timeframe: Timeframe,
    /// Sign of (fast - slow) on the previous evaluation; a flip is a cross.
    last_direction: Option<bool>,
}

impl MaCrossover {
    pub fn new(
        fast_period: usize,
        slow_period: usize,
        allowed_loss: f64,
        risk_reward_ratio: f64,
    ) -> Self {
        assert!(fast_period > 0, "fast_period must be > 0");
        assert!(slow_period > fast_period, "slow_period must be > fast_period");
        Self {
            params: MaCrossoverParams {
                fast_period,
                slow_period,
                allowed_loss,
                risk_reward_ratio,
            },
            timeframe: Timeframe::Min1,
            last_direction: None,
        }
    }

    pub fn from_params(params: &MaCrossoverParams) -> Self {
        Self::new(
            params.fast_period,
            params.slow_period,
            params.allowed_loss,
            params.risk_reward_ratio,
        )
    }

    /// Simple moving average over the last `period` bar closes.
    fn sma(bars: &[Bar], period: usize) -> Option<f64> {
        if bars.len() < period {
            return None;
        }
        let recent = &bars[bars.len() - period..];
        Some(recent.iter().map(|bar| bar.close).sum::<f64>() / period as f64)
    }

    /// Bracket order for a cross in the given direction at the tick's
    /// prices.
    fn bracket_order(&self, is_long: bool, tick: &Tick) -> Order {
        let open_price = if is_long { tick.ask } else { tick.bid };
        let loss = open_price * self.params.allowed_loss;
        let gain = loss * self.params.risk_reward_ratio;

        let (stoploss, takeprofit) = if is_long {
            (open_price - loss, open_price + gain)
        } else {
            (open_price + loss, open_price - gain)
        };

        let order = if is_long {
            Order::long(TRADE_VOLUME)
        } else {
            Order::short(TRADE_VOLUME)
        };
        order
            .with_stoploss(stoploss)
            .with_takeprofit(takeprofit)
            .with_comment("ma-crossover")
    }
}

impl Strategy for MaCrossover {
    fn on_tick(&mut self, broker: &mut dyn Broker, tick: &Tick) -> Verdict {
        let Some(bars) = broker.last_bars(self.timeframe, self.params.slow_period) else {
            return Verdict::Continue;
        };

        let (Some(fast), Some(slow)) = (
            Self::sma(&bars, self.params.fast_period),
            Self::sma(&bars, self.params.slow_period),
        ) else {
            return Verdict::Continue;
        };

        let direction = fast > slow;
        let crossed = self.last_direction.is_some_and(|previous| previous != direction);
        self.last_direction = Some(direction);
        if !crossed {
            return Verdict::Continue;
        }

        // Rejected orders (insufficient margin) are simply skipped; the
        // next cross will try again.
        broker.try_create_position(&self.bracket_order(direction, tick));
        Verdict::Continue
    }
}
