//! Strategy interface — the contract a trading strategy satisfies and the
//! broker surface it trades through.

pub mod ma_crossover;

pub use ma_crossover::{MaCrossover, MaCrossoverParams};

use chrono::{DateTime, Utc};

use crate::data::BarsView;
use crate::domain::{Order, Position, PositionId, Tick, Timeframe};

/// What a strategy hook tells the simulator to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Stop,
}

/// Broker surface exposed to strategies. All operations are synchronous;
/// domain-normal failures (order rejected, bars unavailable) come back as
/// absences, never as errors.
pub trait Broker {
    /// The last `count` bars of `timeframe` ending before the current
    /// simulation time. Absent when not enough history exists yet.
    fn last_bars(&self, timeframe: Timeframe, count: usize) -> Option<BarsView>;

    /// Timestamp of the current tick.
    fn time(&self) -> DateTime<Utc>;

    /// Try to open a position. `None` means the order was rejected for
    /// insufficient margin.
    fn try_create_position(&mut self, order: &Order) -> Option<PositionId>;

    /// Look up an open position. Calling this with an id that is no longer
    /// open is a caller error.
    fn position(&self, id: PositionId) -> &Position;

    /// Close an open position at the current market price.
    fn close_position(&mut self, id: PositionId);

    /// Close every open position at the current market price.
    fn close_all_positions(&mut self);

    /// Realized cash balance.
    fn balance(&self) -> f64;

    /// Balance plus unrealized profit/loss on open positions.
    fn equity(&self) -> f64;
}

/// A trading strategy. Single-use: one instance drives one simulation run.
///
/// Hooks receive the broker per call; Rust's borrow rules do not allow a
/// strategy to retain the broker between calls.
pub trait Strategy {
    /// Called once before any tick. Returning [`Verdict::Stop`] ends the
    /// run immediately.
    fn start(&mut self, _broker: &mut dyn Broker) -> Verdict {
        Verdict::Continue
    }

    /// Called for each tick the simulator delivers.
    fn on_tick(&mut self, broker: &mut dyn Broker, tick: &Tick) -> Verdict;

    /// Called when the account's margin level falls to the warning level.
    fn on_margin_call_warning(&mut self) {}

    /// Called once after the last delivered tick or after an early stop.
    fn end(&mut self) {}
}
