//! Domain types — the vocabulary of ticklab.
//!
//! Everything else in the system builds on these types: ticks, bars,
//! timeframes, orders, positions, and realized trades.

pub mod bar;
pub mod order;
pub mod position;
pub mod tick;
pub mod timeframe;
pub mod trade;

// Re-export the most commonly used types at the domain level.
pub use bar::{Bar, BarError};
pub use order::Order;
pub use position::{Position, PositionId};
pub use tick::{Tick, TickFlag};
pub use timeframe::{SimulationPeriod, Timeframe};
pub use trade::{CloseType, Trade};
