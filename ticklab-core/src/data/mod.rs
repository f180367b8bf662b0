//! Market data — tick storage, bar derivation and caching, tick ingestion.

pub mod bar_cache;
pub mod tick_parser;
pub mod tick_store;

pub use bar_cache::{calculate_bars, BarCache, BarsView};
pub use tick_parser::{ParseError, TickParser};
pub use tick_store::TickStore;
