//! Simulator — drives a tick stream through a strategy at a chosen stride.
//!
//! Per delivered tick, in order: stop-loss and take-profit firings, ledger
//! classification, forced-close reactions, strategy hooks. Anything fired
//! on a tick is already closed and settled before the strategy sees it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{BarCache, TickStore};
use crate::domain::{CloseType, Position, SimulationPeriod, Trade};
use crate::engine::{AccountLedger, AccountProperties, AccountState, PositionBook, SimBroker};
use crate::strategy::{Strategy, Verdict};

/// Terminal output of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Results {
    /// Realized balance at the end of the run.
    pub account_balance: f64,
    /// Balance plus unrealized profit/loss on still-open positions.
    pub total_equity: f64,
    /// Positions left open, in open order.
    pub open_positions: Vec<Position>,
    /// Every realized trade, in close order.
    pub trades: Vec<Trade>,
}

/// Runs strategies over a shared tick store.
///
/// The simulator itself is immutable and may be shared across optimizer
/// workers; all per-run state lives inside [`Simulator::run`]. Runs are
/// single-threaded and deterministic.
pub struct Simulator<'a> {
    ticks: &'a TickStore,
    bar_cache: BarCache<'a>,
    period: SimulationPeriod,
    properties: AccountProperties,
}

impl<'a> Simulator<'a> {
    pub fn new(
        ticks: &'a TickStore,
        period: SimulationPeriod,
        properties: AccountProperties,
    ) -> Self {
        Self { ticks, bar_cache: BarCache::new(ticks), period, properties }
    }

    /// Simulate one strategy over the tick stream and return its results.
    pub fn run<S: Strategy>(&self, strategy: &mut S) -> Results {
        let mut ledger = AccountLedger::new(&self.properties);
        let mut book = PositionBook::new();

        let verdict = {
            let mut broker = SimBroker::new(
                &mut book,
                &mut ledger,
                &self.bar_cache,
                self.ticks.first().copied(),
            );
            strategy.start(&mut broker)
        };
        if verdict == Verdict::Stop {
            return Self::finish(ledger, book);
        }

        if let Some(first_timestamp) = self.ticks.first_timestamp() {
            let mut next_deliver = first_timestamp;

            for tick in self.ticks.iter() {
                if self.period != SimulationPeriod::Tick {
                    if tick.timestamp < next_deliver {
                        continue;
                    }
                    next_deliver = next_deliver + self.period.duration();
                }

                book.fire_triggers(tick, &mut ledger);

                match ledger.on_tick(tick) {
                    AccountState::NonpositiveAccountBalance => {
                        book.close_all(tick, &mut ledger, CloseType::Forced);
                        break;
                    }
                    AccountState::MarginCall => {
                        if !book.is_empty() {
                            book.close_oldest(tick, &mut ledger);
                        }
                    }
                    AccountState::MarginCallWarning => strategy.on_margin_call_warning(),
                    AccountState::Ok => {}
                }

                let verdict = {
                    let mut broker = SimBroker::new(
                        &mut book,
                        &mut ledger,
                        &self.bar_cache,
                        Some(*tick),
                    );
                    strategy.on_tick(&mut broker, tick)
                };
                if verdict == Verdict::Stop {
                    break;
                }
            }
        }

        strategy.end();
        debug!(
            balance = ledger.balance(),
            trades = book.trades().len(),
            open = book.len(),
            "run finished"
        );
        Self::finish(ledger, book)
    }

    fn finish(ledger: AccountLedger, book: PositionBook) -> Results {
        let (open_positions, trades) = book.into_parts();
        Results {
            account_balance: ledger.balance(),
            total_equity: ledger.total_equity(),
            open_positions,
            trades,
        }
    }
}
