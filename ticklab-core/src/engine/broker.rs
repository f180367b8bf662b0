//! SimBroker — the broker facade a strategy trades through during a run.

use chrono::{DateTime, Utc};

use crate::data::{BarCache, BarsView};
use crate::domain::{CloseType, Order, Position, PositionId, Tick, Timeframe};
use crate::engine::{AccountLedger, PositionBook};
use crate::strategy::Broker;

/// Thin facade over the run's position book and ledger plus the shared bar
/// cache, pinned to the current tick. Constructed by the simulator for
/// each strategy hook invocation.
pub struct SimBroker<'run, 'data> {
    book: &'run mut PositionBook,
    ledger: &'run mut AccountLedger,
    bars: &'run BarCache<'data>,
    /// Absent only before the first tick of an empty tick store.
    tick: Option<Tick>,
}

impl<'run, 'data> SimBroker<'run, 'data> {
    pub(crate) fn new(
        book: &'run mut PositionBook,
        ledger: &'run mut AccountLedger,
        bars: &'run BarCache<'data>,
        tick: Option<Tick>,
    ) -> Self {
        Self { book, ledger, bars, tick }
    }

    fn current_tick(&self) -> Tick {
        self.tick.expect("no market data loaded for this run")
    }
}

impl Broker for SimBroker<'_, '_> {
    fn last_bars(&self, timeframe: Timeframe, count: usize) -> Option<BarsView> {
        let tick = self.tick?;
        self.bars.last_bars_before(timeframe, tick.timestamp, count)
    }

    fn time(&self) -> DateTime<Utc> {
        self.current_tick().timestamp
    }

    fn try_create_position(&mut self, order: &Order) -> Option<PositionId> {
        let tick = self.tick?;
        self.book.try_open(order, &tick, self.ledger)
    }

    fn position(&self, id: PositionId) -> &Position {
        self.book.position(id)
    }

    fn close_position(&mut self, id: PositionId) {
        let tick = self.current_tick();
        self.book.close(id, &tick, self.ledger, CloseType::Manual);
    }

    fn close_all_positions(&mut self) {
        if let Some(tick) = self.tick {
            self.book.close_all(&tick, self.ledger, CloseType::Forced);
        }
    }

    fn balance(&self) -> f64 {
        self.ledger.balance()
    }

    fn equity(&self) -> f64 {
        self.ledger.total_equity()
    }
}
