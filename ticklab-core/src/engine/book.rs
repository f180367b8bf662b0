//! PositionBook — open positions plus the price-triggered SL/TP queues.
//!
//! Four priority queues, one per (side, trigger) pair, each ordered so the
//! top entry is the next candidate to fire against the current price:
//!
//! - long stop-loss: highest stoploss first (closest to the bid from above)
//! - short stop-loss: lowest stoploss first
//! - long take-profit: lowest takeprofit first
//! - short take-profit: highest takeprofit first
//!
//! Queues hold position ids only; entries are pushed when a position opens
//! and removed when it closes, for any reason, in the same step as the
//! close itself. Stop-loss and take-profit levels never change while a
//! position is open, so no re-prioritization is needed.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};

use crate::domain::{CloseType, Order, Position, PositionId, Tick, Trade};
use crate::engine::AccountLedger;

/// Queue entry: a trigger price and the position it belongs to. Ordered by
/// price with the id as a deterministic tie-break.
#[derive(Debug, Clone, Copy)]
struct TriggerEntry {
    price: f64,
    id: PositionId,
}

impl PartialEq for TriggerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TriggerEntry {}

impl PartialOrd for TriggerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TriggerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.price
            .total_cmp(&other.price)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Price-ordered queue of position ids, either highest-price-first or
/// lowest-price-first.
#[derive(Debug)]
enum TriggerQueue {
    HighestFirst(BinaryHeap<TriggerEntry>),
    LowestFirst(BinaryHeap<Reverse<TriggerEntry>>),
}

impl TriggerQueue {
    fn highest_first() -> Self {
        TriggerQueue::HighestFirst(BinaryHeap::new())
    }

    fn lowest_first() -> Self {
        TriggerQueue::LowestFirst(BinaryHeap::new())
    }

    fn push(&mut self, price: f64, id: PositionId) {
        let entry = TriggerEntry { price, id };
        match self {
            TriggerQueue::HighestFirst(heap) => heap.push(entry),
            TriggerQueue::LowestFirst(heap) => heap.push(Reverse(entry)),
        }
    }

    fn peek(&self) -> Option<(f64, PositionId)> {
        match self {
            TriggerQueue::HighestFirst(heap) => heap.peek().map(|e| (e.price, e.id)),
            TriggerQueue::LowestFirst(heap) => heap.peek().map(|e| (e.0.price, e.0.id)),
        }
    }

    fn pop(&mut self) -> Option<(f64, PositionId)> {
        match self {
            TriggerQueue::HighestFirst(heap) => heap.pop().map(|e| (e.price, e.id)),
            TriggerQueue::LowestFirst(heap) => heap.pop().map(|e| (e.0.price, e.0.id)),
        }
    }

    /// Remove the entry for a position. Returns whether one was present.
    fn remove(&mut self, id: PositionId) -> bool {
        let before = self.len();
        match self {
            TriggerQueue::HighestFirst(heap) => heap.retain(|e| e.id != id),
            TriggerQueue::LowestFirst(heap) => heap.retain(|e| e.0.id != id),
        }
        self.len() < before
    }

    fn len(&self) -> usize {
        match self {
            TriggerQueue::HighestFirst(heap) => heap.len(),
            TriggerQueue::LowestFirst(heap) => heap.len(),
        }
    }
}

/// Holds every open position of a run and closes them on price triggers,
/// explicit requests, or forced liquidation, recording a trade and settling
/// the ledger each time.
///
/// Positions are keyed by their monotonic id, so map order is insertion
/// order and the id is the stable handle the queues refer to.
#[derive(Debug)]
pub struct PositionBook {
    positions: BTreeMap<PositionId, Position>,
    next_id: u64,
    trades: Vec<Trade>,
    long_stops: TriggerQueue,
    short_stops: TriggerQueue,
    long_targets: TriggerQueue,
    short_targets: TriggerQueue,
}

impl PositionBook {
    pub fn new() -> Self {
        Self {
            positions: BTreeMap::new(),
            next_id: 0,
            trades: Vec::new(),
            long_stops: TriggerQueue::highest_first(),
            short_stops: TriggerQueue::lowest_first(),
            long_targets: TriggerQueue::lowest_first(),
            short_targets: TriggerQueue::highest_first(),
        }
    }

    // ── Open / lookup ──────────────────────────────────────────────────

    /// Try to open a position for an order at the tick's prices.
    ///
    /// Longs open at the ask and will eventually close at the bid; shorts
    /// the other way around. Returns `None` when the ledger's admission
    /// control rejects the order; the book and ledger are left untouched.
    pub fn try_open(
        &mut self,
        order: &Order,
        tick: &Tick,
        ledger: &mut AccountLedger,
    ) -> Option<PositionId> {
        let (open_price, eventual_close_price) = if order.is_long {
            (tick.ask, tick.bid)
        } else {
            (tick.bid, tick.ask)
        };

        if !ledger.can_order_be_processed(order.volume, open_price, eventual_close_price) {
            return None;
        }

        let id = PositionId(self.next_id);
        self.next_id += 1;

        let position = Position {
            id,
            open_time: tick.timestamp,
            open_price,
            volume: order.volume,
            is_long: order.is_long,
            comment: order.comment.clone(),
            stoploss: order.stoploss,
            takeprofit: order.takeprofit,
        };

        if let Some(stoploss) = position.stoploss {
            self.stop_queue_mut(position.is_long).push(stoploss, id);
        }
        if let Some(takeprofit) = position.takeprofit {
            self.target_queue_mut(position.is_long).push(takeprofit, id);
        }

        ledger.add_position(&position);
        self.positions.insert(id, position);
        Some(id)
    }

    /// Look up an open position. Unknown ids are a caller error.
    pub fn position(&self, id: PositionId) -> &Position {
        self.positions.get(&id).expect("unknown position id")
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    // ── Closing ────────────────────────────────────────────────────────

    /// Close an open position at the tick's prices, recording the reason.
    pub fn close(
        &mut self,
        id: PositionId,
        tick: &Tick,
        ledger: &mut AccountLedger,
        close_type: CloseType,
    ) {
        self.unregister_triggers(id);
        self.finish_close(id, tick, ledger, close_type);
    }

    /// Close every open position, oldest first.
    pub fn close_all(&mut self, tick: &Tick, ledger: &mut AccountLedger, close_type: CloseType) {
        while let Some((&id, _)) = self.positions.first_key_value() {
            self.close(id, tick, ledger, close_type);
        }
    }

    /// Force-close the oldest open position (margin stop-out).
    pub fn close_oldest(&mut self, tick: &Tick, ledger: &mut AccountLedger) {
        if let Some((&id, _)) = self.positions.first_key_value() {
            self.close(id, tick, ledger, CloseType::Forced);
        }
    }

    // ── Tick-driven firing ─────────────────────────────────────────────

    /// Fire every stop-loss and take-profit due at this tick, in order:
    /// stop-losses before take-profits, long side before short. Within a
    /// queue, firings drain in price priority; every close uses this tick's
    /// bid/ask.
    pub fn fire_triggers(&mut self, tick: &Tick, ledger: &mut AccountLedger) {
        // Long stop-losses fire while the bid has fallen to the stop.
        while let Some(id) = Self::pop_due(&mut self.long_stops, |price| tick.bid <= price) {
            self.trigger_close(id, false, tick, ledger, CloseType::StopLoss);
        }

        // Short stop-losses fire while the ask has risen to the stop.
        while let Some(id) = Self::pop_due(&mut self.short_stops, |price| tick.ask >= price) {
            self.trigger_close(id, false, tick, ledger, CloseType::StopLoss);
        }

        // Long take-profits fire while the bid has risen to the target.
        while let Some(id) = Self::pop_due(&mut self.long_targets, |price| tick.bid >= price) {
            self.trigger_close(id, true, tick, ledger, CloseType::TakeProfit);
        }

        // Short take-profits fire while the ask has fallen to the target.
        while let Some(id) = Self::pop_due(&mut self.short_targets, |price| tick.ask <= price) {
            self.trigger_close(id, true, tick, ledger, CloseType::TakeProfit);
        }
    }

    // ── Internal helpers ───────────────────────────────────────────────

    fn pop_due(queue: &mut TriggerQueue, due: impl Fn(f64) -> bool) -> Option<PositionId> {
        let (price, _) = queue.peek()?;
        if !due(price) {
            return None;
        }
        queue.pop().map(|(_, id)| id)
    }

    /// Close a position whose trigger entry was already popped from one
    /// queue; the paired entry on the other queue is removed here.
    fn trigger_close(
        &mut self,
        id: PositionId,
        fired_target: bool,
        tick: &Tick,
        ledger: &mut AccountLedger,
        close_type: CloseType,
    ) {
        let position = self.positions.get(&id).expect("fired id not in book");
        let is_long = position.is_long;
        let has_paired_entry = if fired_target {
            position.stoploss.is_some()
        } else {
            position.takeprofit.is_some()
        };

        if has_paired_entry {
            let removed = if fired_target {
                self.stop_queue_mut(is_long).remove(id)
            } else {
                self.target_queue_mut(is_long).remove(id)
            };
            debug_assert!(removed, "paired trigger entry missing for {id}");
        }

        self.finish_close(id, tick, ledger, close_type);
    }

    /// Remove both trigger entries of a still-registered position.
    fn unregister_triggers(&mut self, id: PositionId) {
        let position = self.positions.get(&id).expect("unknown position id");
        let is_long = position.is_long;
        let has_stoploss = position.stoploss.is_some();
        let has_takeprofit = position.takeprofit.is_some();

        if has_stoploss {
            let removed = self.stop_queue_mut(is_long).remove(id);
            debug_assert!(removed, "stop-loss entry missing for {id}");
        }
        if has_takeprofit {
            let removed = self.target_queue_mut(is_long).remove(id);
            debug_assert!(removed, "take-profit entry missing for {id}");
        }
    }

    /// Erase the position, record the trade, and settle the ledger.
    fn finish_close(
        &mut self,
        id: PositionId,
        tick: &Tick,
        ledger: &mut AccountLedger,
        close_type: CloseType,
    ) {
        let position = self.positions.remove(&id).expect("unknown position id");
        let close_price = if position.is_long { tick.bid } else { tick.ask };

        let trade = Trade {
            open_time: position.open_time,
            close_time: tick.timestamp,
            open_price: position.open_price,
            close_price,
            volume: position.volume,
            is_long: position.is_long,
            close_type,
            comment: position.comment,
        };

        ledger.realize(&trade);
        self.trades.push(trade);
    }

    fn stop_queue_mut(&mut self, is_long: bool) -> &mut TriggerQueue {
        if is_long {
            &mut self.long_stops
        } else {
            &mut self.short_stops
        }
    }

    fn target_queue_mut(&mut self, is_long: bool) -> &mut TriggerQueue {
        if is_long {
            &mut self.long_targets
        } else {
            &mut self.short_targets
        }
    }

    /// Dismantle the book into its terminal outputs: the positions still
    /// open (in open order) and the realized trades.
    pub fn into_parts(self) -> (Vec<Position>, Vec<Trade>) {
        (self.positions.into_values().collect(), self.trades)
    }

    #[cfg(test)]
    pub(crate) fn trigger_queue_lens(&self) -> (usize, usize, usize, usize) {
        (
            self.long_stops.len(),
            self.short_stops.len(),
            self.long_targets.len(),
            self.short_targets.len(),
        )
    }
}

impl Default for PositionBook {
    fn default() -> Self {
        Self::new()
    }
}
