//! AccountLedger — running balance, exposure aggregates, and margin state.

use serde::{Deserialize, Serialize};

use crate::domain::{Position, Tick, Trade};

/// Account configuration for a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountProperties {
    /// Starting balance. The instrument's quote currency doubles as the
    /// account currency.
    pub account_balance: f64,
    /// Leverage applied to open exposure.
    pub leverage: u32,
    /// Margin level at or below which positions are force-closed.
    pub stop_out_level: f64,
    /// Margin level at or below which the strategy is warned.
    pub stop_out_warning_level: f64,
}

impl Default for AccountProperties {
    fn default() -> Self {
        Self {
            account_balance: 10_000.0,
            leverage: 50,
            stop_out_level: 0.5,
            stop_out_warning_level: 0.55,
        }
    }
}

/// Account classification after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountState {
    Ok,
    /// Realized balance is gone; the run terminates.
    NonpositiveAccountBalance,
    MarginCall,
    MarginCallWarning,
}

/// Tracks realized balance, per-side open exposure, and floating P/L.
///
/// Exposure aggregates must always equal the sums over the open positions
/// in the book; `add_position` / `realize` keep the two in lockstep.
#[derive(Debug, Clone)]
pub struct AccountLedger {
    balance: f64,
    leverage: u32,
    stop_out_level: f64,
    stop_out_warning_level: f64,
    open_position_equity: f64,
    long_volume: f64,
    long_expense: f64,
    short_volume: f64,
    short_expense: f64,
}

impl AccountLedger {
    pub fn new(properties: &AccountProperties) -> Self {
        Self {
            balance: properties.account_balance,
            leverage: properties.leverage,
            stop_out_level: properties.stop_out_level,
            stop_out_warning_level: properties.stop_out_warning_level,
            open_position_equity: 0.0,
            long_volume: 0.0,
            long_expense: 0.0,
            short_volume: 0.0,
            short_expense: 0.0,
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn total_equity(&self) -> f64 {
        self.balance + self.open_position_equity
    }

    pub fn total_expense(&self) -> f64 {
        self.long_expense + self.short_expense
    }

    pub fn used_margin(&self) -> f64 {
        self.total_expense() / self.leverage as f64
    }

    pub fn used_margin_with(&self, additional_expense: f64) -> f64 {
        (self.total_expense() + additional_expense) / self.leverage as f64
    }

    pub fn free_margin(&self) -> f64 {
        self.total_equity() - self.used_margin()
    }

    pub fn required_margin(&self, volume: f64, open_price: f64) -> f64 {
        (volume * open_price) / self.leverage as f64
    }

    /// `total_equity / used_margin`, or +inf with no margin in use.
    pub fn margin_level(&self) -> f64 {
        let used_margin = self.used_margin();
        if used_margin == 0.0 {
            return f64::INFINITY;
        }
        self.total_equity() / used_margin
    }

    /// Admission control: simulate the worst-case immediate round trip of
    /// the order and admit only if the resulting margin level would stay
    /// above the stop-out level.
    pub fn can_order_be_processed(&self, volume: f64, open_price: f64, close_price: f64) -> bool {
        let price_difference = (close_price - open_price).abs();
        let new_equity = self.total_equity() - volume * price_difference;
        let new_used_margin = self.used_margin() + self.required_margin(volume, open_price);
        if new_used_margin == 0.0 {
            return true;
        }

        new_equity / new_used_margin > self.stop_out_level
    }

    /// Account for a newly opened position.
    pub fn add_position(&mut self, position: &Position) {
        if position.is_long {
            self.long_volume += position.volume;
            self.long_expense += position.expense();
        } else {
            self.short_volume += position.volume;
            self.short_expense += position.expense();
        }
    }

    /// Account for a closed position: release its exposure and settle the
    /// realized profit into the balance.
    pub fn realize(&mut self, trade: &Trade) {
        if trade.is_long {
            self.long_volume -= trade.volume;
            self.long_expense -= trade.volume * trade.open_price;
        } else {
            self.short_volume -= trade.volume;
            self.short_expense -= trade.volume * trade.open_price;
        }

        self.balance += trade.profit();
    }

    /// Mark open exposure to the tick's prices and classify the account.
    pub fn on_tick(&mut self, tick: &Tick) -> AccountState {
        // Floating P/L: longs close at bid, shorts close at ask.
        let long_profit = tick.bid * self.long_volume - self.long_expense;
        let short_profit = self.short_expense - tick.ask * self.short_volume;
        self.open_position_equity = long_profit + short_profit;

        if self.balance <= 0.0 {
            return AccountState::NonpositiveAccountBalance;
        }

        let margin_level = self.margin_level();
        if margin_level <= self.stop_out_level {
            return AccountState::MarginCall;
        }
        if margin_level <= self.stop_out_warning_level {
            return AccountState::MarginCallWarning;
        }

        AccountState::Ok
    }

    #[cfg(test)]
    pub(crate) fn side_aggregates(&self) -> (f64, f64, f64, f64) {
        (self.long_volume, self.long_expense, self.short_volume, self.short_expense)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CloseType, PositionId, TickFlag};
    use chrono::Utc;

    fn position(is_long: bool, volume: f64, open_price: f64) -> Position {
        Position {
            id: PositionId(0),
            open_time: Utc::now(),
            open_price,
            volume,
            is_long,
            comment: String::new(),
            stoploss: None,
            takeprofit: None,
        }
    }

    fn tick(bid: f64, ask: f64) -> Tick {
        Tick::new(Utc::now(), bid, ask, 0.0, TickFlag::AskAndBid)
    }

    fn trade_for(position: &Position, close_price: f64) -> Trade {
        Trade {
            open_time: position.open_time,
            close_time: Utc::now(),
            open_price: position.open_price,
            close_price,
            volume: position.volume,
            is_long: position.is_long,
            close_type: CloseType::Manual,
            comment: String::new(),
        }
    }

    #[test]
    fn fresh_ledger_has_free_margin_and_infinite_level() {
        let ledger = AccountLedger::new(&AccountProperties::default());
        assert_eq!(ledger.balance(), 10_000.0);
        assert_eq!(ledger.total_equity(), 10_000.0);
        assert_eq!(ledger.used_margin(), 0.0);
        assert_eq!(ledger.free_margin(), 10_000.0);
        assert!(ledger.margin_level().is_infinite());
    }

    #[test]
    fn open_position_consumes_margin() {
        let mut ledger = AccountLedger::new(&AccountProperties::default());
        ledger.add_position(&position(true, 1000.0, 1.2));

        // 1200 exposure at 1:50 leverage.
        assert_eq!(ledger.total_expense(), 1200.0);
        assert_eq!(ledger.used_margin(), 24.0);
        assert_eq!(ledger.used_margin_with(600.0), 36.0);
        assert_eq!(ledger.required_margin(1000.0, 1.2), 24.0);
    }

    #[test]
    fn admission_denied_when_margin_would_exceed_balance() {
        // Order of 100_000 at price 1.0 requires margin 2000 > balance 1000.
        let mut properties = AccountProperties::default();
        properties.account_balance = 1000.0;
        let ledger = AccountLedger::new(&properties);

        assert!(!ledger.can_order_be_processed(100_000.0, 1.0, 1.0));
        assert!(ledger.can_order_be_processed(1000.0, 1.0, 1.0));
    }

    #[test]
    fn admission_accounts_for_spread_loss() {
        let mut properties = AccountProperties::default();
        properties.account_balance = 1000.0;
        let ledger = AccountLedger::new(&properties);

        // Same exposure, but a wide spread eats the equity in the simulated
        // worst-case round trip.
        assert!(ledger.can_order_be_processed(10_000.0, 1.0, 0.999));
        assert!(!ledger.can_order_be_processed(10_000.0, 1.0, 0.91));
    }

    #[test]
    fn realize_settles_profit_and_releases_exposure() {
        let mut ledger = AccountLedger::new(&AccountProperties::default());
        let pos = position(true, 1000.0, 1.2);
        ledger.add_position(&pos);
        ledger.realize(&trade_for(&pos, 1.1989));

        assert!((ledger.balance() - (10_000.0 - 1.1)).abs() < 1e-9);
        assert_eq!(ledger.total_expense(), 0.0);
        assert_eq!(ledger.side_aggregates(), (0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn on_tick_marks_both_sides() {
        let mut ledger = AccountLedger::new(&AccountProperties::default());
        ledger.add_position(&position(true, 100.0, 1.0));
        ledger.add_position(&position(false, 50.0, 1.0));

        ledger.on_tick(&tick(1.02, 1.03));
        // Long: 1.02*100 - 100 = 2; short: 50 - 1.03*50 = -1.5.
        assert!((ledger.total_equity() - (10_000.0 + 0.5)).abs() < 1e-9);
    }

    #[test]
    fn state_classification_thresholds() {
        let properties = AccountProperties {
            account_balance: 100.0,
            leverage: 1,
            stop_out_level: 0.5,
            stop_out_warning_level: 0.55,
        };
        let mut ledger = AccountLedger::new(&properties);
        ledger.add_position(&position(true, 100.0, 1.0));

        // Equity 100, used margin 100: level 1.0.
        assert_eq!(ledger.on_tick(&tick(1.0, 1.0)), AccountState::Ok);
        // Bid 0.54: equity 100 - 46 = 54, level 0.54 <= warning.
        assert_eq!(ledger.on_tick(&tick(0.54, 0.54)), AccountState::MarginCallWarning);
        // Bid 0.49: equity 49, level 0.49 <= stop-out.
        assert_eq!(ledger.on_tick(&tick(0.49, 0.49)), AccountState::MarginCall);
    }

    #[test]
    fn nonpositive_balance_wins_over_margin_state() {
        let properties = AccountProperties { account_balance: 1.0, ..Default::default() };
        let mut ledger = AccountLedger::new(&properties);
        let pos = position(true, 1000.0, 1.0);
        ledger.add_position(&pos);
        ledger.realize(&trade_for(&pos, 0.9)); // loss of 100 wipes the balance

        assert!(ledger.balance() <= 0.0);
        assert_eq!(
            ledger.on_tick(&tick(0.9, 0.9)),
            AccountState::NonpositiveAccountBalance
        );
    }
}
