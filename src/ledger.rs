//! Account bookkeeping for a single replay.
//!
//! [`AccountLedger`] owns the only mutable state of a run. Fills are applied one
//! grid level at a time:
//!
//! 1. `positions_grids` moves by one unit.
//! 2. The open position's cost is updated with the fill price and quantity.
//! 3. When `positions_grids` leaves a positive value for `<= 0` (or a negative
//!    value for `>= 0`) a pairing is recorded: the matching fraction of the
//!    open position is closed against the cost basis held *before* the fill,
//!    its profit is moved to `pair_profit`, and any residual stays open.
//! 4. `positions_profit` is re-marked at the fill price.
//!
//! Profit decomposes exactly: `pair_profit + positions_profit` equals the cash
//! flow of every fill plus the open quantity valued at the last price.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::matcher::OrderSide;

/// Quantities below this are treated as flat.
const QTY_EPSILON: f64 = 1e-12;

/// Active trigger level on one side of the current price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    /// Index into the grid ladder.
    pub index: usize,
    pub price: f64,
}

/// Mutable account state for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    /// Net grid units held: positive is long, negative is short.
    pub positions_grids: i64,
    /// Net signed quantity held.
    pub positions_qty: f64,
    pub pairing_count: u64,
    /// Profit realised by pairings.
    pub pair_profit: f64,
    /// Average entry price of the open quantity, `0.0` when flat.
    pub positions_cost: f64,
    /// Mark-to-market profit of the open quantity.
    pub positions_profit: f64,
    /// Signed cash committed to the open quantity since the last pairing.
    pub open_cost: f64,
    /// Sell trigger above the current price. `None` above the top level.
    pub up: Option<Boundary>,
    /// Buy trigger below the current price. `None` below the bottom level.
    pub down: Option<Boundary>,
    /// Last price the account was marked at.
    pub curr_price: f64,
}

impl AccountState {
    pub fn new(curr_price: f64, down: Option<Boundary>, up: Option<Boundary>) -> Self {
        Self {
            positions_grids: 0,
            positions_qty: 0.0,
            pairing_count: 0,
            pair_profit: 0.0,
            positions_cost: 0.0,
            positions_profit: 0.0,
            open_cost: 0.0,
            up,
            down,
            curr_price,
        }
    }

    pub fn up_price(&self) -> Option<f64> {
        self.up.map(|b| b.price)
    }

    pub fn down_price(&self) -> Option<f64> {
        self.down.map(|b| b.price)
    }

    /// Paired plus unrealised profit.
    pub fn total_profit(&self) -> f64 {
        self.pair_profit + self.positions_profit
    }

    /// Notional value of the open quantity at the last price.
    pub fn open_notional(&self) -> f64 {
        self.positions_qty.abs() * self.curr_price
    }
}

/// Running extremes of total profit, sampled after every fill.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProfitExtremes {
    /// Highest total profit seen, never below zero.
    pub max_profit: f64,
    /// Lowest total profit seen, never above zero.
    pub max_loss: f64,
}

/// Result of applying one fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillOutcome {
    /// Whether this fill completed a pairing.
    pub pairing: bool,
    /// Profit moved into `pair_profit` by this fill.
    pub realized: f64,
}

/// Owner of [`AccountState`]; applies fills and marks the open position.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountLedger {
    state: AccountState,
    extremes: ProfitExtremes,
}

impl AccountLedger {
    pub fn new(state: AccountState) -> Self {
        Self {
            state,
            extremes: ProfitExtremes::default(),
        }
    }

    pub fn state(&self) -> &AccountState {
        &self.state
    }

    pub fn into_state(self) -> AccountState {
        self.state
    }

    pub fn extremes(&self) -> ProfitExtremes {
        self.extremes
    }

    pub fn set_boundaries(&mut self, down: Option<Boundary>, up: Option<Boundary>) {
        self.state.down = down;
        self.state.up = up;
    }

    /// Apply a one-level fill of `quantity` at `price`.
    pub fn apply_fill(&mut self, side: OrderSide, price: f64, quantity: f64) -> FillOutcome {
        let sign = side.sign();
        let signed_qty = sign * quantity;
        let s = &mut self.state;

        let grids_before = s.positions_grids;
        s.positions_grids += side.grid_delta();
        let pairing = (grids_before > 0 && s.positions_grids <= 0)
            || (grids_before < 0 && s.positions_grids >= 0);

        let mut realized = 0.0;
        if pairing {
            let old_qty = s.positions_qty;
            let closed = if old_qty * signed_qty < 0.0 {
                old_qty.abs().min(quantity)
            } else {
                0.0
            };
            let fraction = if old_qty.abs() > QTY_EPSILON {
                closed / old_qty.abs()
            } else {
                1.0
            };
            realized = fraction * (old_qty * price - s.open_cost);
            let excess = quantity - closed;

            s.positions_qty = (1.0 - fraction) * old_qty + sign * excess;
            s.open_cost = (1.0 - fraction) * s.open_cost + sign * excess * price;
            s.pair_profit += realized;
            s.pairing_count += 1;
        } else {
            s.positions_qty += signed_qty;
            s.open_cost += signed_qty * price;
        }

        s.positions_cost = if s.positions_qty.abs() > QTY_EPSILON {
            s.open_cost / s.positions_qty
        } else {
            0.0
        };
        self.mark_to_market(price);
        self.record_extremes();

        if pairing {
            debug!(
                side = %side,
                price,
                realized,
                pairing_count = self.state.pairing_count,
                pair_profit = self.state.pair_profit,
                "grid pairing"
            );
        }

        FillOutcome { pairing, realized }
    }

    /// Re-mark the open position at `price`.
    pub fn mark_to_market(&mut self, price: f64) {
        let s = &mut self.state;
        s.curr_price = price;
        s.positions_profit = s.positions_qty * price - s.open_cost;
    }

    /// Close everything at `price`, realising the open profit.
    pub fn liquidate(&mut self, price: f64) -> f64 {
        self.mark_to_market(price);
        let s = &mut self.state;
        let realized = s.positions_profit;
        s.pair_profit += realized;
        s.positions_grids = 0;
        s.positions_qty = 0.0;
        s.open_cost = 0.0;
        s.positions_cost = 0.0;
        s.positions_profit = 0.0;
        self.record_extremes();
        realized
    }

    fn record_extremes(&mut self) {
        let total = self.state.total_profit();
        self.extremes.max_profit = self.extremes.max_profit.max(total);
        self.extremes.max_loss = self.extremes.max_loss.min(total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> AccountLedger {
        AccountLedger::new(AccountState::new(100.0, None, None))
    }

    #[test]
    fn buy_then_sell_pairs_and_realises_spread() {
        let mut ledger = ledger();

        let first = ledger.apply_fill(OrderSide::Buy, 95.0, 2.0);
        assert!(!first.pairing);
        assert_eq!(ledger.state().positions_grids, 1);
        assert_eq!(ledger.state().positions_cost, 95.0);

        let second = ledger.apply_fill(OrderSide::Sell, 100.0, 2.0);
        assert!(second.pairing);
        assert!((second.realized - 10.0).abs() < 1e-12);

        let state = ledger.state();
        assert_eq!(state.positions_grids, 0);
        assert_eq!(state.pairing_count, 1);
        assert!(state.positions_qty.abs() < 1e-12);
        assert!((state.pair_profit - 10.0).abs() < 1e-12);
        assert!(state.positions_profit.abs() < 1e-12);
    }

    #[test]
    fn reducing_without_crossing_zero_is_not_a_pairing() {
        let mut ledger = ledger();
        ledger.apply_fill(OrderSide::Buy, 95.0, 1.0);
        ledger.apply_fill(OrderSide::Buy, 90.0, 1.0);
        assert_eq!(ledger.state().positions_cost, 92.5);

        let outcome = ledger.apply_fill(OrderSide::Sell, 95.0, 1.0);
        assert!(!outcome.pairing);
        assert_eq!(ledger.state().pairing_count, 0);
        assert_eq!(ledger.state().positions_grids, 1);
        // The partial exit stays in the open position's mark-to-market.
        assert!((ledger.state().positions_profit - 5.0).abs() < 1e-12);

        // Cash flow of the four fills: -95 - 90 + 95 + 100.
        let outcome = ledger.apply_fill(OrderSide::Sell, 100.0, 1.0);
        assert!(outcome.pairing);
        assert!((ledger.state().pair_profit - 10.0).abs() < 1e-12);
        assert!(ledger.state().positions_profit.abs() < 1e-12);
    }

    #[test]
    fn short_side_pairs_on_buy_back() {
        let mut ledger = ledger();
        ledger.apply_fill(OrderSide::Sell, 105.0, 1.0);
        assert_eq!(ledger.state().positions_grids, -1);
        assert_eq!(ledger.state().positions_cost, 105.0);

        ledger.mark_to_market(110.0);
        assert!((ledger.state().positions_profit + 5.0).abs() < 1e-12);

        let outcome = ledger.apply_fill(OrderSide::Buy, 100.0, 1.0);
        assert!(outcome.pairing);
        assert!((ledger.state().pair_profit - 5.0).abs() < 1e-12);
    }

    #[test]
    fn residual_quantity_stays_open_after_pairing() {
        let mut ledger = ledger();
        ledger.apply_fill(OrderSide::Buy, 95.0, 2.0);
        let outcome = ledger.apply_fill(OrderSide::Sell, 100.0, 1.5);

        assert!(outcome.pairing);
        assert!((outcome.realized - 7.5).abs() < 1e-12);
        let state = ledger.state();
        assert_eq!(state.positions_grids, 0);
        assert!((state.positions_qty - 0.5).abs() < 1e-12);
        assert!((state.positions_cost - 95.0).abs() < 1e-12);
        assert!((state.positions_profit - 2.5).abs() < 1e-12);
    }

    #[test]
    fn extremes_track_best_and_worst_total_profit() {
        let mut ledger = ledger();
        ledger.apply_fill(OrderSide::Buy, 95.0, 1.0);
        ledger.apply_fill(OrderSide::Buy, 90.0, 1.0);
        ledger.apply_fill(OrderSide::Sell, 95.0, 1.0);
        ledger.apply_fill(OrderSide::Sell, 100.0, 1.0);

        let extremes = ledger.extremes();
        assert!((extremes.max_loss + 5.0).abs() < 1e-12);
        assert!((extremes.max_profit - 10.0).abs() < 1e-12);
    }

    #[test]
    fn liquidation_realises_open_loss() {
        let mut ledger = ledger();
        ledger.apply_fill(OrderSide::Buy, 95.0, 4.0);
        let realized = ledger.liquidate(80.0);

        assert!((realized + 60.0).abs() < 1e-12);
        let state = ledger.state();
        assert_eq!(state.positions_grids, 0);
        assert_eq!(state.positions_qty, 0.0);
        assert!((state.pair_profit + 60.0).abs() < 1e-12);
        assert!((ledger.extremes().max_loss + 60.0).abs() < 1e-12);
    }
}
