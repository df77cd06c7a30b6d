//! Trigger matching between path prices and the grid's active boundaries.
//!
//! The account always has at most one sell trigger above the current price
//! (`up`) and one buy trigger below it (`down`). A path step at or beyond a
//! trigger fills that single level, after which the triggers move to the
//! filled level's neighbours. A jump across several levels therefore fills
//! them one at a time, in price order, each at its own level price.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::DirectionMode;
use crate::grid::{same_price, GridLadder};
use crate::ledger::{AccountLedger, AccountState, Boundary};
use crate::path::PathStep;

/// Side of a grid fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// `+1.0` for buys, `-1.0` for sells.
    pub fn sign(&self) -> f64 {
        match self {
            OrderSide::Buy => 1.0,
            OrderSide::Sell => -1.0,
        }
    }

    /// Change in net grid units caused by one fill.
    pub fn grid_delta(&self) -> i64 {
        match self {
            OrderSide::Buy => 1,
            OrderSide::Sell => -1,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// One executed grid order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    /// Open time of the candle whose path triggered the fill.
    pub timestamp: DateTime<FixedOffset>,
    pub side: OrderSide,
    pub level_index: usize,
    pub price: f64,
    pub quantity: f64,
    /// Whether the fill completed a pairing.
    pub pairing: bool,
    /// Profit realised by the fill, zero unless `pairing` is set.
    pub realized_profit: f64,
}

/// Fills grid levels as path prices cross the account's boundaries.
#[derive(Debug, Clone, Copy)]
pub struct OrderMatcher<'a> {
    ladder: &'a GridLadder,
    direction: DirectionMode,
}

impl<'a> OrderMatcher<'a> {
    pub fn new(ladder: &'a GridLadder, direction: DirectionMode) -> Self {
        Self { ladder, direction }
    }

    /// Fresh account state with triggers bracketing `price`.
    pub fn initial_state(&self, price: f64) -> AccountState {
        let (down, up) = self.ladder.bracket(price);
        AccountState::new(price, self.boundary(down), self.boundary(up))
    }

    /// Process one path step, appending any fills to `fills`.
    ///
    /// The open position is re-marked at the step price afterwards.
    pub fn process_step(&self, ledger: &mut AccountLedger, step: PathStep, fills: &mut Vec<Fill>) {
        let price = step.price;
        loop {
            let state = ledger.state();
            if let Some(up) = state.up.filter(|b| price > b.price || same_price(price, b.price)) {
                self.trigger(ledger, up, OrderSide::Sell, step.timestamp, fills);
                continue;
            }
            if let Some(down) = state.down.filter(|b| price < b.price || same_price(price, b.price)) {
                self.trigger(ledger, down, OrderSide::Buy, step.timestamp, fills);
                continue;
            }
            break;
        }
        ledger.mark_to_market(price);
    }

    fn trigger(
        &self,
        ledger: &mut AccountLedger,
        boundary: Boundary,
        side: OrderSide,
        timestamp: DateTime<FixedOffset>,
        fills: &mut Vec<Fill>,
    ) {
        let grids = ledger.state().positions_grids;
        let skipped = match (self.direction, side) {
            (DirectionMode::Long, OrderSide::Sell) => grids <= 0,
            (DirectionMode::Short, OrderSide::Buy) => grids >= 0,
            _ => false,
        };

        if skipped {
            trace!(side = %side, price = boundary.price, grids, "trigger skipped by direction mode");
        } else if let Some(level) = self.ladder.level(boundary.index) {
            let outcome = ledger.apply_fill(side, level.price, level.quantity);
            trace!(side = %side, price = level.price, quantity = level.quantity, "grid fill");
            fills.push(Fill {
                timestamp,
                side,
                level_index: boundary.index,
                price: level.price,
                quantity: level.quantity,
                pairing: outcome.pairing,
                realized_profit: outcome.realized,
            });
        }

        let (down, up) = self.ladder.neighbors(boundary.index);
        ledger.set_boundaries(self.boundary(down), self.boundary(up));
    }

    fn boundary(&self, index: Option<usize>) -> Option<Boundary> {
        let index = index?;
        self.ladder.level(index).map(|level| Boundary {
            index,
            price: level.price,
        })
    }
}
