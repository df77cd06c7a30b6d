//! Maintenance-margin liquidation check.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::ledger::AccountState;

/// Record of a forced close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidationEvent {
    pub timestamp: DateTime<FixedOffset>,
    /// Path price the position was closed at.
    pub price: f64,
    /// Equity over open notional at the moment of liquidation.
    pub margin_rate: f64,
}

/// Compares account equity against the open notional after each path step.
#[derive(Debug, Clone, Copy)]
pub struct LiquidationChecker {
    capital: f64,
    maintenance_margin_rate: f64,
}

impl LiquidationChecker {
    pub fn new(capital: f64, maintenance_margin_rate: f64) -> Self {
        Self {
            capital,
            maintenance_margin_rate,
        }
    }

    pub fn maintenance_margin_rate(&self) -> f64 {
        self.maintenance_margin_rate
    }

    /// Capital plus paired and unrealised profit.
    pub fn equity(&self, state: &AccountState) -> f64 {
        self.capital + state.total_profit()
    }

    /// Current margin rate, `None` while flat.
    pub fn margin_rate(&self, state: &AccountState) -> Option<f64> {
        let notional = state.open_notional();
        if notional <= 0.0 {
            return None;
        }
        Some(self.equity(state) / notional)
    }

    /// Margin rate if it has fallen below the maintenance rate.
    pub fn breach(&self, state: &AccountState) -> Option<f64> {
        self.margin_rate(state)
            .filter(|rate| *rate < self.maintenance_margin_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_state(qty: f64, entry: f64, mark: f64) -> AccountState {
        let mut state = AccountState::new(mark, None, None);
        state.positions_grids = 1;
        state.positions_qty = qty;
        state.open_cost = qty * entry;
        state.positions_cost = entry;
        state.positions_profit = qty * mark - qty * entry;
        state
    }

    #[test]
    fn flat_account_is_never_liquidated() {
        let checker = LiquidationChecker::new(100.0, 0.005);
        let state = AccountState::new(100.0, None, None);
        assert_eq!(checker.margin_rate(&state), None);
        assert_eq!(checker.breach(&state), None);
    }

    #[test]
    fn breach_when_equity_falls_below_maintenance() {
        let checker = LiquidationChecker::new(100.0, 0.05);

        // 10x long: 10 units at 100, equity 100 against 1000 notional.
        let healthy = long_state(10.0, 100.0, 100.0);
        assert!((checker.margin_rate(&healthy).unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(checker.breach(&healthy), None);

        // Down to 95: equity 50 against 950 notional, still above 5%.
        let stressed = long_state(10.0, 100.0, 95.0);
        assert_eq!(checker.breach(&stressed), None);

        // Down to 94: equity 40 against 940 notional.
        let rate = checker.breach(&long_state(10.0, 100.0, 94.0)).unwrap();
        assert!((rate - 40.0 / 940.0).abs() < 1e-12);
    }
}
