//! Deterministic grid trading backtester.
//!
//! The crate replays historical OHLC candles through a simulated grid strategy
//! and reports pairing profit, open-position profit, drawdown and throughput
//! statistics for one grid configuration. The pieces, leaves first:
//!
//! - [`grid::GridLadder`]: trigger prices and per-level quantities
//! - [`path::CandlePath`]: the reconstructed intra-candle price path
//! - [`matcher::OrderMatcher`]: fills levels as the path crosses them
//! - [`ledger::AccountLedger`]: position, cost basis and pairing bookkeeping
//! - [`backtest::BacktestRunner`]: drives a replay and emits a [`report::BacktestReport`]
//!
//! Fees, slippage, order book depth and exchange size limits are not modelled,
//! so results are optimistic compared with live trading.

pub mod backtest;
pub mod config;
pub mod data;
pub mod errors;
pub mod grid;
pub mod ledger;
pub mod matcher;
pub mod path;
pub mod report;
pub mod risk;
pub mod sweep;
pub mod utils;

#[cfg(test)]
mod tests {
    mod backtest_tests;
    mod determinism_tests;
    mod invariant_tests;
    mod mock_data;
    mod scenario_tests;
}

/// Convenient re-export of the most common items used when writing demos or tests.
pub mod prelude {
    pub use crate::backtest::{run_backtest, BacktestOutcome, BacktestRunner};
    pub use crate::config::{
        BacktestSettings, BacktestWindow, DirectionMode, GridConfig, Granularity, PriceBounds,
        SizingMode, SpacingMode,
    };
    pub use crate::data::{Candle, CandleSeries, CandleSource, CsvCandleSource, InMemoryCandleSource};
    pub use crate::errors::{GridBacktestError, Result};
    pub use crate::grid::{GridLadder, GridLevel};
    pub use crate::ledger::{AccountLedger, AccountState};
    pub use crate::matcher::{Fill, OrderMatcher, OrderSide};
    pub use crate::path::{expand_candle, PathStep};
    pub use crate::report::{write_equity_curve_csv, BacktestReport, EquityPoint, ReportMetric};
    pub use crate::risk::LiquidationEvent;
    pub use crate::sweep::{run_sweep, step_variants, SweepResult};
}
