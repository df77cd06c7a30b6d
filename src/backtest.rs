//! # Grid Backtest Runner
//!
//! Drives one deterministic replay:
//!
//! 1. candles are fetched once from a [`CandleSource`] and validated into a
//!    [`CandleSeries`]
//! 2. the [`GridLadder`] is built around the first candle's open
//! 3. each candle is expanded into its intra-candle path and every step is fed
//!    to the [`OrderMatcher`], which applies fills to the [`AccountLedger`]
//! 4. after the last candle (or a liquidation) a [`BacktestReport`] is emitted
//!
//! Any failure aborts the run; no partial report is produced.
//!
//! ```rust,ignore
//! use grid_backtest::prelude::*;
//!
//! let config = GridConfig::new(SpacingMode::Arithmetic, 90.0, 110.0, 4, 1000.0);
//! let outcome = BacktestRunner::new(config).run(&series)?;
//! println!("{}", outcome.report);
//! ```

use tracing::{info, warn};

use crate::config::{BacktestSettings, BacktestWindow, GridConfig};
use crate::data::{CandleSeries, CandleSource};
use crate::errors::Result;
use crate::grid::GridLadder;
use crate::ledger::{AccountLedger, AccountState};
use crate::matcher::{Fill, OrderMatcher};
use crate::path::expand_candle;
use crate::report::{BacktestReport, EquityPoint, ReportInputs};
use crate::risk::{LiquidationChecker, LiquidationEvent};

/// Everything produced by a finished run.
#[derive(Debug, Clone)]
pub struct BacktestOutcome {
    pub report: BacktestReport,
    pub fills: Vec<Fill>,
    pub final_state: AccountState,
    pub equity_curve: Vec<EquityPoint>,
    pub ladder: GridLadder,
}

/// Replays candles through one grid configuration.
#[derive(Debug, Clone)]
pub struct BacktestRunner {
    config: GridConfig,
}

impl BacktestRunner {
    pub fn new(config: GridConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Fetch the window's candles from `source` and replay them.
    ///
    /// Errors raised by the source are returned unchanged.
    pub fn fetch_and_run<S>(&self, source: &S, symbol: &str, window: &BacktestWindow) -> Result<BacktestOutcome>
    where
        S: CandleSource + ?Sized,
    {
        let count = window.candle_count()?;
        info!(
            symbol,
            end = %window.end_time.to_rfc3339(),
            granularity = %window.granularity,
            count,
            "fetching candles"
        );
        let candles = source.fetch_candles(symbol, window.end_time, window.granularity, count)?;
        let series = CandleSeries::new(symbol, candles)?;
        self.run(&series)
    }

    /// Replay a validated candle series.
    pub fn run(&self, series: &CandleSeries) -> Result<BacktestOutcome> {
        let config = &self.config;
        let start_price = series.first().open;
        let ladder = GridLadder::build(config, start_price)?;
        let matcher = OrderMatcher::new(&ladder, config.direction);
        let mut ledger = AccountLedger::new(matcher.initial_state(start_price));
        let checker = config
            .maintenance_margin_rate
            .map(|rate| LiquidationChecker::new(config.capital, rate));

        info!(
            symbol = series.symbol(),
            candles = series.len(),
            start_price,
            levels = ladder.len(),
            expected_profit_rate = ladder.expected_profit_rate(),
            "starting grid backtest"
        );

        let mut fills = Vec::new();
        let mut equity_curve = Vec::with_capacity(series.len());
        let mut liquidation = None;

        'candles: for candle in series.candles() {
            let curr_price = ledger.state().curr_price;
            for step in expand_candle(candle, curr_price) {
                matcher.process_step(&mut ledger, step, &mut fills);

                let breach = checker.as_ref().and_then(|c| c.breach(ledger.state()));
                if let Some(margin_rate) = breach {
                    let realized = ledger.liquidate(step.price);
                    warn!(
                        timestamp = %step.timestamp.to_rfc3339(),
                        price = step.price,
                        margin_rate,
                        realized,
                        "position liquidated, stopping replay"
                    );
                    liquidation = Some(LiquidationEvent {
                        timestamp: step.timestamp,
                        price: step.price,
                        margin_rate,
                    });
                    equity_curve.push(EquityPoint {
                        timestamp: candle.timestamp,
                        close: step.price,
                        equity: config.capital + ledger.state().total_profit(),
                    });
                    break 'candles;
                }
            }

            equity_curve.push(EquityPoint {
                timestamp: candle.timestamp,
                close: candle.close,
                equity: config.capital + ledger.state().total_profit(),
            });
        }

        let report = BacktestReport::new(ReportInputs {
            symbol: series.symbol(),
            config,
            ladder: &ladder,
            state: ledger.state(),
            extremes: ledger.extremes(),
            fills: &fills,
            equity_curve: &equity_curve,
            liquidation,
        });

        info!(
            symbol = series.symbol(),
            fills = fills.len(),
            pairing_count = report.pairing_count,
            paired_profit = report.paired_profit.amount,
            total_profit = report.total_profit.amount,
            "grid backtest finished"
        );

        Ok(BacktestOutcome {
            report,
            fills,
            final_state: ledger.into_state(),
            equity_curve,
            ladder,
        })
    }
}

/// Single-run entry point: fetch the configured window and replay it.
pub fn run_backtest<S>(source: &S, settings: &BacktestSettings) -> Result<BacktestOutcome>
where
    S: CandleSource + ?Sized,
{
    settings.validate()?;
    BacktestRunner::new(settings.grid.clone()).fetch_and_run(source, &settings.symbol, &settings.window)
}
