//! Summary reporting for a finished grid backtest.
//!
//! The field names of [`BacktestReport`] are stable: dashboards read the JSON
//! produced by [`BacktestReport::to_json`] directly.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::config::GridConfig;
use crate::errors::Result;
use crate::grid::GridLadder;
use crate::ledger::{AccountState, ProfitExtremes};
use crate::matcher::{Fill, OrderSide};
use crate::risk::LiquidationEvent;
use crate::utils::{csv_utils, math, time};

/// A profit figure as an absolute amount and as a share of initial capital.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportMetric {
    pub amount: f64,
    /// Percentage of initial capital, e.g. `1.5` for 1.5%.
    pub pct_of_capital: f64,
}

impl ReportMetric {
    pub fn new(amount: f64, capital: f64) -> Self {
        Self {
            amount,
            pct_of_capital: amount / capital * 100.0,
        }
    }
}

/// Account value sampled at the close of each candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<FixedOffset>,
    pub close: f64,
    /// Capital plus paired and unrealised profit.
    pub equity: f64,
}

/// Open position at the end of the replay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub positions_grids: i64,
    pub positions_qty: f64,
    /// Average entry price, `0.0` when flat.
    pub positions_cost: f64,
    pub last_price: f64,
}

/// Summary of one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub symbol: String,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub candle_count: usize,
    pub capital: f64,
    pub grid_levels: usize,

    pub max_profit: ReportMetric,
    pub max_loss: ReportMetric,
    pub pairing_count: u64,
    pub paired_profit: ReportMetric,
    pub unpaired_profit: ReportMetric,
    pub total_profit: ReportMetric,

    pub buy_count: usize,
    pub sell_count: usize,
    /// Profit of one grid round-trip as a fraction of price.
    pub expected_profit_rate: f64,
    /// Profit of one grid round-trip at the central level.
    pub expected_profit_amount: f64,
    pub duration_hours: f64,
    pub pairings_per_day: f64,
    pub simple_apr: f64,
    /// `None` when compounding overflows.
    pub compound_apr: Option<f64>,
    /// Largest equity decline from a running peak, as a fraction.
    pub max_drawdown: f64,
    pub final_position: PositionSnapshot,
    pub liquidation: Option<LiquidationEvent>,
}

/// Everything a finished run hands to the report.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReportInputs<'a> {
    pub symbol: &'a str,
    pub config: &'a GridConfig,
    pub ladder: &'a GridLadder,
    pub state: &'a AccountState,
    pub extremes: ProfitExtremes,
    pub fills: &'a [Fill],
    pub equity_curve: &'a [EquityPoint],
    pub liquidation: Option<LiquidationEvent>,
}

impl BacktestReport {
    pub(crate) fn new(inputs: ReportInputs<'_>) -> Self {
        let capital = inputs.config.capital;
        let state = inputs.state;
        let metric = |amount: f64| ReportMetric::new(amount, capital);

        let start_time = inputs
            .equity_curve
            .first()
            .map(|p| p.timestamp)
            .unwrap_or_default();
        let end_time = inputs
            .equity_curve
            .last()
            .map(|p| p.timestamp)
            .unwrap_or(start_time);
        let duration_hours = time::hours_between(start_time, end_time);

        let equity: Vec<f64> = inputs.equity_curve.iter().map(|p| p.equity).collect();
        let total = state.total_profit();
        let r = total / capital;
        let buy_count = inputs
            .fills
            .iter()
            .filter(|f| f.side == OrderSide::Buy)
            .count();

        Self {
            symbol: inputs.symbol.to_string(),
            start_time,
            end_time,
            candle_count: inputs.equity_curve.len(),
            capital,
            grid_levels: inputs.ladder.len(),
            max_profit: metric(inputs.extremes.max_profit),
            max_loss: metric(inputs.extremes.max_loss),
            pairing_count: state.pairing_count,
            paired_profit: metric(state.pair_profit),
            unpaired_profit: metric(state.positions_profit),
            total_profit: metric(total),
            buy_count,
            sell_count: inputs.fills.len() - buy_count,
            expected_profit_rate: inputs.ladder.expected_profit_rate(),
            expected_profit_amount: inputs.ladder.expected_profit_amount(),
            duration_hours,
            pairings_per_day: math::per_day(state.pairing_count, duration_hours),
            simple_apr: math::simple_annualized(r, duration_hours),
            compound_apr: math::compound_annualized(r, duration_hours),
            max_drawdown: math::max_drawdown(&equity),
            final_position: PositionSnapshot {
                positions_grids: state.positions_grids,
                positions_qty: state.positions_qty,
                positions_cost: state.positions_cost,
                last_price: state.curr_price,
            },
            liquidation: inputs.liquidation,
        }
    }

    pub fn fill_count(&self) -> usize {
        self.buy_count + self.sell_count
    }

    pub fn is_liquidated(&self) -> bool {
        self.liquidation.is_some()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl fmt::Display for BacktestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row = |f: &mut fmt::Formatter<'_>, name: &str, m: &ReportMetric| {
            writeln!(f, "  {:<16} {:>14.4} ({:>8.3}%)", name, m.amount, m.pct_of_capital)
        };

        writeln!(
            f,
            "Grid backtest {} [{} .. {}] {} candles, {} levels",
            self.symbol,
            self.start_time.to_rfc3339(),
            self.end_time.to_rfc3339(),
            self.candle_count,
            self.grid_levels
        )?;
        row(f, "max_profit", &self.max_profit)?;
        row(f, "max_loss", &self.max_loss)?;
        row(f, "paired_profit", &self.paired_profit)?;
        row(f, "unpaired_profit", &self.unpaired_profit)?;
        row(f, "total_profit", &self.total_profit)?;
        writeln!(
            f,
            "  pairing_count    {:>14} ({:.2}/day), fills {} buy / {} sell",
            self.pairing_count, self.pairings_per_day, self.buy_count, self.sell_count
        )?;
        writeln!(
            f,
            "  per-grid profit  {:>14.4} ({:.4}%)",
            self.expected_profit_amount,
            self.expected_profit_rate * 100.0
        )?;
        match self.compound_apr {
            Some(compound) => writeln!(
                f,
                "  apr              {:>13.2}% simple, {:.2}% compound",
                self.simple_apr * 100.0,
                compound * 100.0
            )?,
            None => writeln!(
                f,
                "  apr              {:>13.2}% simple, compound n/a",
                self.simple_apr * 100.0
            )?,
        }
        writeln!(f, "  max_drawdown     {:>13.2}%", self.max_drawdown * 100.0)?;
        writeln!(
            f,
            "  position         {} grids, {:.6} qty @ {:.4}",
            self.final_position.positions_grids,
            self.final_position.positions_qty,
            self.final_position.positions_cost
        )?;
        if let Some(event) = &self.liquidation {
            writeln!(
                f,
                "  LIQUIDATED at {} price {:.4} (margin rate {:.4})",
                event.timestamp.to_rfc3339(),
                event.price,
                event.margin_rate
            )?;
        }
        Ok(())
    }
}

/// Write an equity curve with `timestamp,close,equity,net_value,drawdown` columns.
///
/// `net_value` is equity over `capital`; `drawdown` is the decline from the
/// running equity peak.
pub fn write_equity_curve_csv<P: AsRef<Path>>(
    path: P,
    curve: &[EquityPoint],
    capital: f64,
) -> Result<()> {
    let equity: Vec<f64> = curve.iter().map(|p| p.equity).collect();
    let drawdowns = math::drawdown_series(&equity);
    let rows: Vec<Vec<String>> = curve
        .iter()
        .zip(drawdowns)
        .map(|(point, drawdown)| {
            vec![
                point.timestamp.to_rfc3339(),
                point.close.to_string(),
                format!("{:.8}", point.equity),
                format!("{:.8}", point.equity / capital),
                format!("{:.8}", drawdown),
            ]
        })
        .collect();
    csv_utils::write_csv(
        path,
        &["timestamp", "close", "equity", "net_value", "drawdown"],
        &rows,
    )
}
