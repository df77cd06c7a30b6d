//! Parameter sweeps over several grid configurations.
//!
//! Every configuration is replayed independently against the same candle
//! series on the rayon thread pool. Runs share nothing mutable, so results are
//! identical to running them one after another.

use rayon::prelude::*;
use tracing::info;

use crate::backtest::BacktestRunner;
use crate::config::GridConfig;
use crate::data::CandleSeries;
use crate::errors::Result;
use crate::report::BacktestReport;

/// One configuration and its report.
#[derive(Debug, Clone)]
pub struct SweepResult {
    /// Position of the configuration in the input slice.
    pub index: usize,
    pub config: GridConfig,
    pub report: BacktestReport,
}

/// Replay every configuration in `configs` and rank them by total profit,
/// best first. Ties keep input order.
///
/// Any failing configuration fails the whole sweep.
pub fn run_sweep(series: &CandleSeries, configs: &[GridConfig]) -> Result<Vec<SweepResult>> {
    info!(
        symbol = series.symbol(),
        configs = configs.len(),
        threads = rayon::current_num_threads(),
        "starting parameter sweep"
    );

    let mut results = configs
        .par_iter()
        .enumerate()
        .map(|(index, config)| -> Result<SweepResult> {
            let outcome = BacktestRunner::new(config.clone()).run(series)?;
            Ok(SweepResult {
                index,
                config: config.clone(),
                report: outcome.report,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    results.sort_by(|a, b| {
        b.report
            .total_profit
            .amount
            .partial_cmp(&a.report.total_profit.amount)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    if let Some(best) = results.first() {
        info!(
            best_index = best.index,
            steps = best.config.steps,
            total_profit = best.report.total_profit.amount,
            "parameter sweep finished"
        );
    }
    Ok(results)
}

/// Copies of `base` with each step count in `steps`.
pub fn step_variants<I>(base: &GridConfig, steps: I) -> Vec<GridConfig>
where
    I: IntoIterator<Item = u32>,
{
    steps
        .into_iter()
        .map(|steps| GridConfig {
            steps,
            ..base.clone()
        })
        .collect()
}
