//! Parameter sweep over grid step counts and spacing modes.
//!
//! Replays a seeded synthetic week of one-minute candles through 16 grid
//! configurations in parallel and prints them ranked by total profit.

use anyhow::Result;
use chrono::{Duration, Offset, TimeZone, Utc};
use grid_backtest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

fn synthetic_series(n: usize) -> Result<CandleSeries> {
    let mut rng = StdRng::seed_from_u64(42);
    let start = Utc.fix().with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let mut open: f64 = 65_000.0;
    let candles = (0..n)
        .map(|i| {
            let close = open * (1.0 + rng.gen_range(-0.003..0.003));
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.0015));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.0015));
            let candle = Candle::new(start + Duration::minutes(i as i64), open, high, low, close);
            open = close;
            candle
        })
        .collect();
    Ok(CandleSeries::new("BTCUSDT", candles)?)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let series = synthetic_series(7 * 24 * 60)?;

    let mut configs = Vec::new();
    for spacing in [SpacingMode::Arithmetic, SpacingMode::Geometric] {
        let base = GridConfig::relative(spacing, 0.08, 10, 10_000.0).with_leverage(2.0);
        configs.extend(step_variants(&base, [10, 20, 40, 60, 80, 100, 150, 200]));
    }

    let results = run_sweep(&series, &configs)?;

    println!(
        "{:<4} {:<10} {:>5} {:>12} {:>9} {:>10} {:>8}",
        "rank", "spacing", "steps", "total", "total %", "pairings", "max dd"
    );
    for (rank, result) in results.iter().enumerate() {
        let report = &result.report;
        println!(
            "{:<4} {:<10} {:>5} {:>12.2} {:>8.2}% {:>10} {:>7.2}%",
            rank + 1,
            format!("{:?}", result.config.spacing),
            result.config.steps,
            report.total_profit.amount,
            report.total_profit.pct_of_capital,
            report.pairing_count,
            report.max_drawdown * 100.0
        );
    }

    Ok(())
}
