//! Single grid backtest over a candle CSV.
//!
//! Usage: `cargo run --example grid_backtest [candles.csv]`
//!
//! Without an argument a seeded synthetic random walk is written to a temporary
//! file first. Set `RUST_LOG=grid_backtest=debug` to see every pairing.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{Duration, Offset, TimeZone, Utc};
use grid_backtest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

fn synthetic_candles(n: usize) -> Vec<Candle> {
    let mut rng = StdRng::seed_from_u64(7);
    let start = Utc.fix().with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut open: f64 = 2000.0;
    (0..n)
        .map(|i| {
            let close = open * (1.0 + rng.gen_range(-0.004..0.004));
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.002));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.002));
            let candle = Candle::new(start + Duration::minutes(i as i64), open, high, low, close);
            open = close;
            candle
        })
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let workdir = tempfile::tempdir()?;
    let csv_path: PathBuf = match std::env::args().nth(1) {
        Some(path) => path.into(),
        None => {
            let path = workdir.path().join("ETHUSDT_1m.csv");
            CsvCandleSource::new(&path).write_all(&synthetic_candles(3 * 24 * 60))?;
            path
        }
    };

    let source = CsvCandleSource::new(&csv_path);
    let candles = source.read_all()?;
    let end_time = match candles.last() {
        Some(last) => last.timestamp + Duration::minutes(1),
        None => anyhow::bail!("{} has no candles", csv_path.display()),
    };

    let settings = BacktestSettings {
        symbol: "ETHUSDT".to_string(),
        window: BacktestWindow::new(end_time, 48.0, Granularity::OneMinute),
        grid: GridConfig::relative(SpacingMode::Geometric, 0.05, 40, 1_000.0)
            .with_leverage(3.0)
            .with_maintenance_margin_rate(0.005),
    };

    let outcome = run_backtest(&source, &settings)?;
    println!("{}", outcome.report);

    let curve_path = workdir.path().join("equity_curve.csv");
    write_equity_curve_csv(&curve_path, &outcome.equity_curve, settings.grid.capital)?;
    println!(
        "{} fills, equity curve with {} points written to {}",
        outcome.fills.len(),
        outcome.equity_curve.len(),
        curve_path.display()
    );

    Ok(())
}
