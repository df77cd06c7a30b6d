//! Property checks over seeded random walks.

use crate::config::{DirectionMode, GridConfig, SizingMode, SpacingMode};
use crate::grid::GridLadder;
use crate::ledger::AccountLedger;
use crate::matcher::{Fill, OrderMatcher};
use crate::path::expand_candle;

use super::mock_data::*;

fn configs() -> Vec<GridConfig> {
    vec![
        GridConfig::new(SpacingMode::Arithmetic, 80.0, 120.0, 20, 1000.0),
        GridConfig::new(SpacingMode::Geometric, 70.0, 130.0, 15, 1000.0)
            .with_leverage(3.0)
            .with_sizing(SizingMode::EqualNotional),
        GridConfig::new(SpacingMode::Arithmetic, 90.0, 115.0, 7, 500.0)
            .with_central_price(103.0)
            .with_direction(DirectionMode::Long),
        GridConfig::relative(SpacingMode::Geometric, 0.1, 12, 2000.0)
            .with_direction(DirectionMode::Short)
            .with_capital_ratio(0.5),
    ]
}

/// Cash-flow profit of `fills` with the remaining quantity valued at `mark`.
fn cash_flow_total(fills: &[Fill], mark: f64) -> f64 {
    let (cash, qty) = fills.iter().fold((0.0, 0.0), |(cash, qty), f| {
        let signed = f.side.sign() * f.quantity;
        (cash - signed * f.price, qty + signed)
    });
    cash + qty * mark
}

#[test]
fn profit_decomposes_after_every_path_step() {
    for seed in 0..8u64 {
        for config in configs() {
            let candles = random_walk(seed, 300, 100.0, 0.01);
            let start = candles[0].open;
            let ladder = GridLadder::build(&config, start).unwrap();
            let matcher = OrderMatcher::new(&ladder, config.direction);
            let mut ledger = AccountLedger::new(matcher.initial_state(start));
            let mut fills = Vec::new();

            for candle in &candles {
                let curr = ledger.state().curr_price;
                for step in expand_candle(candle, curr) {
                    matcher.process_step(&mut ledger, step, &mut fills);

                    let state = ledger.state();
                    let expected = cash_flow_total(&fills, step.price);
                    let scale = 1.0 + expected.abs();
                    assert!(
                        (state.total_profit() - expected).abs() < 1e-8 * scale,
                        "seed {}: {} != {}",
                        seed,
                        state.total_profit(),
                        expected
                    );
                }
            }
        }
    }
}

#[test]
fn boundaries_always_bracket_the_current_price() {
    for seed in 0..8u64 {
        for config in configs() {
            let candles = random_walk(seed, 300, 100.0, 0.01);
            let start = candles[0].open;
            let ladder = GridLadder::build(&config, start).unwrap();
            let matcher = OrderMatcher::new(&ladder, config.direction);
            let mut ledger = AccountLedger::new(matcher.initial_state(start));
            let mut fills = Vec::new();

            for candle in &candles {
                let curr = ledger.state().curr_price;
                for step in expand_candle(candle, curr) {
                    matcher.process_step(&mut ledger, step, &mut fills);
                    let state = ledger.state();
                    if let Some(down) = state.down_price() {
                        assert!(down < step.price);
                    }
                    if let Some(up) = state.up_price() {
                        assert!(step.price < up);
                    }
                    if let (Some(down), Some(up)) = (state.down, state.up) {
                        assert!(up.index > down.index);
                    }
                }
            }
        }
    }
}

#[test]
fn pairings_match_zero_crossings_of_grid_position() {
    for seed in 0..8u64 {
        for config in configs() {
            let candles = random_walk(seed, 400, 100.0, 0.015);
            let start = candles[0].open;
            let ladder = GridLadder::build(&config, start).unwrap();
            let matcher = OrderMatcher::new(&ladder, config.direction);
            let mut ledger = AccountLedger::new(matcher.initial_state(start));
            let mut fills = Vec::new();
            for candle in &candles {
                let curr = ledger.state().curr_price;
                for step in expand_candle(candle, curr) {
                    matcher.process_step(&mut ledger, step, &mut fills);
                }
            }

            let mut grids = 0i64;
            let mut crossings = 0u64;
            for fill in &fills {
                let next = grids + fill.side.grid_delta();
                let crossed = (grids > 0 && next <= 0) || (grids < 0 && next >= 0);
                assert_eq!(fill.pairing, crossed);
                crossings += u64::from(crossed);
                grids = next;
            }

            let state = ledger.state();
            assert_eq!(state.positions_grids, grids);
            assert_eq!(state.pairing_count, crossings);
            match config.direction {
                DirectionMode::Long => assert!(state.positions_grids >= 0),
                DirectionMode::Short => assert!(state.positions_grids <= 0),
                DirectionMode::Neutral => {}
            }
        }
    }
}

#[test]
fn fills_only_happen_at_ladder_prices() {
    let config = configs().remove(1);
    let candles = random_walk(42, 500, 100.0, 0.02);
    let outcome = crate::backtest::BacktestRunner::new(config)
        .run(&series(candles))
        .unwrap();

    for fill in &outcome.fills {
        let level = outcome.ladder.level(fill.level_index).unwrap();
        assert_eq!(fill.price, level.price);
        assert_eq!(fill.quantity, level.quantity);
    }
}

#[test]
fn ladders_span_the_bounds_with_even_spacing() {
    for config in configs() {
        let ladder = GridLadder::build(&config, 100.0).unwrap();
        let prices = ladder.prices();
        assert!(prices.len() >= 2);
        assert!(prices.windows(2).all(|w| w[1] > w[0]));

        match config.spacing {
            SpacingMode::Arithmetic => {
                let d = prices[1] - prices[0];
                assert!(prices.windows(2).all(|w| ((w[1] - w[0]) - d).abs() < 1e-9));
            }
            SpacingMode::Geometric => {
                let r = prices[1] / prices[0];
                assert!(prices.windows(2).all(|w| (w[1] / w[0] - r).abs() < 1e-12));
            }
        }
        let bounds = ladder.bounds();
        assert_eq!(prices.len(), config.steps as usize + 1);
        assert!((prices[0] - bounds.lower).abs() < 1e-9);
        assert!((prices[prices.len() - 1] - bounds.upper).abs() < 1e-9);
        assert!(prices[ladder.central_index()] <= bounds.central + 1e-9);
    }
}
