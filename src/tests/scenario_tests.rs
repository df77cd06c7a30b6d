use crate::backtest::BacktestRunner;
use crate::data::Candle;
use crate::matcher::OrderSide;

use super::mock_data::*;

/// Path 100 -> 94 -> 106 -> 102. After the buy at 95 the boundaries move to
/// 90/100, so the rally fills 100 before 105 and the candle ends one unit
/// short rather than flat.
#[test]
fn bullish_candle_sells_every_level_touched_on_the_way_up() {
    let candles = vec![Candle::new(minute(0), 100.0, 106.0, 94.0, 102.0)];
    let outcome = BacktestRunner::new(reference_grid())
        .run(&series(candles))
        .unwrap();

    assert_eq!(outcome.ladder.prices(), vec![90.0, 95.0, 100.0, 105.0, 110.0]);

    let fills: Vec<(OrderSide, f64)> = outcome.fills.iter().map(|f| (f.side, f.price)).collect();
    assert_eq!(
        fills,
        vec![
            (OrderSide::Buy, 95.0),
            (OrderSide::Sell, 100.0),
            (OrderSide::Sell, 105.0),
        ]
    );

    // Buying 95 and selling it back at 100 is the only zero crossing; the high
    // then reaches 105 and opens one short unit.
    let state = &outcome.final_state;
    assert_eq!(state.pairing_count, 1);
    assert_eq!(state.positions_grids, -1);
    assert!((state.pair_profit - 10.0).abs() < 1e-9);
    assert!((state.positions_cost - 105.0).abs() < 1e-9);
    assert!((state.positions_profit - 6.0).abs() < 1e-9);
    assert_eq!(state.down_price(), Some(100.0));
    assert_eq!(state.up_price(), Some(110.0));
}

#[test]
fn oscillating_across_one_level_pairs_once_per_cycle() {
    for cycles in [0usize, 1, 2, 5, 17] {
        let outcome = BacktestRunner::new(reference_grid())
            .run(&series(oscillation(cycles)))
            .unwrap();
        let state = &outcome.final_state;

        assert_eq!(state.pairing_count, cycles as u64, "cycles = {}", cycles);
        assert_eq!(state.positions_grids, 0);
        assert_eq!(outcome.fills.len(), 2 * cycles);
        // 2 units per level, 5 per unit per round trip.
        assert!((state.pair_profit - 10.0 * cycles as f64).abs() < 1e-9);
        assert!(state.positions_profit.abs() < 1e-9);
    }
}

#[test]
fn flat_market_between_levels_never_trades() {
    let outcome = BacktestRunner::new(reference_grid())
        .run(&series(flat_candles(102.0, 50)))
        .unwrap();
    let state = &outcome.final_state;

    assert!(outcome.fills.is_empty());
    assert_eq!(state.pairing_count, 0);
    assert_eq!(state.positions_grids, 0);
    assert_eq!(state.total_profit(), 0.0);
    assert_eq!(state.down_price(), Some(100.0));
    assert_eq!(state.up_price(), Some(105.0));
    assert_eq!(outcome.report.max_profit.amount, 0.0);
    assert_eq!(outcome.report.max_loss.amount, 0.0);
}

#[test]
fn gap_candle_fills_every_crossed_level_in_price_order() {
    let candles = vec![
        Candle::flat(minute(0), 100.0),
        Candle::new(minute(1), 89.0, 89.0, 89.0, 89.0),
        Candle::new(minute(2), 111.0, 111.0, 111.0, 111.0),
    ];
    let outcome = BacktestRunner::new(reference_grid())
        .run(&series(candles))
        .unwrap();

    let prices: Vec<f64> = outcome.fills.iter().map(|f| f.price).collect();
    assert_eq!(prices, vec![95.0, 90.0, 95.0, 100.0, 105.0, 110.0]);

    let state = &outcome.final_state;
    assert_eq!(state.positions_grids, -2);
    assert_eq!(state.pairing_count, 1);
    assert_eq!(state.up_price(), None);
    // Both long round trips (90 -> 95, 95 -> 100) settle in the single pairing.
    assert!((state.pair_profit - 20.0).abs() < 1e-9);
    // Short 2 @ 105 and 2 @ 110 marked at 111.
    assert!((state.positions_profit + 14.0).abs() < 1e-9);
}

#[test]
fn report_expresses_profits_as_share_of_capital() {
    let outcome = BacktestRunner::new(reference_grid())
        .run(&series(oscillation(3)))
        .unwrap();
    let report = &outcome.report;

    assert_eq!(report.pairing_count, 3);
    assert!((report.paired_profit.amount - 30.0).abs() < 1e-9);
    assert!((report.paired_profit.pct_of_capital - 3.0).abs() < 1e-9);
    assert!((report.total_profit.amount - 30.0).abs() < 1e-9);
    assert!(report.unpaired_profit.amount.abs() < 1e-9);
    assert!(report.max_profit.amount >= report.total_profit.amount - 1e-9);
    assert!(report.max_loss.amount <= 0.0);
    assert_eq!(report.buy_count, 3);
    assert_eq!(report.sell_count, 3);
    assert_eq!(report.candle_count, 7);
    assert_eq!(report.grid_levels, 5);
    assert!((report.expected_profit_rate - 0.05).abs() < 1e-12);
    assert!((report.expected_profit_amount - 10.0).abs() < 1e-9);
    assert!(report.final_position.positions_grids == 0);
}
