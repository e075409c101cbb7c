//! Indicator properties over realistic series

use pretty_assertions::assert_eq;
use test_log::test;
use whale_screener::analysis::indicators::{
    classify_trend, probability_of_profit, relative_strength_index, volume_at_price_support, DEFAULT_IMPLIED_VOLATILITY,
    NEUTRAL_POP, POP_HORIZON_YEARS, RISK_FREE_RATE, SUPPORT_BINS, SUPPORT_LOOKBACK,
};
use whale_screener::models::Trend;
use whale_screener::scanner::compute_technicals;

use crate::common::fixtures;

#[test]
fn test_rsi_stays_in_range_on_mixed_series() {
    // Deterministic zig-zag with drifting amplitude
    let closes: Vec<f64> = (0..300)
        .map(|i| {
            let i = i as f64;
            100.0 + (i * 0.7).sin() * (5.0 + i * 0.05) + i * 0.1
        })
        .collect();

    for end in 15..closes.len() {
        let rsi = relative_strength_index(&closes[..end], 14).unwrap();
        assert!((0.0..=100.0).contains(&rsi), "RSI {} out of range at {}", rsi, end);
    }
}

#[test]
fn test_rsi_of_pullback_fixture() {
    let shallow = fixtures::pullback_series(0.4);
    let rsi = relative_strength_index(&shallow.closes(), 14).unwrap();
    assert!((rsi - 28.5714).abs() < 1e-3, "rsi {}", rsi);

    let deeper = fixtures::pullback_series(0.6);
    let rsi = relative_strength_index(&deeper.closes(), 14).unwrap();
    assert!((rsi - 37.5).abs() < 1e-9, "rsi {}", rsi);
}

#[test]
fn test_support_lies_inside_price_range() {
    for series in [
        fixtures::pullback_series(0.4),
        fixtures::downtrend_series(),
        fixtures::linear_series(10.0, 30.0, 120),
    ] {
        let window = series.tail(SUPPORT_LOOKBACK);
        let support = volume_at_price_support(window, SUPPORT_BINS).unwrap();
        let min = window.iter().map(|b| b.close).fold(f64::INFINITY, f64::min);
        let max = window.iter().map(|b| b.close).fold(f64::NEG_INFINITY, f64::max);
        // The first edge sits 0.1% of the range below the minimum
        let slack = (max - min) * 0.001 + 0.01;
        assert!(support >= min - slack && support <= max, "support {} outside [{}, {}]", support, min, max);
    }
}

#[test]
fn test_support_follows_heavy_volume() {
    let series = fixtures::pullback_series(0.4);
    let support = volume_at_price_support(series.tail(SUPPORT_LOOKBACK), SUPPORT_BINS).unwrap();
    assert_eq!(support, 122.57);
}

#[test]
fn test_pop_is_a_percentage() {
    for (spot, strike, iv) in [(100.0, 95.0, 0.25), (100.0, 150.0, 0.8), (100.0, 20.0, 0.1), (50.0, 49.97, 2.0)] {
        let pop = probability_of_profit(spot, strike, iv, POP_HORIZON_YEARS, RISK_FREE_RATE);
        assert!((0.0..=100.0).contains(&pop), "pop {} for {}/{}", pop, spot, strike);
    }
}

#[test]
fn test_pop_rises_as_strike_falls() {
    let near = probability_of_profit(100.0, 98.0, DEFAULT_IMPLIED_VOLATILITY, POP_HORIZON_YEARS, RISK_FREE_RATE);
    let far = probability_of_profit(100.0, 85.0, DEFAULT_IMPLIED_VOLATILITY, POP_HORIZON_YEARS, RISK_FREE_RATE);
    assert!(far > near);
}

#[test]
fn test_pop_degenerate_inputs() {
    assert_eq!(probability_of_profit(100.0, 0.0, 0.25, POP_HORIZON_YEARS, RISK_FREE_RATE), NEUTRAL_POP);
    assert_eq!(probability_of_profit(100.0, 95.0, 0.0, POP_HORIZON_YEARS, RISK_FREE_RATE), NEUTRAL_POP);
}

#[test]
fn test_trend_on_fixtures() {
    let up = compute_technicals(&fixtures::pullback_series(0.4), None).unwrap();
    assert_eq!(up.trend, Trend::Bull);
    assert!(up.sma200 < up.price);

    let down = compute_technicals(&fixtures::downtrend_series(), None).unwrap();
    assert_eq!(down.trend, Trend::Bear);
    assert_eq!(classify_trend(down.sma200, down.sma200), Trend::Bear);
}

#[test]
fn test_technicals_use_snapshot_volatility() {
    let series = fixtures::pullback_series(0.4);
    let calm = compute_technicals(&series, Some(0.05)).unwrap();
    let wild = compute_technicals(&series, Some(2.0)).unwrap();

    assert_eq!(calm.target_strike, 122.57);
    assert_eq!(calm.pop, 100.0);
    assert!(wild.pop > 49.0 && wild.pop < 52.0, "pop {}", wild.pop);
}
