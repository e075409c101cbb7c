//! Technical and fundamental indicators
//!
//! Every function here is pure: the result depends only on its arguments,
//! never on another ticker or on global state.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::models::{PriceBar, Trend, VolumeFlag};
use crate::utils::round2;

pub const SMA_WINDOW: usize = 200;
pub const RSI_WINDOW: usize = 14;
pub const SUPPORT_LOOKBACK: usize = 90;
pub const SUPPORT_BINS: usize = 20;
pub const VOLUME_SPIKE_WINDOW: usize = 20;
pub const VOLUME_SPIKE_THRESHOLD: f64 = 1.5;
pub const DEFAULT_IMPLIED_VOLATILITY: f64 = 0.25;
pub const POP_HORIZON_YEARS: f64 = 30.0 / 365.0;
pub const RISK_FREE_RATE: f64 = 0.045;

/// Returned by [`probability_of_profit`] when the model inputs are degenerate
pub const NEUTRAL_POP: f64 = 50.0;

/// Mean of the last `period` values, `None` when the series is shorter than `period`
pub fn simple_moving_average(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Bullish only when price is strictly above its moving average
pub fn classify_trend(price: f64, moving_average: f64) -> Trend {
    if price > moving_average {
        Trend::Bull
    } else {
        Trend::Bear
    }
}

/// RSI-like oscillator over the last `window` close-to-close changes.
///
/// Gains and losses are averaged with a simple mean over the window. With no
/// losses the value saturates at 100; a completely flat window reads 50.
/// Returns `None` when fewer than `window + 1` closes are available.
pub fn relative_strength_index(closes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || closes.len() < window + 1 {
        return None;
    }

    let recent = &closes[closes.len() - window - 1..];
    let (gains, losses) = recent
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((0.0, 0.0), |(g, l), delta| {
            if delta > 0.0 {
                (g + delta, l)
            } else {
                (g, l - delta)
            }
        });

    let avg_gain = gains / window as f64;
    let avg_loss = losses / window as f64;

    if !avg_gain.is_finite() || !avg_loss.is_finite() {
        return None;
    }

    let rsi = if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    Some(rsi.clamp(0.0, 100.0))
}

/// Volume-at-price support ("whale floor").
///
/// Splits the closing-price range of `bars` into `bins` equal-width,
/// right-closed buckets, sums volume per bucket and returns the lower edge of
/// the heaviest bucket. The lowest edge sits 0.1% of the range below the
/// minimum so the minimum itself falls inside the first bucket. Ties go to the
/// lower bucket.
pub fn volume_at_price_support(bars: &[PriceBar], bins: usize) -> Option<f64> {
    if bars.is_empty() || bins == 0 {
        return None;
    }

    let (mut min, mut max) = bars.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), b| {
        (lo.min(b.close), hi.max(b.close))
    });
    if !min.is_finite() || !max.is_finite() {
        return None;
    }

    let mut edges: Vec<f64>;
    if max == min {
        // A flat range is widened by 0.1% on each side
        let pad = |v: f64| if v == 0.0 { 0.001 } else { 0.001 * v.abs() };
        min -= pad(min);
        max += pad(max);
        edges = linspace(min, max, bins + 1);
    } else {
        edges = linspace(min, max, bins + 1);
        edges[0] -= (max - min) * 0.001;
    }

    let mut volume_per_bin = vec![0.0_f64; bins];
    for bar in bars {
        let idx = (0..bins)
            .find(|&i| bar.close <= edges[i + 1])
            .unwrap_or(bins - 1);
        volume_per_bin[idx] += bar.volume as f64;
    }

    let heaviest = volume_per_bin
        .iter()
        .enumerate()
        .fold(0, |best, (i, v)| if *v > volume_per_bin[best] { i } else { best });

    Some(round2(edges[heaviest]))
}

fn linspace(start: f64, end: f64, points: usize) -> Vec<f64> {
    let step = (end - start) / (points - 1) as f64;
    (0..points)
        .map(|i| if i == points - 1 { end } else { start + step * i as f64 })
        .collect()
}

/// Lognormal probability (in percent, two decimals) that `spot` stays above
/// `strike` after `years`, the N(d2) term of Black-Scholes.
///
/// Non-positive volatility or horizon, non-positive prices, or a non-finite
/// intermediate all yield [`NEUTRAL_POP`].
pub fn probability_of_profit(spot: f64, strike: f64, volatility: f64, years: f64, rate: f64) -> f64 {
    if volatility <= 0.0 || years <= 0.0 || spot <= 0.0 || strike <= 0.0 {
        return NEUTRAL_POP;
    }

    let d2 = ((spot / strike).ln() + (rate - 0.5 * volatility.powi(2)) * years)
        / (volatility * years.sqrt());
    if !d2.is_finite() {
        return NEUTRAL_POP;
    }

    match Normal::new(0.0, 1.0) {
        Ok(normal) => round2(normal.cdf(d2) * 100.0),
        Err(_) => NEUTRAL_POP,
    }
}

/// Strike idea: the whale floor when it sits below price, otherwise 5% below price
pub fn target_strike(price: f64, support: f64) -> f64 {
    if support < price {
        support
    } else {
        round2(price * 0.95)
    }
}

/// Latest volume divided by the mean of the `window` samples before it
pub fn volume_ratio(volumes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || volumes.len() < window + 1 {
        return None;
    }
    let latest = volumes[volumes.len() - 1];
    let trailing = &volumes[volumes.len() - 1 - window..volumes.len() - 1];
    let mean = trailing.iter().sum::<f64>() / window as f64;
    if mean <= 0.0 {
        return None;
    }
    Some(latest / mean)
}

pub fn volume_spike(volumes: &[f64], window: usize, threshold: f64) -> VolumeFlag {
    match volume_ratio(volumes, window) {
        Some(ratio) if ratio >= threshold => VolumeFlag::Elevated,
        _ => VolumeFlag::Normal,
    }
}

/// Compound annual growth rate in percent
pub fn cagr(start_price: f64, end_price: f64, years: f64) -> f64 {
    if start_price <= 0.0 || years <= 0.0 {
        return 0.0;
    }
    ((end_price / start_price).powf(1.0 / years) - 1.0) * 100.0
}

/// Simple percentage return between two prices
pub fn total_return(start_price: f64, end_price: f64) -> f64 {
    if start_price <= 0.0 {
        return 0.0;
    }
    (end_price - start_price) / start_price * 100.0
}

/// Blend of a Graham growth value and a 19x earnings multiple.
/// `growth` is a fraction; it is capped at 20% inside the Graham term.
pub fn fair_value(eps: f64, growth: f64) -> f64 {
    if eps <= 0.0 {
        return 0.0;
    }
    let growth_pct = growth * 100.0;
    let intrinsic = eps * (8.5 + 1.5 * growth_pct.min(20.0));
    let pe_basis = eps * 19.0;
    round2((intrinsic + pe_basis) / 2.0)
}

/// Stop distance as a fraction of price, scaled by beta and clamped to [6%, 18%]
pub fn risk_buffer(beta: f64) -> f64 {
    (beta * 0.08).clamp(0.06, 0.18)
}
