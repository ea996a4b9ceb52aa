//! Stage 2: market context on the run's own interval — price, volume,
//! momentum versus the 20-candle average, volatility regime, and the key
//! levels the stop will anchor to.

use engine_core::{Candle, PipelineContext};

use crate::types::{MarketContext, MultiTimeframeAnalysis, Volatility};

const SMA_WINDOW: usize = 20;
const LEVEL_WINDOW: usize = 40;
const PIVOT_WING: usize = 2;
/// Fallback band around price when the window yields no usable swing level
const DEFAULT_LEVEL_PCT: f64 = 0.02;

const LOW_VOL: f64 = 0.01;
const HIGH_VOL: f64 = 0.025;

pub fn derive(ctx: &PipelineContext, mtf: &MultiTimeframeAnalysis) -> MarketContext {
    let candles = ctx.candles(ctx.timeframe);
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    let price = closes.last().copied().unwrap_or(0.0);
    let volume = candles.last().map(|c| c.volume).unwrap_or(0.0);

    let momentum = momentum_pct(&closes);
    let volatility = classify_volatility(&closes);
    let (support, resistance) = key_levels(candles, price);

    MarketContext {
        price,
        volume,
        trend: mtf.current.trend,
        volatility,
        momentum,
        support,
        resistance,
    }
}

/// Percentage deviation of the last close from its 20-candle SMA
fn momentum_pct(closes: &[f64]) -> f64 {
    if closes.len() < SMA_WINDOW {
        return 0.0;
    }
    let window = &closes[closes.len() - SMA_WINDOW..];
    let sma = window.iter().sum::<f64>() / SMA_WINDOW as f64;
    if sma <= 0.0 {
        return 0.0;
    }
    let last = window[window.len() - 1];
    ((last - sma) / sma * 100.0).clamp(-100.0, 100.0)
}

fn classify_volatility(closes: &[f64]) -> Volatility {
    if closes.len() < SMA_WINDOW {
        return Volatility::Low;
    }
    let window = &closes[closes.len() - SMA_WINDOW..];
    let returns: Vec<f64> = window
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    if returns.len() < 2 {
        return Volatility::Low;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    let sd = var.sqrt();

    if sd < LOW_VOL {
        Volatility::Low
    } else if sd < HIGH_VOL {
        Volatility::Medium
    } else {
        Volatility::High
    }
}

/// Nearest swing low below price and swing high above it, defaulting to a
/// ±2% band when the window has no usable pivot on that side
fn key_levels(candles: &[Candle], price: f64) -> (f64, f64) {
    let window = &candles[candles.len().saturating_sub(LEVEL_WINDOW)..];

    let lows: Vec<f64> = window.iter().map(|c| c.low).collect();
    let highs: Vec<f64> = window.iter().map(|c| c.high).collect();

    let support = pivot_points(&lows, false)
        .into_iter()
        .filter(|&p| p < price)
        .fold(None::<f64>, |best, p| {
            Some(best.map_or(p, |b| if p > b { p } else { b }))
        })
        .unwrap_or(price * (1.0 - DEFAULT_LEVEL_PCT));

    let resistance = pivot_points(&highs, true)
        .into_iter()
        .filter(|&p| p > price)
        .fold(None::<f64>, |best, p| {
            Some(best.map_or(p, |b| if p < b { p } else { b }))
        })
        .unwrap_or(price * (1.0 + DEFAULT_LEVEL_PCT));

    (support, resistance)
}

fn pivot_points(series: &[f64], is_high: bool) -> Vec<f64> {
    let mut out = Vec::new();
    for i in PIVOT_WING..series.len().saturating_sub(PIVOT_WING) {
        let v = series[i];
        let beats = |other: f64| if is_high { v > other } else { v < other };
        let left = (i - PIVOT_WING..i).all(|j| beats(series[j]));
        let right = (i + 1..=i + PIVOT_WING).all(|j| beats(series[j]));
        if left && right {
            out.push(v);
        }
    }
    out
}
