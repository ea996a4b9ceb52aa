use async_trait::async_trait;
use engine_core::{Agent, AgentKind, AgentResult, EngineError, PipelineContext};

/// Reads market structure from swing pivots: a sequence of higher highs and
/// higher lows scores bullish, lower highs and lower lows bearish.
pub struct MarketStructureAgent;

const PIVOT_WING: usize = 2;
const WINDOW: usize = 60;

#[async_trait]
impl Agent for MarketStructureAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::MarketStructure
    }

    async fn evaluate(&self, ctx: &PipelineContext) -> Result<AgentResult, EngineError> {
        let candles = ctx.candles(ctx.timeframe);
        if candles.len() < PIVOT_WING * 2 + 3 {
            return Ok(AgentResult::clamped(
                0.0,
                10.0,
                serde_json::json!({ "status": "insufficient-data", "candles": candles.len() }),
            ));
        }

        let window = &candles[candles.len().saturating_sub(WINDOW)..];
        let highs: Vec<f64> = window.iter().map(|c| c.high).collect();
        let lows: Vec<f64> = window.iter().map(|c| c.low).collect();

        let swing_highs = pivots(&highs, true);
        let swing_lows = pivots(&lows, false);

        let rising_highs = rising_count(&swing_highs);
        let rising_lows = rising_count(&swing_lows);
        let falling_highs = swing_highs.len().saturating_sub(1) - rising_highs;
        let falling_lows = swing_lows.len().saturating_sub(1) - rising_lows;

        let up = (rising_highs + rising_lows) as f64;
        let down = (falling_highs + falling_lows) as f64;
        let total = up + down;

        let score = if total > 0.0 { (up - down) / total } else { 0.0 };
        let pivot_count = swing_highs.len() + swing_lows.len();
        let confidence = (35.0 + 6.0 * pivot_count as f64).min(90.0);

        Ok(AgentResult::clamped(
            score,
            confidence,
            serde_json::json!({
                "swingHighs": swing_highs.len(),
                "swingLows": swing_lows.len(),
                "risingHighs": rising_highs,
                "risingLows": rising_lows,
            }),
        ))
    }
}

/// Pivot points: a high (or low) strictly beyond its `PIVOT_WING` neighbors
/// on each side
fn pivots(series: &[f64], is_high: bool) -> Vec<f64> {
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

fn rising_count(pivots: &[f64]) -> usize {
    pivots.windows(2).filter(|w| w[1] > w[0]).count()
}
