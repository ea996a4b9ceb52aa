use async_trait::async_trait;
use engine_core::{Agent, AgentKind, AgentResult, EngineError, PipelineContext};

use crate::math::{returns, std_dev};

/// Classifies the current volatility regime from the standard deviation of
/// bar-to-bar returns. Direction-neutral: the score stays at zero and the
/// regime travels in the payload for downstream consumers (risk-manager, the
/// decision engine's setup typing).
pub struct VolatilityRegimeAgent;

const WINDOW: usize = 20;
pub const LOW_VOL_THRESHOLD: f64 = 0.01;
pub const HIGH_VOL_THRESHOLD: f64 = 0.025;

#[async_trait]
impl Agent for VolatilityRegimeAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::VolatilityRegime
    }

    async fn evaluate(&self, ctx: &PipelineContext) -> Result<AgentResult, EngineError> {
        let closes: Vec<f64> = ctx.candles(ctx.timeframe).iter().map(|c| c.close).collect();
        if closes.len() < WINDOW {
            return Ok(AgentResult::clamped(
                0.0,
                10.0,
                serde_json::json!({ "status": "insufficient-data", "regime": "unknown" }),
            ));
        }

        let window = &closes[closes.len() - WINDOW..];
        let vol = std_dev(&returns(window));

        let regime = if vol < LOW_VOL_THRESHOLD {
            "low"
        } else if vol < HIGH_VOL_THRESHOLD {
            "medium"
        } else {
            "high"
        };

        Ok(AgentResult::clamped(
            0.0,
            65.0,
            serde_json::json!({
                "regime": regime,
                "stdDev": vol,
                "window": WINDOW,
            }),
        ))
    }
}
