use async_trait::async_trait;
use engine_core::{Agent, AgentKind, AgentResult, EngineError, PipelineContext};

use crate::math::{sma_last, std_dev};

/// Mean-reversion edge from the z-score of the last close against its 20-bar
/// distribution: stretched prices are faded, prices near the mean carry no
/// edge.
pub struct StatisticalEdgeAgent;

const WINDOW: usize = 20;

#[async_trait]
impl Agent for StatisticalEdgeAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::StatisticalEdge
    }

    async fn evaluate(&self, ctx: &PipelineContext) -> Result<AgentResult, EngineError> {
        let closes: Vec<f64> = ctx.candles(ctx.timeframe).iter().map(|c| c.close).collect();
        if closes.len() < WINDOW {
            return Ok(AgentResult::clamped(
                0.0,
                10.0,
                serde_json::json!({ "status": "insufficient-data" }),
            ));
        }

        let window = &closes[closes.len() - WINDOW..];
        let last = window[window.len() - 1];
        let mean = sma_last(window, WINDOW).unwrap_or(last);
        let sd = std_dev(window);

        let z = if sd > 0.0 { (last - mean) / sd } else { 0.0 };

        // Fade stretched moves; inside one sigma there is nothing to fade
        let score = if z.abs() > 1.0 {
            (-z / 3.0).clamp(-1.0, 1.0)
        } else {
            0.0
        };
        let confidence = (30.0 + 18.0 * z.abs()).min(85.0);

        Ok(AgentResult::clamped(
            score,
            confidence,
            serde_json::json!({ "zScore": z, "mean": mean, "stdDev": sd }),
        ))
    }
}
