use async_trait::async_trait;
use engine_core::{Agent, AgentKind, AgentResult, EngineError, PipelineContext};

use crate::math::{rsi_last, sma_last};

/// Rate-of-change plus RSI blend on the run's own interval.
pub struct MomentumAgent;

const ROC_PERIOD: usize = 10;
const RSI_PERIOD: usize = 14;

#[async_trait]
impl Agent for MomentumAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Momentum
    }

    async fn evaluate(&self, ctx: &PipelineContext) -> Result<AgentResult, EngineError> {
        let closes: Vec<f64> = ctx.candles(ctx.timeframe).iter().map(|c| c.close).collect();
        if closes.len() < ROC_PERIOD + 1 {
            return Ok(AgentResult::clamped(
                0.0,
                10.0,
                serde_json::json!({ "status": "insufficient-data" }),
            ));
        }

        let last = closes[closes.len() - 1];
        let base = closes[closes.len() - 1 - ROC_PERIOD];
        let roc_pct = if base != 0.0 {
            (last - base) / base * 100.0
        } else {
            0.0
        };

        let rsi = rsi_last(&closes, RSI_PERIOD);
        let sma20 = sma_last(&closes, 20);

        // ROC carries the direction; RSI tempers chased moves
        let roc_component = (roc_pct / 10.0).clamp(-1.0, 1.0);
        let rsi_component = (rsi - 50.0) / 50.0;
        let score = roc_component * 0.6 + rsi_component * 0.4;

        let confidence = (40.0 + roc_pct.abs() * 4.0).min(90.0);

        Ok(AgentResult::clamped(
            score,
            confidence,
            serde_json::json!({
                "rocPct": roc_pct,
                "rsi": rsi,
                "sma20": sma20,
            }),
        ))
    }
}
