use async_trait::async_trait;
use engine_core::{Agent, AgentKind, AgentResult, EngineError, PipelineContext, Timeframe};

use crate::math::sma_last;

/// Trend agreement across 15m / 1h / 4h: each interval votes by where price
/// sits relative to its own 20-bar average.
pub struct MultiTimeframeAgent;

const TREND_FRAMES: [Timeframe; 3] = [Timeframe::Min15, Timeframe::Hour1, Timeframe::Hour4];

#[async_trait]
impl Agent for MultiTimeframeAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::MultiTimeframe
    }

    async fn evaluate(&self, ctx: &PipelineContext) -> Result<AgentResult, EngineError> {
        let mut votes = Vec::new();
        let mut detail = serde_json::Map::new();

        for tf in TREND_FRAMES {
            let closes: Vec<f64> = ctx.candles(tf).iter().map(|c| c.close).collect();
            let vote = match (closes.last(), sma_last(&closes, 20)) {
                (Some(&last), Some(sma)) if sma > 0.0 => {
                    let deviation = (last - sma) / sma;
                    if deviation > 0.002 {
                        1i32
                    } else if deviation < -0.002 {
                        -1
                    } else {
                        0
                    }
                }
                _ => 0,
            };
            votes.push(vote);
            detail.insert(
                tf.label().to_string(),
                serde_json::json!(match vote {
                    1 => "up",
                    -1 => "down",
                    _ => "flat",
                }),
            );
        }

        let sum: i32 = votes.iter().sum();
        let score = sum as f64 / TREND_FRAMES.len() as f64;

        let agreement = votes.iter().filter(|&&v| v != 0 && v.signum() == sum.signum()).count();
        let confidence = match agreement {
            3 => 85.0,
            2 => 65.0,
            1 => 45.0,
            _ => 25.0,
        };

        Ok(AgentResult::clamped(
            score,
            confidence,
            serde_json::Value::Object(detail),
        ))
    }
}
