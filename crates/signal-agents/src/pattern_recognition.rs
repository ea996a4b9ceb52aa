use async_trait::async_trait;
use engine_core::{Agent, AgentKind, AgentResult, Candle, EngineError, PipelineContext};

/// Last-candle reversal patterns: engulfing bodies, hammers, shooting stars.
pub struct PatternRecognitionAgent;

#[async_trait]
impl Agent for PatternRecognitionAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::PatternRecognition
    }

    async fn evaluate(&self, ctx: &PipelineContext) -> Result<AgentResult, EngineError> {
        let candles = ctx.candles(ctx.timeframe);
        if candles.len() < 2 {
            return Ok(AgentResult::clamped(
                0.0,
                10.0,
                serde_json::json!({ "status": "insufficient-data" }),
            ));
        }

        let prev = &candles[candles.len() - 2];
        let cur = &candles[candles.len() - 1];

        let (pattern, score, confidence) = detect(prev, cur);

        Ok(AgentResult::clamped(
            score,
            confidence,
            serde_json::json!({ "pattern": pattern }),
        ))
    }
}

fn body(c: &Candle) -> f64 {
    (c.close - c.open).abs()
}

fn range(c: &Candle) -> f64 {
    c.high - c.low
}

fn detect(prev: &Candle, cur: &Candle) -> (&'static str, f64, f64) {
    let cur_bull = cur.close > cur.open;
    let prev_bull = prev.close > prev.open;

    // Engulfing: current body swallows the previous body, opposite color
    if cur_bull && !prev_bull && cur.close > prev.open && cur.open < prev.close {
        return ("bullish-engulfing", 0.6, 70.0);
    }
    if !cur_bull && prev_bull && cur.close < prev.open && cur.open > prev.close {
        return ("bearish-engulfing", -0.6, 70.0);
    }

    let r = range(cur);
    if r > 0.0 {
        let b = body(cur);
        let lower_wick = cur.open.min(cur.close) - cur.low;
        let upper_wick = cur.high - cur.open.max(cur.close);

        // Hammer / shooting star: one long wick, close near the opposite end
        if b > 0.0 && lower_wick > 2.0 * b && upper_wick < b {
            return ("hammer", 0.4, 55.0);
        }
        if b > 0.0 && upper_wick > 2.0 * b && lower_wick < b {
            return ("shooting-star", -0.4, 55.0);
        }

        if b < 0.1 * r {
            return ("doji", 0.0, 35.0);
        }
    }

    ("none", 0.0, 25.0)
}
