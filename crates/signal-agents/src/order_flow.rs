use async_trait::async_trait;
use engine_core::{Agent, AgentKind, AgentResult, EngineError, PipelineContext};

/// Volume-delta proxy: splits each candle's volume into buy and sell pressure
/// by where the close sits in the candle's range, then scores the imbalance
/// over the recent window.
pub struct OrderFlowAgent;

const WINDOW: usize = 20;

#[async_trait]
impl Agent for OrderFlowAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::OrderFlow
    }

    async fn evaluate(&self, ctx: &PipelineContext) -> Result<AgentResult, EngineError> {
        let candles = ctx.candles(ctx.timeframe);
        if candles.len() < 5 {
            return Ok(AgentResult::clamped(
                0.0,
                10.0,
                serde_json::json!({ "status": "insufficient-data" }),
            ));
        }

        let window = &candles[candles.len().saturating_sub(WINDOW)..];
        let mut buy_volume = 0.0;
        let mut sell_volume = 0.0;
        for c in window {
            let range = c.high - c.low;
            if range <= 0.0 {
                buy_volume += c.volume / 2.0;
                sell_volume += c.volume / 2.0;
                continue;
            }
            let close_position = (c.close - c.low) / range;
            buy_volume += c.volume * close_position;
            sell_volume += c.volume * (1.0 - close_position);
        }

        let total = buy_volume + sell_volume;
        let imbalance = if total > 0.0 {
            (buy_volume - sell_volume) / total
        } else {
            0.0
        };

        let confidence = (45.0 + 45.0 * imbalance.abs()).min(90.0);

        Ok(AgentResult::clamped(
            imbalance,
            confidence,
            serde_json::json!({
                "buyVolume": buy_volume,
                "sellVolume": sell_volume,
                "imbalance": imbalance,
                "window": window.len(),
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use engine_core::{AccountSnapshot, Candle, Timeframe};
    use std::collections::HashMap;

    fn ctx(candles: Vec<Candle>) -> PipelineContext {
        let mut market_data = HashMap::new();
        market_data.insert("1h".to_string(), candles);
        PipelineContext::new(
            "BTCUSDT",
            Timeframe::Hour1,
            AccountSnapshot {
                id: "acct".into(),
                starting_balance: 10_000.0,
                current_balance: 10_000.0,
                max_leverage: 3.0,
                max_risk_per_trade: 2.0,
            },
            market_data,
        )
    }

    fn candle(low: f64, high: f64, close: f64, volume: f64) -> Candle {
        Candle {
            open_time: Utc::now(),
            open: (low + high) / 2.0,
            high,
            low,
            close,
            volume,
        }
    }

    #[tokio::test]
    async fn closes_at_highs_read_as_buying() {
        let candles: Vec<Candle> = (0..10).map(|_| candle(99.0, 101.0, 101.0, 50.0)).collect();
        let result = OrderFlowAgent.evaluate(&ctx(candles)).await.unwrap();
        assert!(result.score > 0.9);
        assert!(result.confidence > 80.0);
    }

    #[tokio::test]
    async fn balanced_closes_read_as_neutral() {
        let candles: Vec<Candle> = (0..10).map(|_| candle(99.0, 101.0, 100.0, 50.0)).collect();
        let result = OrderFlowAgent.evaluate(&ctx(candles)).await.unwrap();
        assert!(result.score.abs() < 0.01);
    }
}
