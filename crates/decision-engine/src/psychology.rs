//! Stage 5: crowd psychology. Fear/greed from momentum, a contrarian signal
//! at the stretched ends, a Wyckoff-style regime read, and the smart-money
//! view lifted from the order-flow agent.

use engine_core::{AgentKind, PipelineContext};

use crate::types::{MarketContext, MarketRegime, Psychology, SentimentBucket, Signal, SmartMoney, Trend};

const CONTRARIAN_STRETCH: f64 = 30.0;

pub fn assess(ctx: &PipelineContext, market: &MarketContext) -> Psychology {
    let fear_greed_index = (50.0 + market.momentum).clamp(0.0, 100.0);

    let sentiment = if fear_greed_index < 20.0 {
        SentimentBucket::ExtremeFear
    } else if fear_greed_index < 40.0 {
        SentimentBucket::Fear
    } else if fear_greed_index < 60.0 {
        SentimentBucket::Neutral
    } else if fear_greed_index < 80.0 {
        SentimentBucket::Greed
    } else {
        SentimentBucket::ExtremeGreed
    };

    // The crowd stretched far off balance argues for the other side
    let contrarian_signal = if fear_greed_index - 50.0 > CONTRARIAN_STRETCH {
        Some(Signal::Sell)
    } else if 50.0 - fear_greed_index > CONTRARIAN_STRETCH {
        Some(Signal::Buy)
    } else {
        None
    };

    let regime = classify_regime(ctx, market, fear_greed_index);

    let smart_money = ctx
        .result(AgentKind::OrderFlow)
        .map(|flow| SmartMoney {
            direction: if flow.score > 0.15 {
                Signal::Buy
            } else if flow.score < -0.15 {
                Signal::Sell
            } else {
                Signal::Neutral
            },
            confidence: flow.confidence,
        })
        .unwrap_or(SmartMoney {
            direction: Signal::Neutral,
            confidence: 0.0,
        });

    Psychology {
        fear_greed_index,
        sentiment,
        contrarian_signal,
        regime,
        smart_money,
    }
}

/// Wyckoff phases from trend and volume behavior: trending moves on rising
/// volume are genuine (markup/markdown), on fading volume they are the
/// handoff phases (distribution/accumulation).
fn classify_regime(ctx: &PipelineContext, market: &MarketContext, fear_greed: f64) -> MarketRegime {
    let rising_volume = volume_rising(ctx);

    match market.trend {
        Trend::Bullish if rising_volume => MarketRegime::Markup,
        Trend::Bullish => MarketRegime::Distribution,
        Trend::Bearish if rising_volume => MarketRegime::Markdown,
        Trend::Bearish => MarketRegime::Accumulation,
        Trend::Sideways => {
            if fear_greed < 50.0 {
                MarketRegime::Accumulation
            } else {
                MarketRegime::Distribution
            }
        }
    }
}

fn volume_rising(ctx: &PipelineContext) -> bool {
    let candles = ctx.candles(ctx.timeframe);
    if candles.len() < 20 {
        return false;
    }
    let recent: f64 = candles[candles.len() - 5..]
        .iter()
        .map(|c| c.volume)
        .sum::<f64>()
        / 5.0;
    let prior: f64 = candles[candles.len() - 20..candles.len() - 5]
        .iter()
        .map(|c| c.volume)
        .sum::<f64>()
        / 15.0;
    prior > 0.0 && recent > prior
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Volatility;
    use engine_core::{AccountSnapshot, AgentResult, Timeframe};
    use std::collections::HashMap;

    fn ctx() -> PipelineContext {
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
            HashMap::new(),
        )
    }

    fn market(momentum: f64, trend: Trend) -> MarketContext {
        MarketContext {
            price: 100.0,
            volume: 100.0,
            trend,
            volatility: Volatility::Medium,
            momentum,
            support: 98.0,
            resistance: 102.0,
        }
    }

    #[test]
    fn fear_greed_tracks_momentum_and_clamps() {
        let p = assess(&ctx(), &market(0.0, Trend::Sideways));
        assert_eq!(p.fear_greed_index, 50.0);
        assert_eq!(p.sentiment, SentimentBucket::Neutral);
        assert!(p.contrarian_signal.is_none());

        let p = assess(&ctx(), &market(90.0, Trend::Bullish));
        assert_eq!(p.fear_greed_index, 100.0);
        assert_eq!(p.sentiment, SentimentBucket::ExtremeGreed);
        assert_eq!(p.contrarian_signal, Some(Signal::Sell));

        let p = assess(&ctx(), &market(-90.0, Trend::Bearish));
        assert_eq!(p.fear_greed_index, 0.0);
        assert_eq!(p.sentiment, SentimentBucket::ExtremeFear);
        assert_eq!(p.contrarian_signal, Some(Signal::Buy));
    }

    #[test]
    fn smart_money_reads_the_order_flow_agent() {
        let mut ctx = ctx();
        ctx.record_result(
            AgentKind::OrderFlow,
            AgentResult::clamped(0.6, 80.0, serde_json::json!({})),
        );
        let p = assess(&ctx, &market(0.0, Trend::Sideways));
        assert_eq!(p.smart_money.direction, Signal::Buy);
        assert_eq!(p.smart_money.confidence, 80.0);
    }

    #[test]
    fn missing_order_flow_is_neutral_smart_money() {
        let p = assess(&ctx(), &market(0.0, Trend::Sideways));
        assert_eq!(p.smart_money.direction, Signal::Neutral);
        assert_eq!(p.smart_money.confidence, 0.0);
    }
}
