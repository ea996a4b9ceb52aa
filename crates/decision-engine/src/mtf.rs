//! Stage 1: multi-timeframe analysis. Each interval gets a view built from
//! the agents anchored to it, then the three views are scored for alignment.

use engine_core::{AgentKind, PipelineContext, Timeframe};

use crate::types::{MultiTimeframeAnalysis, Signal, TimeframeView, Trend};

/// Neutral band: interval signals inside it are neither buy nor sell
const NEUTRAL_BAND: f64 = 0.15;

const LOWER_ANCHORS: [AgentKind; 3] = [
    AgentKind::Momentum,
    AgentKind::OrderFlow,
    AgentKind::PatternRecognition,
];
const CURRENT_ANCHORS: [AgentKind; 3] = [
    AgentKind::MarketStructure,
    AgentKind::StatisticalEdge,
    AgentKind::RiskManager,
];
const HIGHER_ANCHORS: [AgentKind; 3] = [
    AgentKind::MultiTimeframe,
    AgentKind::VolatilityRegime,
    AgentKind::NewsSentiment,
];

pub fn analyze(ctx: &PipelineContext) -> MultiTimeframeAnalysis {
    let higher = interval_view(ctx, Timeframe::Hour4, &HIGHER_ANCHORS);
    let current = interval_view(ctx, Timeframe::Hour1, &CURRENT_ANCHORS);
    let lower = interval_view(ctx, Timeframe::Min15, &LOWER_ANCHORS);

    let mut alignment = 0.0;
    if higher.signal == current.signal {
        alignment += 40.0;
    }
    if current.signal == lower.signal {
        alignment += 30.0;
    }
    if higher.signal == lower.signal {
        alignment += 30.0;
    }

    let confidence = if alignment > 80.0 {
        90.0
    } else if alignment > 60.0 {
        70.0
    } else if alignment > 40.0 {
        50.0
    } else {
        30.0
    };

    MultiTimeframeAnalysis {
        higher,
        current,
        lower,
        alignment,
        confidence,
    }
}

fn interval_view(ctx: &PipelineContext, timeframe: Timeframe, anchors: &[AgentKind]) -> TimeframeView {
    let results: Vec<&engine_core::AgentResult> =
        anchors.iter().filter_map(|k| ctx.result(*k)).collect();

    let (mean_score, strength) = if results.is_empty() {
        (0.0, 0.0)
    } else {
        let n = results.len() as f64;
        (
            results.iter().map(|r| r.score).sum::<f64>() / n,
            results.iter().map(|r| r.confidence).sum::<f64>() / n,
        )
    };

    let signal = if mean_score > NEUTRAL_BAND {
        Signal::Buy
    } else if mean_score < -NEUTRAL_BAND {
        Signal::Sell
    } else {
        Signal::Neutral
    };
    let trend = match signal {
        Signal::Buy => Trend::Bullish,
        Signal::Sell => Trend::Bearish,
        Signal::Neutral => Trend::Sideways,
    };

    TimeframeView {
        interval: timeframe.label().to_string(),
        trend,
        signal,
        strength,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{AccountSnapshot, AgentResult};
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

    fn seed_all(ctx: &mut PipelineContext, score: f64, confidence: f64) {
        for kind in AgentKind::CHAIN {
            ctx.record_result(
                kind,
                AgentResult::clamped(score, confidence, serde_json::json!({})),
            );
        }
    }

    #[test]
    fn unanimous_bulls_align_fully() {
        let mut ctx = ctx();
        seed_all(&mut ctx, 0.6, 80.0);
        let mtf = analyze(&ctx);
        assert_eq!(mtf.alignment, 100.0);
        assert_eq!(mtf.confidence, 90.0);
        assert_eq!(mtf.current.signal, Signal::Buy);
        assert_eq!(mtf.higher.trend, Trend::Bullish);
        assert_eq!(mtf.current.strength, 80.0);
    }

    #[test]
    fn risk_manager_veto_neutralizes_the_current_interval() {
        let mut ctx = ctx();
        seed_all(&mut ctx, 0.6, 80.0);
        ctx.record_result(
            AgentKind::RiskManager,
            AgentResult::clamped(-0.8, 85.0, serde_json::json!({})),
        );
        let mtf = analyze(&ctx);
        // current anchors: 0.6, 0.6, -0.8 -> mean ~0.13, inside the band
        assert_eq!(mtf.current.signal, Signal::Neutral);
        // higher and lower still agree with each other
        assert_eq!(mtf.alignment, 30.0);
    }

    #[test]
    fn empty_results_read_as_flat_everywhere() {
        let mtf = analyze(&ctx());
        assert_eq!(mtf.current.signal, Signal::Neutral);
        assert_eq!(mtf.current.strength, 0.0);
        // Three identical neutral views trivially align
        assert_eq!(mtf.alignment, 100.0);
    }

    #[test]
    fn split_chain_scores_low_alignment() {
        let mut ctx = ctx();
        for (i, kind) in AgentKind::CHAIN.into_iter().enumerate() {
            let score = if i % 2 == 0 { 0.6 } else { -0.6 };
            ctx.record_result(
                kind,
                AgentResult::clamped(score, 70.0, serde_json::json!({})),
            );
        }
        let mtf = analyze(&ctx);
        assert!(mtf.alignment < 100.0);
    }
}
