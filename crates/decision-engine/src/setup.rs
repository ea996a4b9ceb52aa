//! Stage 3: setup identification. Builds the confluence list, types the
//! setup, scores quality, and picks the invalidation level. Returns `None`
//! whenever the market does not offer a tradeable pattern — thin confluence,
//! low quality, or a directionless current interval. A hard risk-manager
//! veto needs no rule of its own: the risk-manager anchors the current
//! interval, so a strong opposing score drags that signal to neutral.

use engine_core::{AgentKind, PipelineContext};

use crate::types::{
    EntryTiming, MarketContext, MultiTimeframeAnalysis, SetupType, Signal, TradeSetup, Volatility,
};

const MIN_CONFLUENCE: usize = 3;
const MIN_QUALITY: f64 = 70.0;

pub fn identify(
    ctx: &PipelineContext,
    mtf: &MultiTimeframeAnalysis,
    market: &MarketContext,
) -> Option<TradeSetup> {
    let direction = mtf.current.signal;
    if direction == Signal::Neutral {
        return None;
    }

    let confluence = confluence_factors(ctx, mtf, market, direction);
    if confluence.len() < MIN_CONFLUENCE {
        return None;
    }

    let setup_type = classify(mtf, market);
    let quality = quality_score(&confluence, mtf, market);
    if quality < MIN_QUALITY {
        return None;
    }

    let invalidation_price = match direction {
        Signal::Buy => market.support,
        Signal::Sell => market.resistance,
        Signal::Neutral => unreachable!("neutral direction returns above"),
    };

    Some(TradeSetup {
        setup_type,
        direction,
        timing: entry_timing(mtf, market),
        risks: risk_factors(ctx, mtf, market, direction),
        confluence,
        quality,
        invalidation_price,
    })
}

fn confluence_factors(
    ctx: &PipelineContext,
    mtf: &MultiTimeframeAnalysis,
    market: &MarketContext,
    direction: Signal,
) -> Vec<String> {
    let mut factors = Vec::new();
    let dir_sign = if direction == Signal::Buy { 1.0 } else { -1.0 };

    if mtf.alignment > 60.0 {
        factors.push("timeframe-alignment".to_string());
    }

    let agreeing = ctx
        .agent_results
        .values()
        .filter(|r| r.score.abs() >= 0.3 && r.score.signum() == dir_sign)
        .count();
    if agreeing >= 5 {
        factors.push("multi-agent-agreement".to_string());
    }

    if market.momentum.abs() > 40.0 && market.momentum.signum() == dir_sign {
        factors.push("momentum-thrust".to_string());
    }

    if volume_confirms(ctx) {
        factors.push("volume-confirmation".to_string());
    }

    let key_level = match direction {
        Signal::Buy => market.support,
        _ => market.resistance,
    };
    if market.price > 0.0 && ((market.price - key_level).abs() / market.price) < 0.01 {
        factors.push("key-level-proximity".to_string());
    }

    if let Some(flow) = ctx.result(AgentKind::OrderFlow) {
        if flow.score.abs() > 0.4 && flow.score.signum() == dir_sign {
            factors.push("smart-money-flow".to_string());
        }
    }

    factors
}

fn volume_confirms(ctx: &PipelineContext) -> bool {
    let candles = ctx.candles(ctx.timeframe);
    if candles.len() < 21 {
        return false;
    }
    let last = candles[candles.len() - 1].volume;
    let window = &candles[candles.len() - 21..candles.len() - 1];
    let avg = window.iter().map(|c| c.volume).sum::<f64>() / window.len() as f64;
    avg > 0.0 && last > avg * 1.1
}

fn classify(mtf: &MultiTimeframeAnalysis, market: &MarketContext) -> SetupType {
    if mtf.higher.signal != mtf.current.signal {
        SetupType::Reversal
    } else if market.momentum.abs() > 60.0 {
        SetupType::Momentum
    } else if mtf.alignment > 80.0 {
        SetupType::Continuation
    } else if market.trend == crate::types::Trend::Sideways && market.volatility == Volatility::Low
    {
        SetupType::MeanReversion
    } else {
        SetupType::Breakout
    }
}

fn quality_score(
    confluence: &[String],
    mtf: &MultiTimeframeAnalysis,
    market: &MarketContext,
) -> f64 {
    let mut quality = 50.0 + 8.0 * confluence.len() as f64 + (mtf.alignment - 50.0) / 2.0;
    if market.volatility == Volatility::Low {
        quality += 5.0;
    }
    if market.volatility == Volatility::High
        && confluence.iter().any(|f| f == "volume-confirmation")
    {
        quality += 10.0;
    }
    quality.clamp(0.0, 100.0)
}

fn entry_timing(mtf: &MultiTimeframeAnalysis, market: &MarketContext) -> EntryTiming {
    if market.momentum.abs() > 80.0 {
        // Chasing a fully extended move
        EntryTiming::Late
    } else if mtf.alignment >= 80.0 && market.momentum.abs() >= 20.0 {
        EntryTiming::Optimal
    } else {
        EntryTiming::Early
    }
}

fn risk_factors(
    ctx: &PipelineContext,
    mtf: &MultiTimeframeAnalysis,
    market: &MarketContext,
    direction: Signal,
) -> Vec<String> {
    let mut risks = Vec::new();

    if market.volatility == Volatility::High {
        risks.push("high-volatility".to_string());
    }
    if mtf.alignment <= 60.0 {
        risks.push("weak-alignment".to_string());
    }
    if mtf.higher.signal != Signal::Neutral && mtf.higher.signal != direction {
        risks.push("higher-timeframe-opposes".to_string());
    }
    if market.momentum.abs() > 30.0 {
        risks.push("crowd-extreme".to_string());
    }
    let dir_sign = if direction == Signal::Buy { 1.0 } else { -1.0 };
    if ctx
        .result(AgentKind::RiskManager)
        .map(|r| r.score * dir_sign < -0.25)
        .unwrap_or(false)
    {
        risks.push("risk-manager-caution".to_string());
    }

    risks
}
