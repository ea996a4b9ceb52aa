//! Stage 7: the decision checklist — the final gate. Eight weighted items;
//! entry requires at least two of the heavyweight items plus 75% weighted
//! confidence, with direction taken from the current interval's signal.

use crate::types::{
    ChecklistItem, Decision, DecisionAction, EntryTiming, MultiTimeframeAnalysis, Psychology,
    RiskReward, Signal, TradeSetup,
};

const HEAVY_WEIGHT: f64 = 90.0;
const MIN_HEAVY_PASSED: usize = 2;
const MIN_CONFIDENCE: f64 = 75.0;

pub fn evaluate(
    mtf: &MultiTimeframeAnalysis,
    setup: Option<&TradeSetup>,
    rr: Option<&RiskReward>,
    psychology: &Psychology,
) -> Decision {
    let items = vec![
        item("multi-timeframe-alignment", 90.0, mtf.alignment > 60.0),
        item(
            "high-quality-setup",
            100.0,
            setup.map(|s| s.quality > 70.0).unwrap_or(false),
        ),
        item(
            "risk-reward-two-to-one",
            95.0,
            rr.map(|r| r.ratio >= 2.0).unwrap_or(false),
        ),
        item(
            "positive-expected-value",
            85.0,
            rr.map(|r| r.expected_value > 0.0).unwrap_or(false),
        ),
        item(
            "timing-not-late",
            70.0,
            setup.map(|s| s.timing != EntryTiming::Late).unwrap_or(false),
        ),
        item(
            "psychology-favorable",
            60.0,
            !psychology.sentiment.is_extreme(),
        ),
        item(
            "few-risks",
            75.0,
            setup.map(|s| s.risks.len() < 3).unwrap_or(false),
        ),
        item(
            "smart-money-aligned",
            65.0,
            psychology.smart_money.confidence > 60.0,
        ),
    ];

    let total_weight: f64 = items.iter().map(|i| i.weight).sum();
    let passed_weight: f64 = items.iter().filter(|i| i.passed).map(|i| i.weight).sum();
    let confidence = (passed_weight / total_weight * 100.0).round();

    let heavy_passed = items
        .iter()
        .filter(|i| i.passed && i.weight >= HEAVY_WEIGHT)
        .count();

    let action = if heavy_passed >= MIN_HEAVY_PASSED && confidence >= MIN_CONFIDENCE {
        match mtf.current.signal {
            Signal::Buy => DecisionAction::EnterLong,
            Signal::Sell => DecisionAction::EnterShort,
            Signal::Neutral => DecisionAction::Wait,
        }
    } else {
        DecisionAction::Wait
    };

    Decision {
        action,
        checklist: items,
        confidence,
    }
}

fn item(name: &str, weight: f64, passed: bool) -> ChecklistItem {
    ChecklistItem {
        name: name.to_string(),
        weight,
        passed,
    }
}
