//! Stage 6: the trade plan. Only produced for a worth-taking setup: entry
//! strategy, exits, position sizing with the quality-based leverage map, an
//! expected duration, and three scenarios.

use engine_core::{AccountSnapshot, Timeframe};

use crate::types::{
    EntryLevel, EntryStrategy, EntryStyle, EntryTiming, ExitPlan, PositionSizing, RiskReward,
    SetupType, Signal, TradePlan, TradeScenario, TradeSetup,
};

pub fn build(
    account: &AccountSnapshot,
    timeframe: Timeframe,
    setup: &TradeSetup,
    rr: &RiskReward,
) -> TradePlan {
    let entry = entry_strategy(setup, rr);

    let exit = ExitPlan {
        stop_loss: rr.stop,
        targets: rr.targets.clone(),
        trailing_stop: matches!(setup.setup_type, SetupType::Momentum | SetupType::Breakout),
    };

    let sizing = position_sizing(account, setup, rr);

    TradePlan {
        entry,
        exit,
        sizing,
        expected_duration: expected_duration(timeframe).to_string(),
        scenarios: scenarios(setup, rr),
    }
}

fn entry_strategy(setup: &TradeSetup, rr: &RiskReward) -> EntryStrategy {
    if setup.timing == EntryTiming::Optimal {
        return EntryStrategy {
            style: EntryStyle::Limit,
            levels: vec![EntryLevel {
                price: rr.entry,
                size_percent: 100.0,
            }],
        };
    }

    // Off-optimal timing scales in toward the stop in three slices
    let toward_stop = if setup.direction == Signal::Buy { -1.0 } else { 1.0 };
    let levels = [(0.0, 40.0), (0.005, 30.0), (0.01, 30.0)]
        .into_iter()
        .map(|(offset, size_percent)| EntryLevel {
            price: rr.entry * (1.0 + toward_stop * offset),
            size_percent,
        })
        .collect();

    EntryStrategy {
        style: EntryStyle::Scaled,
        levels,
    }
}

fn position_sizing(account: &AccountSnapshot, setup: &TradeSetup, rr: &RiskReward) -> PositionSizing {
    let stop_fraction = if rr.entry > 0.0 {
        (rr.entry - rr.stop).abs() / rr.entry
    } else {
        0.0
    };
    let usd_value = if stop_fraction > 0.0 {
        rr.risk_amount / stop_fraction
    } else {
        0.0
    };

    let percent_of_account = if account.current_balance > 0.0 {
        usd_value / account.current_balance * 100.0
    } else {
        0.0
    };

    // Quality-based leverage map, capped by the account's own limit
    let leverage: f64 = if setup.quality > 90.0 {
        3.0
    } else if setup.quality > 80.0 {
        2.0
    } else {
        1.0
    };
    let leverage = leverage.min(account.max_leverage).max(1.0);

    let risk_percent = if setup.quality > 85.0 { 2.0 } else { 1.5 };

    PositionSizing {
        usd_value,
        percent_of_account,
        leverage,
        risk_percent,
    }
}

fn expected_duration(timeframe: Timeframe) -> &'static str {
    match timeframe {
        Timeframe::Min15 => "2-12 hours",
        Timeframe::Hour1 => "1-3 days",
        Timeframe::Hour4 => "3-7 days",
        Timeframe::Day1 => "1-4 weeks",
    }
}

fn scenarios(setup: &TradeSetup, rr: &RiskReward) -> Vec<TradeScenario> {
    let bull = rr.win_probability;
    let bear = ((100.0 - bull) * 0.6).round();
    let base = (100.0 - bull - bear).max(0.0);

    let (with_label, against_label) = match setup.direction {
        Signal::Sell => ("breaks down through the targets", "squeezes back above the stop"),
        _ => ("runs through the targets", "breaks down through the stop"),
    };

    vec![
        TradeScenario {
            name: "bull".to_string(),
            probability: bull,
            outcome: format!("Price {}; all three exits fill", with_label),
        },
        TradeScenario {
            name: "base".to_string(),
            probability: base,
            outcome: "Price chops; first target fills, remainder exits at breakeven".to_string(),
        },
        TradeScenario {
            name: "bear".to_string(),
            probability: bear,
            outcome: format!("Price {}; full stop taken", against_label),
        },
    ]
}
