//! Stage 4: risk-reward arithmetic. Entry at the current price, stop at the
//! invalidation level, three fixed-offset targets with decreasing
//! probability. A trade is worth taking only at 2:1 or better with positive
//! expected value.

use engine_core::AccountSnapshot;

use crate::types::{
    MarketContext, ProfitTarget, RiskReward, Signal, TradeSetup, Trend,
};

/// Fixed target offsets in trade direction, with exit sizes and probabilities
const TARGET_OFFSETS: [f64; 3] = [0.02, 0.04, 0.06];
const EXIT_SIZES: [f64; 3] = [33.0, 33.0, 34.0];
const TARGET_PROBABILITIES: [f64; 3] = [75.0, 50.0, 25.0];

const MIN_RATIO: f64 = 2.0;

pub fn compute(
    account: &AccountSnapshot,
    market: &MarketContext,
    setup: &TradeSetup,
) -> RiskReward {
    let entry = market.price;
    let stop = setup.invalidation_price;
    let direction = if setup.direction == Signal::Buy { 1.0 } else { -1.0 };

    let targets: Vec<ProfitTarget> = TARGET_OFFSETS
        .iter()
        .zip(EXIT_SIZES)
        .zip(TARGET_PROBABILITIES)
        .map(|((offset, exit_percent), probability)| ProfitTarget {
            price: entry * (1.0 + direction * offset),
            exit_percent,
            probability,
        })
        .collect();

    let risk_percent = if setup.quality > 85.0 { 2.0 } else { 1.5 };
    let risk_amount = account.current_balance * risk_percent / 100.0;

    let stop_distance = (stop - entry).abs();
    let avg_target = targets.iter().map(|t| t.price).sum::<f64>() / targets.len() as f64;

    let reward_amount = if stop_distance > 0.0 {
        (avg_target - entry).abs() * (risk_amount / stop_distance)
    } else {
        0.0
    };

    // Rounded to two decimals: this is a displayed ratio, and the 2:1 gate
    // must not flip on float dust from percentage arithmetic
    let ratio = if risk_amount > 0.0 {
        (reward_amount / risk_amount * 100.0).round() / 100.0
    } else {
        0.0
    };

    let mut win_probability = 50.0 + (setup.quality - 50.0) / 2.0;
    if market.trend != Trend::Sideways {
        win_probability += 10.0;
    }
    win_probability -= 5.0 * setup.risks.len() as f64;
    let win_probability = win_probability.clamp(30.0, 85.0);

    let p = win_probability / 100.0;
    let expected_value = p * reward_amount - (1.0 - p) * risk_amount;

    let worth_taking = ratio >= MIN_RATIO && expected_value > 0.0;

    RiskReward {
        entry,
        stop,
        targets,
        risk_amount,
        reward_amount,
        ratio,
        win_probability,
        expected_value,
        worth_taking,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntryTiming, SetupType, Volatility};

    fn account() -> AccountSnapshot {
        AccountSnapshot {
            id: "acct".into(),
            starting_balance: 10_000.0,
            current_balance: 10_000.0,
            max_leverage: 3.0,
            max_risk_per_trade: 2.0,
        }
    }

    fn market(price: f64, support: f64) -> MarketContext {
        MarketContext {
            price,
            volume: 100.0,
            trend: Trend::Bullish,
            volatility: Volatility::Low,
            momentum: 10.0,
            support,
            resistance: price * 1.02,
        }
    }

    fn long_setup(quality: f64, invalidation: f64, risks: usize) -> TradeSetup {
        TradeSetup {
            setup_type: SetupType::Continuation,
            direction: Signal::Buy,
            confluence: vec!["a".into(), "b".into(), "c".into()],
            quality,
            timing: EntryTiming::Optimal,
            invalidation_price: invalidation,
            risks: (0..risks).map(|i| format!("risk-{i}")).collect(),
        }
    }

    #[test]
    fn two_percent_stop_with_fixed_targets_is_two_to_one() {
        let rr = compute(&account(), &market(100.0, 98.0), &long_setup(90.0, 98.0, 0));
        assert_eq!(rr.entry, 100.0);
        assert_eq!(rr.stop, 98.0);
        assert_eq!(rr.ratio, 2.0);
        assert!(rr.worth_taking);
        // quality > 85 -> 2% risk of a 10k account
        assert_eq!(rr.risk_amount, 200.0);
        assert_eq!(rr.targets.len(), 3);
        assert_eq!(rr.targets[2].exit_percent, 34.0);
        assert_eq!(rr.targets[0].probability, 75.0);
    }

    #[test]
    fn wide_stop_fails_the_ratio_gate() {
        // 4% stop against 4% average target: 1:1
        let rr = compute(&account(), &market(100.0, 96.0), &long_setup(90.0, 96.0, 0));
        assert!(rr.ratio < 2.0);
        assert!(!rr.worth_taking);
    }

    #[test]
    fn win_probability_is_penalized_per_risk_and_clamped() {
        let none = compute(&account(), &market(100.0, 98.0), &long_setup(90.0, 98.0, 0));
        let many = compute(&account(), &market(100.0, 98.0), &long_setup(90.0, 98.0, 8));
        assert!(none.win_probability > many.win_probability);
        assert!(many.win_probability >= 30.0);
        assert!(none.win_probability <= 85.0);
    }

    #[test]
    fn moderate_quality_risks_less() {
        let rr = compute(&account(), &market(100.0, 98.0), &long_setup(80.0, 98.0, 0));
        assert_eq!(rr.risk_amount, 150.0);
    }

    #[test]
    fn short_targets_step_down_from_entry() {
        let mut setup = long_setup(90.0, 102.0, 0);
        setup.direction = Signal::Sell;
        let rr = compute(&account(), &market(100.0, 98.0), &setup);
        assert!(rr.targets[0].price < 100.0);
        assert!(rr.targets[2].price < rr.targets[0].price);
    }

    #[test]
    fn degenerate_stop_is_never_worth_taking() {
        let rr = compute(&account(), &market(100.0, 100.0), &long_setup(90.0, 100.0, 0));
        assert!(!rr.worth_taking);
        assert_eq!(rr.reward_amount, 0.0);
    }
}
