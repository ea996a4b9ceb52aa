//! Stage 8: execution instructions for whoever places the order.

use crate::types::{
    Decision, DecisionAction, EntryTiming, ExecutionInstructions, ExecutionMethod,
    ExecutionPriority, MarketContext, TradeSetup, Volatility,
};

pub fn instructions(
    decision: &Decision,
    setup: Option<&TradeSetup>,
    market: &MarketContext,
) -> ExecutionInstructions {
    if decision.action == DecisionAction::Wait {
        return ExecutionInstructions {
            priority: ExecutionPriority::Patient,
            method: ExecutionMethod::Limit,
            urgency: 0.0,
        };
    }

    let timing = setup.map(|s| s.timing).unwrap_or(EntryTiming::Early);
    let urgency = match timing {
        EntryTiming::Optimal => 80.0,
        EntryTiming::Early => 40.0,
        EntryTiming::Late => 60.0,
    };

    let priority = if urgency >= 70.0 {
        ExecutionPriority::Immediate
    } else if urgency >= 50.0 {
        ExecutionPriority::Conditional
    } else {
        ExecutionPriority::Patient
    };

    // Twap beats iceberg beats plain limit
    let method = if market.volatility == Volatility::High {
        ExecutionMethod::Twap
    } else if timing != EntryTiming::Optimal {
        // Off-optimal entries are scaled, so they iceberg in
        ExecutionMethod::Iceberg
    } else {
        ExecutionMethod::Limit
    };

    ExecutionInstructions {
        priority,
        method,
        urgency,
    }
}
