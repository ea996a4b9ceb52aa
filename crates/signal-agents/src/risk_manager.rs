use async_trait::async_trait;
use engine_core::{Agent, AgentKind, AgentResult, EngineError, PipelineContext};

use crate::math::{mean, std_dev};

/// Last agent in the chain. Reads every predecessor's committed result plus
/// the account snapshot and produces a risk-adjusted stance: it echoes the
/// chain consensus when conditions are benign and pushes hard against it
/// when volatility, disagreement, or drawdown say the trade should not be
/// taken.
pub struct RiskManagerAgent;

const DISPERSION_VETO: f64 = 0.60;
const DRAWDOWN_STAND_DOWN: f64 = 0.20;

#[async_trait]
impl Agent for RiskManagerAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::RiskManager
    }

    async fn evaluate(&self, ctx: &PipelineContext) -> Result<AgentResult, EngineError> {
        let predecessor_scores: Vec<f64> = AgentKind::CHAIN
            .iter()
            .take_while(|k| **k != AgentKind::RiskManager)
            .filter_map(|k| ctx.result(*k))
            .map(|r| r.score)
            .collect();

        let consensus = mean(&predecessor_scores);
        let dispersion = std_dev(&predecessor_scores);

        let high_volatility = ctx
            .result(AgentKind::VolatilityRegime)
            .and_then(|r| r.payload.get("regime"))
            .and_then(|v| v.as_str())
            .map(|regime| regime == "high")
            .unwrap_or(false);

        let drawdown = if ctx.account.starting_balance > 0.0 {
            1.0 - ctx.account.current_balance / ctx.account.starting_balance
        } else {
            0.0
        };

        let mut flags: Vec<&str> = Vec::new();
        let mut score = consensus;

        if high_volatility {
            score *= 0.4;
            flags.push("high-volatility");
        }
        if dispersion > DISPERSION_VETO {
            score = -0.3;
            flags.push("agent-disagreement");
        }
        if drawdown > DRAWDOWN_STAND_DOWN {
            score = -0.8;
            flags.push("drawdown-stand-down");
        }

        let confidence = if flags.is_empty() { 70.0 } else { 85.0 };

        Ok(AgentResult::clamped(
            score,
            confidence,
            serde_json::json!({
                "consensus": consensus,
                "dispersion": dispersion,
                "drawdown": drawdown,
                "flags": flags,
                "predecessors": predecessor_scores.len(),
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{AccountSnapshot, Timeframe};
    use std::collections::HashMap;

    fn ctx_with_balance(current: f64) -> PipelineContext {
        PipelineContext::new(
            "BTCUSDT",
            Timeframe::Hour1,
            AccountSnapshot {
                id: "acct".into(),
                starting_balance: 10_000.0,
                current_balance: current,
                max_leverage: 3.0,
                max_risk_per_trade: 2.0,
            },
            HashMap::new(),
        )
    }

    fn seed_predecessors(ctx: &mut PipelineContext, score: f64) {
        for kind in AgentKind::CHAIN.iter().take(8) {
            ctx.record_result(
                *kind,
                AgentResult::clamped(score, 70.0, serde_json::json!({})),
            );
        }
    }

    #[tokio::test]
    async fn benign_conditions_echo_consensus() {
        let mut ctx = ctx_with_balance(10_000.0);
        seed_predecessors(&mut ctx, 0.6);
        let result = RiskManagerAgent.evaluate(&ctx).await.unwrap();
        assert!((result.score - 0.6).abs() < 1e-9);
        assert_eq!(result.payload["flags"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn deep_drawdown_stands_down() {
        let mut ctx = ctx_with_balance(7_000.0);
        seed_predecessors(&mut ctx, 0.6);
        let result = RiskManagerAgent.evaluate(&ctx).await.unwrap();
        assert_eq!(result.score, -0.8);
    }

    #[tokio::test]
    async fn high_volatility_dampens_the_stance() {
        let mut ctx = ctx_with_balance(10_000.0);
        seed_predecessors(&mut ctx, 0.6);
        ctx.record_result(
            AgentKind::VolatilityRegime,
            AgentResult::clamped(0.0, 65.0, serde_json::json!({ "regime": "high" })),
        );
        let result = RiskManagerAgent.evaluate(&ctx).await.unwrap();
        assert!(result.score < 0.3);
    }
}
