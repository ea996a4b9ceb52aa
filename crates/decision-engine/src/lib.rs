pub mod checklist;
pub mod execution;
pub mod market;
pub mod mtf;
pub mod plan;
pub mod psychology;
pub mod risk_reward;
pub mod setup;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use engine_core::{PipelineContext, TradeDirection};
use execution_queue::SignalQueue;
use trade_store::TradeStore;

pub use types::*;

pub const CREATED_BY_AGENT: &str = "professional-decision";

/// What one decision cycle produced: the reasoning artifact plus the id of
/// the trade signal, when one was created.
pub struct DecisionOutcome {
    pub reasoning: ProfessionalReasoning,
    pub signal_id: Option<String>,
}

/// The professional decision engine. `reason` is a pure function of the
/// context; `decide_and_record` adds persistence and the handoff to the
/// execution queue.
pub struct DecisionEngine {
    store: Arc<TradeStore>,
    queue: Arc<dyn SignalQueue>,
    live_execution: bool,
}

impl DecisionEngine {
    pub fn new(store: Arc<TradeStore>, queue: Arc<dyn SignalQueue>, live_execution: bool) -> Self {
        Self {
            store,
            queue,
            live_execution,
        }
    }

    /// Run the eight reasoning stages. Deterministic: identical context in,
    /// identical artifact out.
    pub fn reason(ctx: &PipelineContext) -> ProfessionalReasoning {
        let mtf_analysis = mtf::analyze(ctx);
        let market_context = market::derive(ctx, &mtf_analysis);
        let trade_setup = setup::identify(ctx, &mtf_analysis, &market_context);
        let risk_reward = trade_setup
            .as_ref()
            .map(|s| risk_reward::compute(&ctx.account, &market_context, s));
        let psychology = psychology::assess(ctx, &market_context);

        let mut decision = checklist::evaluate(
            &mtf_analysis,
            trade_setup.as_ref(),
            risk_reward.as_ref(),
            &psychology,
        );

        let trade_plan = match (&trade_setup, &risk_reward) {
            (Some(s), Some(r)) if r.worth_taking => {
                Some(plan::build(&ctx.account, ctx.timeframe, s, r))
            }
            _ => None,
        };

        // An entry without a plan cannot be executed; the checklist can
        // technically clear while the risk-reward gate does not (EV positive
        // at a sub-2:1 ratio). The checklist itself is left untouched.
        if decision.action != DecisionAction::Wait && trade_plan.is_none() {
            decision.action = DecisionAction::Wait;
        }

        let execution = execution::instructions(&decision, trade_setup.as_ref(), &market_context);

        ProfessionalReasoning {
            mtf_analysis,
            market_context,
            trade_setup,
            risk_reward,
            psychology,
            trade_plan,
            decision,
            execution,
        }
    }

    /// Reason over the context, persist the outcome, and enqueue the signal
    /// for execution when one was created and live execution is on. Every
    /// decision — including "wait" — appends a brain-decision row.
    pub async fn decide_and_record(&self, ctx: &PipelineContext) -> Result<DecisionOutcome> {
        let reasoning = Self::reason(ctx);
        let action = reasoning.decision.action;

        let daily_pnl = self.store.daily_pnl(&ctx.account_id).await.unwrap_or(0.0);
        let blob = serde_json::to_string(&reasoning)?;

        let direction = match action {
            DecisionAction::EnterLong => TradeDirection::Buy,
            DecisionAction::EnterShort => TradeDirection::Sell,
            DecisionAction::Wait => TradeDirection::Hold,
        };

        let mut signal_id = None;
        if direction != TradeDirection::Hold {
            if let (Some(rr), Some(plan)) = (&reasoning.risk_reward, &reasoning.trade_plan) {
                let id = self
                    .store
                    .insert_trade_signal(
                        &ctx.account_id,
                        &ctx.symbol,
                        ctx.timeframe,
                        direction,
                        reasoning.decision.confidence,
                        plan.sizing.leverage,
                        Some(rr.entry),
                        Some(rr.stop),
                        plan.exit.targets.first().map(|t| t.price),
                        Some(plan.sizing.usd_value),
                        CREATED_BY_AGENT,
                        &blob,
                    )
                    .await?;

                tracing::info!(
                    "Trade signal {} created: {} {} @ {:.2} (confidence {:.0})",
                    id,
                    direction.as_str(),
                    ctx.symbol,
                    rr.entry,
                    reasoning.decision.confidence
                );

                if self.live_execution {
                    if let Err(e) = self.queue.enqueue(&id).await {
                        // The signal stays pending; a later sweep can re-enqueue
                        tracing::warn!("Failed to enqueue signal {}: {}", id, e);
                    }
                } else {
                    tracing::info!("Live execution disabled; signal {} stays pending", id);
                }

                signal_id = Some(id);
            }
        }

        self.store
            .insert_brain_decision(
                &ctx.account_id,
                &ctx.symbol,
                action.as_str(),
                &summary(&reasoning),
                &metadata(&reasoning),
                &blob,
                daily_pnl,
            )
            .await?;

        Ok(DecisionOutcome {
            reasoning,
            signal_id,
        })
    }
}

/// One human-readable line explaining the decision
fn summary(reasoning: &ProfessionalReasoning) -> String {
    match (&reasoning.trade_setup, &reasoning.risk_reward) {
        (Some(setup), Some(rr)) => format!(
            "{}: {:?} setup, quality {:.0}, R:R {:.2}, win {:.0}%, checklist {:.0}%",
            reasoning.decision.action.as_str(),
            setup.setup_type,
            setup.quality,
            rr.ratio,
            rr.win_probability,
            reasoning.decision.confidence
        ),
        _ => format!(
            "wait: no qualifying setup (alignment {:.0}, momentum {:.1})",
            reasoning.mtf_analysis.alignment, reasoning.market_context.momentum
        ),
    }
}

fn metadata(reasoning: &ProfessionalReasoning) -> serde_json::Value {
    serde_json::json!({
        "alignment": reasoning.mtf_analysis.alignment,
        "setupQuality": reasoning.trade_setup.as_ref().map(|s| s.quality),
        "riskReward": reasoning.risk_reward.as_ref().map(|r| r.ratio),
        "checklistConfidence": reasoning.decision.confidence,
    })
}

#[cfg(test)]
mod tests;
