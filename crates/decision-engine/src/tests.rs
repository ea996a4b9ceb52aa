use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use engine_core::{
    AccountSnapshot, AgentKind, AgentResult, Candle, PipelineContext, Timeframe,
};
use execution_queue::{MemoryQueue, SignalQueue};
use trade_store::TradeStore;

use super::*;

fn account() -> AccountSnapshot {
    AccountSnapshot {
        id: "acct-1".to_string(),
        starting_balance: 10_000.0,
        current_balance: 10_000.0,
        max_leverage: 3.0,
        max_risk_per_trade: 2.0,
    }
}

fn flat_candles(n: usize, price: f64) -> Vec<Candle> {
    (0..n)
        .map(|i| Candle {
            open_time: Utc::now() + chrono::Duration::hours(i as i64),
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 100.0,
        })
        .collect()
}

/// Context with flat market data at 100.0 on every interval and every agent
/// seeded to the given (score, confidence)
fn seeded_context(score: f64, confidence: f64) -> PipelineContext {
    let mut market_data = HashMap::new();
    for tf in Timeframe::all() {
        market_data.insert(tf.label().to_string(), flat_candles(30, 100.0));
    }
    let mut ctx = PipelineContext::new("BTCUSDT", Timeframe::Hour1, account(), market_data);
    for kind in AgentKind::CHAIN {
        ctx.record_result(
            kind,
            AgentResult::clamped(score, confidence, serde_json::json!({})),
        );
    }
    ctx
}

async fn engine(live: bool) -> (DecisionEngine, Arc<TradeStore>, Arc<MemoryQueue>) {
    sqlx::any::install_default_drivers();
    let pool = sqlx::any::AnyPoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory SQLite");
    let store = Arc::new(TradeStore::new(pool));
    store.init_tables().await.unwrap();
    let queue = Arc::new(MemoryQueue::new());
    let engine = DecisionEngine::new(store.clone(), queue.clone(), live);
    (engine, store, queue)
}

// ---------------------------------------------------------------------
// Seed scenario 1: all agents bullish and aligned
// ---------------------------------------------------------------------

#[test]
fn aligned_bulls_enter_long() {
    let ctx = seeded_context(0.6, 80.0);
    let reasoning = DecisionEngine::reason(&ctx);

    assert_eq!(reasoning.mtf_analysis.alignment, 100.0);

    let setup = reasoning.trade_setup.as_ref().expect("setup should form");
    assert!(setup.quality > 85.0, "quality was {}", setup.quality);
    assert_eq!(setup.setup_type, SetupType::Continuation);

    let rr = reasoning.risk_reward.as_ref().expect("risk-reward computed");
    assert_eq!(rr.ratio, 2.0);
    assert!(rr.worth_taking);

    assert_eq!(reasoning.decision.action, DecisionAction::EnterLong);
    assert!(reasoning.trade_plan.is_some());
}

#[test]
fn aligned_bears_enter_short() {
    let ctx = seeded_context(-0.6, 80.0);
    let reasoning = DecisionEngine::reason(&ctx);
    assert_eq!(reasoning.decision.action, DecisionAction::EnterShort);
    let setup = reasoning.trade_setup.unwrap();
    assert_eq!(setup.direction, Signal::Sell);
    // Shorts invalidate above: the stop anchors to resistance
    let rr = reasoning.risk_reward.unwrap();
    assert!(rr.stop > rr.entry);
}

// ---------------------------------------------------------------------
// Seed scenario 2: split signals average to nothing
// ---------------------------------------------------------------------

#[test]
fn split_signals_wait() {
    let ctx = seeded_context(0.0, 50.0);
    let reasoning = DecisionEngine::reason(&ctx);
    assert_eq!(reasoning.decision.action, DecisionAction::Wait);
    assert!(reasoning.trade_setup.is_none());
    assert!(reasoning.trade_plan.is_none());
}

// ---------------------------------------------------------------------
// Seed scenario 3: risk-manager veto against a bullish chain
// ---------------------------------------------------------------------

#[test]
fn risk_manager_veto_holds() {
    let mut ctx = seeded_context(0.6, 80.0);
    ctx.record_result(
        AgentKind::RiskManager,
        AgentResult::clamped(-0.8, 85.0, serde_json::json!({})),
    );
    let reasoning = DecisionEngine::reason(&ctx);
    assert_eq!(reasoning.decision.action, DecisionAction::Wait);
    assert!(reasoning.trade_setup.is_none());
}

// ---------------------------------------------------------------------
// Universal properties
// ---------------------------------------------------------------------

#[test]
fn checklist_is_deterministic() {
    let ctx = seeded_context(0.6, 80.0);
    let a = DecisionEngine::reason(&ctx);
    let b = DecisionEngine::reason(&ctx);
    assert_eq!(
        serde_json::to_value(&a.decision).unwrap(),
        serde_json::to_value(&b.decision).unwrap()
    );
    assert_eq!(a.decision.action, b.decision.action);
}

#[test]
fn checklist_has_eight_weighted_items() {
    let ctx = seeded_context(0.6, 80.0);
    let reasoning = DecisionEngine::reason(&ctx);
    let weights: Vec<f64> = reasoning
        .decision
        .checklist
        .iter()
        .map(|i| i.weight)
        .collect();
    assert_eq!(weights, vec![90.0, 100.0, 95.0, 85.0, 70.0, 60.0, 75.0, 65.0]);
}

#[test]
fn reasoning_round_trips_through_json() {
    let ctx = seeded_context(0.6, 80.0);
    let reasoning = DecisionEngine::reason(&ctx);
    let blob = serde_json::to_string(&reasoning).unwrap();
    let restored: ProfessionalReasoning = serde_json::from_str(&blob).unwrap();

    assert_eq!(restored.mtf_analysis.alignment, reasoning.mtf_analysis.alignment);
    let (a, b) = (
        restored.trade_setup.as_ref().unwrap(),
        reasoning.trade_setup.as_ref().unwrap(),
    );
    assert_eq!(a.setup_type, b.setup_type);
    assert_eq!(a.quality, b.quality);
    let (ra, rb) = (
        restored.risk_reward.as_ref().unwrap(),
        reasoning.risk_reward.as_ref().unwrap(),
    );
    assert_eq!(ra.ratio, rb.ratio);
    assert_eq!(ra.win_probability, rb.win_probability);
}

#[test]
fn empty_market_data_still_produces_a_wait_decision() {
    let ctx = PipelineContext::new("BTCUSDT", Timeframe::Hour1, account(), HashMap::new());
    let reasoning = DecisionEngine::reason(&ctx);
    assert_eq!(reasoning.decision.action, DecisionAction::Wait);
    assert_eq!(reasoning.market_context.price, 0.0);
}

// ---------------------------------------------------------------------
// Persistence and queue handoff
// ---------------------------------------------------------------------

#[tokio::test]
async fn wait_writes_only_a_brain_decision() {
    let (engine, store, queue) = engine(true).await;
    let ctx = seeded_context(0.0, 50.0);

    let outcome = engine.decide_and_record(&ctx).await.unwrap();
    assert!(outcome.signal_id.is_none());

    assert!(store.list_trade_signals(10).await.unwrap().is_empty());
    let decisions = store.list_brain_decisions(10).await.unwrap();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].action, "wait");

    let popped = queue
        .dequeue_blocking(std::time::Duration::from_millis(20))
        .await
        .unwrap();
    assert!(popped.is_none());
}

#[tokio::test]
async fn entry_persists_and_enqueues_when_live() {
    let (engine, store, queue) = engine(true).await;
    let ctx = seeded_context(0.6, 80.0);

    let outcome = engine.decide_and_record(&ctx).await.unwrap();
    let id = outcome.signal_id.expect("signal created");

    let signal = store.get_trade_signal(&id).await.unwrap().unwrap();
    assert_eq!(signal.direction, "buy");
    assert_eq!(signal.status, "pending");
    assert_eq!(signal.created_by_agent, CREATED_BY_AGENT);
    assert_eq!(signal.leverage, 3.0);
    assert!(signal.entry_price.is_some());
    assert!(signal.stop_loss.is_some());

    // The persisted blob reproduces the reasoning exactly
    let restored: ProfessionalReasoning = serde_json::from_str(&signal.ai_reasoning).unwrap();
    assert_eq!(restored.mtf_analysis.alignment, 100.0);

    let popped = queue
        .dequeue_blocking(std::time::Duration::from_millis(20))
        .await
        .unwrap();
    assert_eq!(popped.as_deref(), Some(id.as_str()));
}

#[tokio::test]
async fn live_switch_off_persists_but_never_enqueues() {
    let (engine, store, queue) = engine(false).await;
    let ctx = seeded_context(0.6, 80.0);

    let outcome = engine.decide_and_record(&ctx).await.unwrap();
    let id = outcome.signal_id.expect("signal created");

    let signal = store.get_trade_signal(&id).await.unwrap().unwrap();
    assert_eq!(signal.status, "pending");

    let popped = queue
        .dequeue_blocking(std::time::Duration::from_millis(20))
        .await
        .unwrap();
    assert!(popped.is_none());
}
