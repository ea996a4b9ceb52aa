use std::sync::Arc;

use async_trait::async_trait;
use decision_engine::DecisionEngine;
use engine_core::{
    AccountSnapshot, Agent, AgentKind, AgentResult, EngineError, PipelineContext, Timeframe,
};
use execution_queue::MemoryQueue;
use market_data::MarketDataClient;
use trade_store::TradeStore;

use super::*;

/// Agent double with a fixed result or a scripted failure
struct ScriptedAgent {
    kind: AgentKind,
    score: f64,
    confidence: f64,
    fail: bool,
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn kind(&self) -> AgentKind {
        self.kind
    }

    async fn evaluate(&self, _ctx: &PipelineContext) -> Result<AgentResult, EngineError> {
        if self.fail {
            return Err(EngineError::Agent("scripted failure".to_string()));
        }
        Ok(AgentResult::clamped(
            self.score,
            self.confidence,
            serde_json::json!({ "scripted": true }),
        ))
    }
}

fn scripted_chain(score: f64, failing_index: Option<usize>) -> Vec<Arc<dyn Agent>> {
    AgentKind::CHAIN
        .into_iter()
        .enumerate()
        .map(|(i, kind)| {
            Arc::new(ScriptedAgent {
                kind,
                score,
                confidence: 80.0,
                fail: failing_index == Some(i),
            }) as Arc<dyn Agent>
        })
        .collect()
}

async fn setup(agents: Vec<Arc<dyn Agent>>) -> (PipelineOrchestrator, Arc<TradeStore>) {
    sqlx::any::install_default_drivers();
    let pool = sqlx::any::AnyPoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory SQLite");
    let store = Arc::new(TradeStore::new(pool));
    store.init_tables().await.unwrap();
    store
        .upsert_account(&AccountSnapshot {
            id: "acct-1".to_string(),
            starting_balance: 10_000.0,
            current_balance: 10_000.0,
            max_leverage: 3.0,
            max_risk_per_trade: 2.0,
        })
        .await
        .unwrap();

    let queue = Arc::new(MemoryQueue::new());
    let engine = DecisionEngine::new(store.clone(), queue, false);
    // Unreachable gateway: every fetch degrades to an empty sequence
    let market_data = Arc::new(MarketDataClient::new("http://127.0.0.1:9"));
    let table = RemoteAgentTable::from_base("http://127.0.0.1", 9101, "");

    let orchestrator =
        PipelineOrchestrator::new(store.clone(), market_data, engine, agents, &table);
    (orchestrator, store)
}

#[tokio::test]
async fn run_records_all_nine_steps_in_chain_order() {
    let (orchestrator, store) = setup(scripted_chain(0.6, None)).await;

    let run_id = orchestrator
        .run_once("acct-1", "BTCUSDT", Timeframe::Hour1, AgentMode::InProcess)
        .await
        .unwrap();

    let runs = store.recent_runs(10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, "completed");

    let steps = store.steps_for_run(&run_id).await.unwrap();
    assert_eq!(steps.len(), 9);
    let names: Vec<&str> = steps.iter().map(|s| s.agent_name.as_str()).collect();
    let expected: Vec<&str> = AgentKind::CHAIN.iter().map(|k| k.as_str()).collect();
    assert_eq!(names, expected);

    // startedAt is non-decreasing down the chain
    for pair in steps.windows(2) {
        assert!(pair[0].started_at <= pair[1].started_at);
    }

    // Every decision, including wait, leaves a brain-decision row
    let decisions = store.list_brain_decisions(10).await.unwrap();
    assert_eq!(decisions.len(), 1);
}

#[tokio::test]
async fn one_failing_agent_does_not_abort_the_run() {
    // Fifth agent in the chain raises
    let (orchestrator, store) = setup(scripted_chain(0.6, Some(4))).await;

    let run_id = orchestrator
        .run_once("acct-1", "BTCUSDT", Timeframe::Hour1, AgentMode::InProcess)
        .await
        .unwrap();

    let runs = store.recent_runs(10).await.unwrap();
    assert_eq!(runs[0].status, "completed");

    let steps = store.steps_for_run(&run_id).await.unwrap();
    assert_eq!(steps.len(), 9, "a failing agent must not shorten the chain");

    let failed = &steps[4];
    assert_eq!(failed.agent_name, "news-sentiment");
    assert_eq!(failed.score, 0.0);
    assert_eq!(failed.confidence, 0.0);
    let payload: serde_json::Value = serde_json::from_str(&failed.payload).unwrap();
    assert!(payload["error"]
        .as_str()
        .unwrap()
        .contains("scripted failure"));

    // Agents after the failure still ran
    assert_eq!(steps[8].agent_name, "risk-manager");
    assert_ne!(steps[8].score, 0.0);
}

#[tokio::test]
async fn missing_account_aborts_before_any_run_row() {
    let (orchestrator, store) = setup(scripted_chain(0.6, None)).await;

    let err = orchestrator
        .run_once("no-such-account", "BTCUSDT", Timeframe::Hour1, AgentMode::InProcess)
        .await
        .unwrap_err();
    match err {
        EngineError::NotFound(msg) => assert!(msg.contains("no-such-account")),
        other => panic!("expected NotFound, got {other:?}"),
    }

    assert!(store.recent_runs(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn agent_signals_are_logged_alongside_steps() {
    let (orchestrator, store) = setup(scripted_chain(0.2, None)).await;

    orchestrator
        .run_once("acct-1", "BTCUSDT", Timeframe::Hour1, AgentMode::InProcess)
        .await
        .unwrap();

    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM agent_signals")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(row.0, 9);
}

#[tokio::test]
async fn empty_market_data_yields_a_wait_decision_not_a_signal() {
    let (orchestrator, store) = setup(scripted_chain(0.6, None)).await;

    orchestrator
        .run_once("acct-1", "BTCUSDT", Timeframe::Hour1, AgentMode::InProcess)
        .await
        .unwrap();

    // Bullish chain, but no market data: nothing tradeable can price
    assert!(store.list_trade_signals(10).await.unwrap().is_empty());
    let decisions = store.list_brain_decisions(10).await.unwrap();
    assert_eq!(decisions[0].action, "wait");
}

#[test]
fn remote_table_assigns_sequential_ports_with_overrides() {
    let table = RemoteAgentTable::from_base("http://agents.local", 9101, "risk-manager=9200");
    assert_eq!(
        table.url(AgentKind::MarketStructure),
        Some("http://agents.local:9101")
    );
    assert_eq!(table.url(AgentKind::OrderFlow), Some("http://agents.local:9102"));
    assert_eq!(table.url(AgentKind::RiskManager), Some("http://agents.local:9200"));
}
