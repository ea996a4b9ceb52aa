use serde::{Deserialize, Serialize};

/// Row in `trading_accounts`. Created externally; read-only to the engine.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AccountRow {
    pub id: String,
    pub starting_balance: f64,
    pub current_balance: f64,
    pub max_leverage: f64,
    pub max_risk_per_trade: f64,
}

impl AccountRow {
    pub fn into_snapshot(self) -> engine_core::AccountSnapshot {
        engine_core::AccountSnapshot {
            id: self.id,
            starting_balance: self.starting_balance,
            current_balance: self.current_balance,
            max_leverage: self.max_leverage,
            max_risk_per_trade: self.max_risk_per_trade,
        }
    }
}

/// Row in `pipeline_runs`. Status machine: running -> completed | failed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PipelineRunRow {
    pub id: String,
    pub account_id: String,
    pub symbol: String,
    pub timeframe: String,
    pub status: String,
    pub created_at: String,
    pub finished_at: Option<String>,
}

/// Row in `pipeline_steps`. One per (run, agent), inserted after the agent
/// returns whether it succeeded or failed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PipelineStepRow {
    pub run_id: String,
    pub agent_name: String,
    pub started_at: String,
    pub finished_at: String,
    pub score: f64,
    pub confidence: f64,
    pub payload: String,
}

/// Row in `trade_signals`. Status machine: pending -> executed | rejected,
/// then immutable.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TradeSignalRow {
    pub id: String,
    pub account_id: String,
    pub symbol: String,
    pub timeframe: String,
    pub direction: String,
    pub confidence: f64,
    pub leverage: f64,
    pub entry_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub position_size_usd: Option<f64>,
    pub status: String,
    pub status_reason: Option<String>,
    pub venue_tx_id: Option<String>,
    pub created_by_agent: String,
    pub ai_reasoning: String,
    pub created_at: String,
}

/// Row in `brain_decisions`: append-only log of every final decision,
/// including "wait".
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BrainDecisionRow {
    pub account_id: String,
    pub symbol: String,
    pub action: String,
    pub reasoning: String,
    pub metadata: String,
    pub professional_reasoning: String,
    pub daily_pnl: f64,
    pub created_at: String,
}

/// Row in `trade_history`: one per order placed on a venue.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TradeHistoryRow {
    pub account_id: String,
    pub symbol: String,
    pub direction: String,
    pub qty: f64,
    pub price: f64,
    pub leverage: f64,
    pub venue_tx_id: String,
    pub pnl: Option<f64>,
    pub executed_at: String,
}

pub const RUN_STATUS_RUNNING: &str = "running";
pub const RUN_STATUS_COMPLETED: &str = "completed";
pub const RUN_STATUS_FAILED: &str = "failed";

pub const SIGNAL_STATUS_PENDING: &str = "pending";
pub const SIGNAL_STATUS_EXECUTED: &str = "executed";
pub const SIGNAL_STATUS_REJECTED: &str = "rejected";
