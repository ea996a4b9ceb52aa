pub mod models;

use anyhow::Result;
use chrono::Utc;
use engine_core::{AccountSnapshot, AgentKind, AgentResult, Timeframe, TradeDirection};

pub use models::*;

/// All durable engine state. Rows are append-only except the two status
/// columns, whose transitions are guarded in SQL so they stay monotonic no
/// matter how many workers race on them.
pub struct TradeStore {
    pool: sqlx::AnyPool,
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

impl TradeStore {
    pub fn new(pool: sqlx::AnyPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &sqlx::AnyPool {
        &self.pool
    }

    /// Create every table the engine writes. Idempotent.
    pub async fn init_tables(&self) -> Result<()> {
        let ddl = [
            "CREATE TABLE IF NOT EXISTS trading_accounts (
                id TEXT PRIMARY KEY,
                starting_balance REAL NOT NULL,
                current_balance REAL NOT NULL,
                max_leverage REAL NOT NULL DEFAULT 1.0,
                max_risk_per_trade REAL NOT NULL DEFAULT 2.0
            )",
            "CREATE TABLE IF NOT EXISTS pipeline_runs (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                timeframe TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                finished_at TEXT
            )",
            "CREATE TABLE IF NOT EXISTS pipeline_steps (
                run_id TEXT NOT NULL,
                agent_name TEXT NOT NULL,
                started_at TEXT NOT NULL,
                finished_at TEXT NOT NULL,
                score REAL NOT NULL,
                confidence REAL NOT NULL,
                payload TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS agent_signals (
                account_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                timeframe TEXT NOT NULL,
                agent_name TEXT NOT NULL,
                score REAL NOT NULL,
                confidence REAL NOT NULL,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS trade_signals (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                timeframe TEXT NOT NULL,
                direction TEXT NOT NULL,
                confidence REAL NOT NULL,
                leverage REAL NOT NULL DEFAULT 1.0,
                entry_price REAL,
                stop_loss REAL,
                take_profit REAL,
                position_size_usd REAL,
                status TEXT NOT NULL,
                status_reason TEXT,
                venue_tx_id TEXT,
                created_by_agent TEXT NOT NULL,
                ai_reasoning TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS brain_decisions (
                account_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                action TEXT NOT NULL,
                reasoning TEXT NOT NULL,
                metadata TEXT NOT NULL,
                professional_reasoning TEXT NOT NULL,
                daily_pnl REAL NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS trade_history (
                account_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                direction TEXT NOT NULL,
                qty REAL NOT NULL,
                price REAL NOT NULL,
                leverage REAL NOT NULL DEFAULT 1.0,
                venue_tx_id TEXT NOT NULL,
                pnl REAL,
                executed_at TEXT NOT NULL
            )",
        ];

        for statement in ddl {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Accounts
    // -----------------------------------------------------------------

    pub async fn get_account(&self, id: &str) -> Result<Option<AccountSnapshot>> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, starting_balance, current_balance, max_leverage, max_risk_per_trade
             FROM trading_accounts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AccountRow::into_snapshot))
    }

    /// Seed/maintenance helper; the engine itself never changes accounts
    pub async fn upsert_account(&self, account: &AccountSnapshot) -> Result<()> {
        sqlx::query(
            "INSERT INTO trading_accounts
               (id, starting_balance, current_balance, max_leverage, max_risk_per_trade)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET
               current_balance = excluded.current_balance,
               max_leverage = excluded.max_leverage,
               max_risk_per_trade = excluded.max_risk_per_trade",
        )
        .bind(&account.id)
        .bind(account.starting_balance)
        .bind(account.current_balance)
        .bind(account.max_leverage)
        .bind(account.max_risk_per_trade)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Pipeline runs & steps
    // -----------------------------------------------------------------

    /// Insert a new run with status=running and return its id
    pub async fn insert_pipeline_run(
        &self,
        account_id: &str,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO pipeline_runs (id, account_id, symbol, timeframe, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(account_id)
        .bind(symbol)
        .bind(timeframe.label())
        .bind(RUN_STATUS_RUNNING)
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    /// running -> completed | failed; a terminal run is never touched again
    pub async fn finish_pipeline_run(&self, run_id: &str, status: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE pipeline_runs SET status = ?, finished_at = ?
             WHERE id = ? AND status = ?",
        )
        .bind(status)
        .bind(now_rfc3339())
        .bind(run_id)
        .bind(RUN_STATUS_RUNNING)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn insert_pipeline_step(
        &self,
        run_id: &str,
        agent: AgentKind,
        started_at: &str,
        finished_at: &str,
        result: &AgentResult,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO pipeline_steps
               (run_id, agent_name, started_at, finished_at, score, confidence, payload)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(run_id)
        .bind(agent.as_str())
        .bind(started_at)
        .bind(finished_at)
        .bind(result.score)
        .bind(result.confidence)
        .bind(result.payload.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_agent_signal(
        &self,
        account_id: &str,
        symbol: &str,
        timeframe: Timeframe,
        agent: AgentKind,
        result: &AgentResult,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO agent_signals
               (account_id, symbol, timeframe, agent_name, score, confidence, payload, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(account_id)
        .bind(symbol)
        .bind(timeframe.label())
        .bind(agent.as_str())
        .bind(result.score)
        .bind(result.confidence)
        .bind(result.payload.to_string())
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn recent_runs(&self, limit: i64) -> Result<Vec<PipelineRunRow>> {
        let rows: Vec<PipelineRunRow> = sqlx::query_as(
            "SELECT id, account_id, symbol, timeframe, status, created_at, finished_at
             FROM pipeline_runs ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn steps_for_run(&self, run_id: &str) -> Result<Vec<PipelineStepRow>> {
        let rows: Vec<PipelineStepRow> = sqlx::query_as(
            "SELECT run_id, agent_name, started_at, finished_at, score, confidence, payload
             FROM pipeline_steps WHERE run_id = ? ORDER BY started_at ASC",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // -----------------------------------------------------------------
    // Trade signals
    // -----------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_trade_signal(
        &self,
        account_id: &str,
        symbol: &str,
        timeframe: Timeframe,
        direction: TradeDirection,
        confidence: f64,
        leverage: f64,
        entry_price: Option<f64>,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
        position_size_usd: Option<f64>,
        created_by_agent: &str,
        ai_reasoning: &str,
    ) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO trade_signals
               (id, account_id, symbol, timeframe, direction, confidence, leverage,
                entry_price, stop_loss, take_profit, position_size_usd,
                status, created_by_agent, ai_reasoning, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(account_id)
        .bind(symbol)
        .bind(timeframe.label())
        .bind(direction.as_str())
        .bind(confidence)
        .bind(leverage)
        .bind(entry_price)
        .bind(stop_loss)
        .bind(take_profit)
        .bind(position_size_usd)
        .bind(SIGNAL_STATUS_PENDING)
        .bind(created_by_agent)
        .bind(ai_reasoning)
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn get_trade_signal(&self, id: &str) -> Result<Option<TradeSignalRow>> {
        let row: Option<TradeSignalRow> = sqlx::query_as(
            "SELECT id, account_id, symbol, timeframe, direction, confidence, leverage,
                    entry_price, stop_loss, take_profit, position_size_usd,
                    status, status_reason, venue_tx_id, created_by_agent, ai_reasoning, created_at
             FROM trade_signals WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// pending -> executed. Returns false when the signal was not pending —
    /// the losing side of a race sees false and must not re-execute.
    pub async fn mark_signal_executed(&self, id: &str, venue_tx_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE trade_signals SET status = ?, venue_tx_id = ?
             WHERE id = ? AND status = ?",
        )
        .bind(SIGNAL_STATUS_EXECUTED)
        .bind(venue_tx_id)
        .bind(id)
        .bind(SIGNAL_STATUS_PENDING)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// pending -> rejected, with the reason preserved
    pub async fn mark_signal_rejected(&self, id: &str, reason: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE trade_signals SET status = ?, status_reason = ?
             WHERE id = ? AND status = ?",
        )
        .bind(SIGNAL_STATUS_REJECTED)
        .bind(reason)
        .bind(id)
        .bind(SIGNAL_STATUS_PENDING)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_trade_signals(&self, limit: i64) -> Result<Vec<TradeSignalRow>> {
        let rows: Vec<TradeSignalRow> = sqlx::query_as(
            "SELECT id, account_id, symbol, timeframe, direction, confidence, leverage,
                    entry_price, stop_loss, take_profit, position_size_usd,
                    status, status_reason, venue_tx_id, created_by_agent, ai_reasoning, created_at
             FROM trade_signals ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // -----------------------------------------------------------------
    // Brain decisions & trade history
    // -----------------------------------------------------------------

    pub async fn insert_brain_decision(
        &self,
        account_id: &str,
        symbol: &str,
        action: &str,
        reasoning: &str,
        metadata: &serde_json::Value,
        professional_reasoning: &str,
        daily_pnl: f64,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO brain_decisions
               (account_id, symbol, action, reasoning, metadata,
                professional_reasoning, daily_pnl, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(account_id)
        .bind(symbol)
        .bind(action)
        .bind(reasoning)
        .bind(metadata.to_string())
        .bind(professional_reasoning)
        .bind(daily_pnl)
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_brain_decisions(&self, limit: i64) -> Result<Vec<BrainDecisionRow>> {
        let rows: Vec<BrainDecisionRow> = sqlx::query_as(
            "SELECT account_id, symbol, action, reasoning, metadata,
                    professional_reasoning, daily_pnl, created_at
             FROM brain_decisions ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_trade_execution(
        &self,
        account_id: &str,
        symbol: &str,
        direction: &str,
        qty: f64,
        price: f64,
        leverage: f64,
        venue_tx_id: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO trade_history
               (account_id, symbol, direction, qty, price, leverage, venue_tx_id, executed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(account_id)
        .bind(symbol)
        .bind(direction)
        .bind(qty)
        .bind(price)
        .bind(leverage)
        .bind(venue_tx_id)
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Realized P&L recorded today (UTC) for the account
    pub async fn daily_pnl(&self, account_id: &str) -> Result<f64> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let row: Option<(Option<f64>,)> = sqlx::query_as(
            "SELECT SUM(pnl) FROM trade_history
             WHERE account_id = ? AND executed_at >= ?",
        )
        .bind(account_id)
        .bind(&today)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.and_then(|(sum,)| sum).unwrap_or(0.0))
    }
}
