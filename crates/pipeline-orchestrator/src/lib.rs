pub mod scheduler;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use decision_engine::DecisionEngine;
use engine_core::{
    Agent, AgentKind, AgentResult, Candle, EngineError, PipelineContext, Timeframe,
};
use market_data::MarketDataClient;
use signal_agents::{RemoteAgent, DEFAULT_DEADLINE};
use trade_store::{TradeStore, RUN_STATUS_COMPLETED, RUN_STATUS_FAILED};

pub use scheduler::Scheduler;

const CANDLE_LIMIT: u32 = 200;

/// How agents are resolved for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentMode {
    /// Direct invocation of the in-process implementations
    InProcess,
    /// HTTP dispatch to the per-agent microservices
    Remote,
}

/// Static name -> base-URL table for remote mode
#[derive(Debug, Clone)]
pub struct RemoteAgentTable {
    urls: HashMap<AgentKind, String>,
}

impl RemoteAgentTable {
    pub fn new(urls: HashMap<AgentKind, String>) -> Self {
        Self { urls }
    }

    /// `base_url` plus one port per agent, in chain order starting at
    /// `first_port`; individual overrides come from entries like
    /// `market-structure=9201` in the ports spec.
    pub fn from_base(base_url: &str, first_port: u16, overrides: &str) -> Self {
        let mut urls = HashMap::new();
        for (i, kind) in AgentKind::CHAIN.into_iter().enumerate() {
            urls.insert(
                kind,
                format!("{}:{}", base_url.trim_end_matches('/'), first_port + i as u16),
            );
        }
        for entry in overrides.split(',').filter(|s| !s.is_empty()) {
            if let Some((name, port)) = entry.split_once('=') {
                if let (Some(kind), Ok(port)) =
                    (AgentKind::parse(name.trim()), port.trim().parse::<u16>())
                {
                    urls.insert(kind, format!("{}:{}", base_url.trim_end_matches('/'), port));
                }
            }
        }
        Self { urls }
    }

    pub fn url(&self, kind: AgentKind) -> Option<&str> {
        self.urls.get(&kind).map(String::as_str)
    }
}

/// Drives one decision cycle: context assembly, the fixed agent chain with
/// step recording, then the professional decision engine. Owns the
/// `PipelineContext` for the duration of a run; agents only ever borrow it.
pub struct PipelineOrchestrator {
    store: Arc<TradeStore>,
    market_data: Arc<MarketDataClient>,
    decision_engine: DecisionEngine,
    local_agents: Vec<Arc<dyn Agent>>,
    remote_agents: Vec<Arc<dyn Agent>>,
}

impl PipelineOrchestrator {
    pub fn new(
        store: Arc<TradeStore>,
        market_data: Arc<MarketDataClient>,
        decision_engine: DecisionEngine,
        local_agents: Vec<Arc<dyn Agent>>,
        remote_table: &RemoteAgentTable,
    ) -> Self {
        let remote_agents = AgentKind::CHAIN
            .into_iter()
            .filter_map(|kind| {
                remote_table
                    .url(kind)
                    .map(|url| Arc::new(RemoteAgent::new(kind, url, DEFAULT_DEADLINE)) as Arc<dyn Agent>)
            })
            .collect();

        Self {
            store,
            market_data,
            decision_engine,
            local_agents,
            remote_agents,
        }
    }

    /// One full cycle for (account, symbol, timeframe). Agent failures are
    /// isolated into zero-score steps; store failures mark the run failed.
    pub async fn run_once(
        &self,
        account_id: &str,
        symbol: &str,
        timeframe: Timeframe,
        mode: AgentMode,
    ) -> Result<String, EngineError> {
        // Account load failure aborts before any run row exists
        let account = self
            .store
            .get_account(account_id)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?
            .ok_or_else(|| EngineError::NotFound(format!("account {account_id}")))?;

        let market_data = self.fetch_market_data(symbol).await;
        let mut ctx = PipelineContext::new(symbol, timeframe, account, market_data);

        let run_id = self
            .store
            .insert_pipeline_run(account_id, symbol, timeframe)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?;

        tracing::info!(
            "Pipeline run {} started for {} {} ({:?} agents)",
            run_id,
            symbol,
            timeframe.label(),
            mode
        );

        let agents = match mode {
            AgentMode::InProcess => &self.local_agents,
            AgentMode::Remote => &self.remote_agents,
        };

        // Strict sequential chain: an agent starts only after its
        // predecessor's result is committed to the context
        for agent in agents {
            let kind = agent.kind();
            let started_at = Utc::now().to_rfc3339();

            let result = match agent.evaluate(&ctx).await {
                Ok(raw) => AgentResult::clamped(raw.score, raw.confidence, raw.payload),
                Err(e) => {
                    tracing::warn!("Agent {} failed in run {}: {}", kind, run_id, e);
                    AgentResult::failure(e.to_string())
                }
            };

            let finished_at = Utc::now().to_rfc3339();

            if let Err(e) = self
                .store
                .insert_pipeline_step(&run_id, kind, &started_at, &finished_at, &result)
                .await
            {
                return self.fail_run(&run_id, e).await;
            }
            if let Err(e) = self
                .store
                .insert_agent_signal(account_id, symbol, timeframe, kind, &result)
                .await
            {
                return self.fail_run(&run_id, e).await;
            }

            ctx.record_result(kind, result);
        }

        if let Err(e) = self.decision_engine.decide_and_record(&ctx).await {
            return self.fail_run(&run_id, e).await;
        }

        self.store
            .finish_pipeline_run(&run_id, RUN_STATUS_COMPLETED)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?;

        tracing::info!("Pipeline run {} completed", run_id);
        Ok(run_id)
    }

    async fn fail_run(
        &self,
        run_id: &str,
        error: anyhow::Error,
    ) -> Result<String, EngineError> {
        tracing::error!("Pipeline run {} failed: {}", run_id, error);
        if let Err(e) = self
            .store
            .finish_pipeline_run(run_id, RUN_STATUS_FAILED)
            .await
        {
            tracing::error!("Could not mark run {} failed: {}", run_id, e);
        }
        Err(EngineError::Database(error.to_string()))
    }

    /// Concurrent candle fetches for every interval; each failure degrades
    /// to an empty sequence
    async fn fetch_market_data(&self, symbol: &str) -> HashMap<String, Vec<Candle>> {
        let [m15, h1, h4, d1] = Timeframe::all();
        let (r15, r1h, r4h, r1d) = tokio::join!(
            self.market_data.get_candles(symbol, m15, CANDLE_LIMIT),
            self.market_data.get_candles(symbol, h1, CANDLE_LIMIT),
            self.market_data.get_candles(symbol, h4, CANDLE_LIMIT),
            self.market_data.get_candles(symbol, d1, CANDLE_LIMIT),
        );

        let mut market_data = HashMap::new();
        for (tf, fetched) in [(m15, r15), (h1, r1h), (h4, r4h), (d1, r1d)] {
            let candles = match fetched {
                Ok(candles) => candles,
                Err(e) => {
                    tracing::warn!(
                        "Candle fetch degraded to empty for {} {}: {}",
                        symbol,
                        tf.label(),
                        e
                    );
                    Vec::new()
                }
            };
            market_data.insert(tf.label().to_string(), candles);
        }
        market_data
    }
}

#[cfg(test)]
mod tests;
