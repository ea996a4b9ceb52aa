use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{AccountSnapshot, AgentKind, AgentResult, Candle, Timeframe};

/// Working state of one pipeline run. Owned by the orchestrator; agents only
/// ever receive a borrow. `agent_results` is populated strictly in chain
/// order by the orchestrator's step recorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineContext {
    pub account_id: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub account: AccountSnapshot,
    /// Interval label ("15m", "1h", "4h", "1d") -> candles ordered by open
    /// time ascending. A failed fetch leaves an empty sequence.
    pub market_data: HashMap<String, Vec<Candle>>,
    /// Agent name -> result, in the order the chain committed them
    pub agent_results: HashMap<String, AgentResult>,
}

impl PipelineContext {
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        account: AccountSnapshot,
        market_data: HashMap<String, Vec<Candle>>,
    ) -> Self {
        Self {
            account_id: account.id.clone(),
            symbol: symbol.into(),
            timeframe,
            account,
            market_data,
            agent_results: HashMap::new(),
        }
    }

    /// Candles for an interval; empty slice when the fetch degraded
    pub fn candles(&self, timeframe: Timeframe) -> &[Candle] {
        self.market_data
            .get(timeframe.label())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Close of the most recent candle on the run's own interval
    pub fn last_price(&self) -> Option<f64> {
        self.candles(self.timeframe).last().map(|c| c.close)
    }

    /// Commit an agent's result. Called only by the orchestrator, once per
    /// agent, in chain order.
    pub fn record_result(&mut self, kind: AgentKind, result: AgentResult) {
        self.agent_results.insert(kind.as_str().to_string(), result);
    }

    pub fn result(&self, kind: AgentKind) -> Option<&AgentResult> {
        self.agent_results.get(kind.as_str())
    }
}
