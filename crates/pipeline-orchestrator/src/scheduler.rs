use std::sync::Arc;
use std::time::Duration;

use engine_core::Timeframe;
use tokio::sync::watch;

use crate::{AgentMode, PipelineOrchestrator};

/// Fires `run_once` for one configured (account, symbol, timeframe) on a
/// fixed period. Runs execute inline, so a slow run simply delays the next
/// tick instead of piling up overlapping cycles.
pub struct Scheduler {
    orchestrator: Arc<PipelineOrchestrator>,
    account_id: String,
    symbol: String,
    timeframe: Timeframe,
    mode: AgentMode,
    period: Duration,
}

impl Scheduler {
    pub fn new(
        orchestrator: Arc<PipelineOrchestrator>,
        account_id: impl Into<String>,
        symbol: impl Into<String>,
        timeframe: Timeframe,
        mode: AgentMode,
        period: Duration,
    ) -> Self {
        Self {
            orchestrator,
            account_id: account_id.into(),
            symbol: symbol.into(),
            timeframe,
            mode,
            period,
        }
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        tracing::info!(
            "Scheduler started: {} {} every {:?}",
            self.symbol,
            self.timeframe.label(),
            self.period
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = interval.tick() => {
                    match self
                        .orchestrator
                        .run_once(&self.account_id, &self.symbol, self.timeframe, self.mode)
                        .await
                    {
                        Ok(run_id) => tracing::info!("Scheduled run {} finished", run_id),
                        Err(e) => tracing::error!("Scheduled run failed: {}", e),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Scheduler stopped");
    }
}
