//! Long-running consumer of the execution queue. Each dequeued signal id is
//! processed under a per-signal TTL lock; the status transition in the store
//! is the second, unconditional guard, so even a degraded lock cannot yield
//! two executions of one signal.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use execution_queue::{signal_lock_key, SignalQueue};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use tokio::sync::watch;
use trade_store::{TradeStore, SIGNAL_STATUS_PENDING};
use venue_trait::{VenueClient, VenueOrderRequest};

pub const LOCK_TTL: Duration = Duration::from_secs(60);
const POLL_TIMEOUT: Duration = Duration::from_secs(5);
const QTY_PRECISION: u32 = 6;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Fallback risk fraction when the account row carries none
    pub risk_fraction: f64,
    /// Reference price for quantity computation. A deliberate stand-in: a
    /// production deployment substitutes a live price source here.
    pub reference_price: f64,
    /// Venue placement only happens with this on; otherwise signals are
    /// observed and left pending
    pub live_execution: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            risk_fraction: 0.02,
            reference_price: 50_000.0,
            live_execution: false,
        }
    }
}

pub struct ExecutionWorker {
    store: Arc<TradeStore>,
    queue: Arc<dyn SignalQueue>,
    venue: Arc<dyn VenueClient>,
    config: WorkerConfig,
}

impl ExecutionWorker {
    pub fn new(
        store: Arc<TradeStore>,
        queue: Arc<dyn SignalQueue>,
        venue: Arc<dyn VenueClient>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            queue,
            venue,
            config,
        }
    }

    /// Consume the queue until shutdown flips. In-flight signals finish
    /// before the loop exits.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            "Execution worker started (venue: {}, live: {})",
            self.venue.venue_name(),
            self.config.live_execution
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                popped = self.queue.dequeue_blocking(POLL_TIMEOUT) => {
                    match popped {
                        Ok(Some(signal_id)) => self.process_signal(&signal_id).await,
                        Ok(None) => {}
                        Err(e) => {
                            tracing::warn!("Queue dequeue failed: {}", e);
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                }
            }
        }

        tracing::info!("Execution worker stopped");
    }

    /// Handle one signal id under its lock. Safe to call concurrently with
    /// other workers holding the same id.
    pub async fn process_signal(&self, signal_id: &str) {
        let lock_key = signal_lock_key(signal_id);
        if !self.queue.try_acquire_lock(&lock_key, LOCK_TTL).await {
            tracing::debug!("Signal {} locked by another worker, skipping", signal_id);
            return;
        }

        if let Err(e) = self.try_execute(signal_id).await {
            tracing::warn!("Processing signal {} failed: {}", signal_id, e);
        }

        self.queue.release_lock(&lock_key).await;
    }

    async fn try_execute(&self, signal_id: &str) -> Result<()> {
        let Some(signal) = self.store.get_trade_signal(signal_id).await? else {
            tracing::warn!("Dequeued unknown signal {}", signal_id);
            return Ok(());
        };

        // Re-dequeues and lost races land here; skipping is the idempotent answer
        if signal.status != SIGNAL_STATUS_PENDING {
            tracing::debug!(
                "Signal {} already {}, skipping",
                signal_id,
                signal.status
            );
            return Ok(());
        }

        let Some(account) = self.store.get_account(&signal.account_id).await? else {
            self.store
                .mark_signal_rejected(signal_id, "account not found")
                .await?;
            return Ok(());
        };

        let risk_fraction = if account.max_risk_per_trade > 0.0 {
            account.max_risk_per_trade / 100.0
        } else {
            self.config.risk_fraction
        };
        let leverage = signal.leverage.max(1.0);
        let qty =
            account.current_balance * risk_fraction * leverage / self.config.reference_price;

        if !(qty > 0.0) {
            self.store
                .mark_signal_rejected(signal_id, "non-positive quantity")
                .await?;
            return Ok(());
        }

        if !self.config.live_execution {
            tracing::info!(
                "Live execution disabled; leaving signal {} pending",
                signal_id
            );
            return Ok(());
        }

        let qty_dec = Decimal::from_f64(qty)
            .unwrap_or(Decimal::ZERO)
            .round_dp(QTY_PRECISION);
        let order = match signal.direction.as_str() {
            "buy" => VenueOrderRequest::buy(&signal.symbol, qty_dec),
            "sell" => VenueOrderRequest::sell(&signal.symbol, qty_dec),
            other => {
                self.store
                    .mark_signal_rejected(signal_id, &format!("unexecutable direction: {other}"))
                    .await?;
                return Ok(());
            }
        };

        let placement = self.venue.place_market_order(&order).await;

        if placement.success {
            let tx_id = placement.tx_id.unwrap_or_default();
            if self.store.mark_signal_executed(signal_id, &tx_id).await? {
                self.store
                    .insert_trade_execution(
                        &signal.account_id,
                        &signal.symbol,
                        &signal.direction,
                        qty,
                        self.config.reference_price,
                        leverage,
                        &tx_id,
                    )
                    .await?;
                tracing::info!(
                    "Signal {} executed on {} (tx {})",
                    signal_id,
                    self.venue.venue_name(),
                    tx_id
                );
            } else {
                tracing::warn!(
                    "Signal {} transitioned elsewhere after placement (tx {})",
                    signal_id,
                    tx_id
                );
            }
        } else {
            let reason = placement
                .error
                .unwrap_or_else(|| "venue error".to_string());
            self.store.mark_signal_rejected(signal_id, &reason).await?;
            tracing::warn!("Signal {} rejected: {}", signal_id, reason);
        }

        Ok(())
    }
}
