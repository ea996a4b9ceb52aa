pub mod config;
mod pipeline_routes;
mod signal_routes;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use decision_engine::DecisionEngine;
use execution_queue::{MemoryQueue, RedisQueue, SignalQueue};
use execution_worker::{ExecutionWorker, WorkerConfig};
use market_data::MarketDataClient;
use pipeline_orchestrator::{AgentMode, PipelineOrchestrator, RemoteAgentTable, Scheduler};
use serde::Serialize;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use trade_store::TradeStore;
use venue_trait::VenueClient;

use config::EngineConfig;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PipelineOrchestrator>,
    pub store: Arc<TradeStore>,
    pub default_account_id: String,
    pub default_symbol: String,
    pub default_timeframe: engine_core::Timeframe,
    pub use_http_agents: bool,
    pub started_at: DateTime<Utc>,
}

/// Uniform response envelope for every control-plane endpoint
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Handler error: everything surfaces as structured JSON, never a panic or
/// a bare string across the process boundary
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {:#}", self.0);
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.0.to_string(),
        }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(pipeline_routes::routes())
        .merge(signal_routes::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<serde_json::Value> {
    let uptime = (Utc::now() - state.started_at).num_seconds();
    Json(serde_json::json!({
        "status": "ok",
        "uptimeSecs": uptime,
    }))
}

/// Full engine process: store, queue, venue, orchestrator, scheduler,
/// execution workers, and the HTTP control plane, all sharing one shutdown
/// signal.
pub async fn run_server() -> Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    tracing::info!("Starting CoinBrain decision engine");

    let config = EngineConfig::from_env()?;
    tracing::info!("Configuration loaded and validated");
    tracing::info!("  Default pair: {} {}", config.default_symbol, config.default_timeframe.label());
    tracing::info!("  Pipeline interval: {}ms", config.pipeline_interval_ms);
    tracing::info!("  Agent mode: {}", if config.use_http_agents { "remote" } else { "in-process" });
    tracing::info!("  Venue: {}", config.venue);
    if config.live_execution {
        tracing::warn!("  LIVE EXECUTION ENABLED — orders will reach the venue");
    } else {
        tracing::info!("  Live execution disabled; signals persist as pending");
    }

    // Store: unreachable database at boot is fatal
    sqlx::any::install_default_drivers();
    let pool = sqlx::AnyPool::connect(&config.database_url).await?;
    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Database connectivity check failed: {e}"))?;
    let store = Arc::new(TradeStore::new(pool));
    store.init_tables().await?;
    tracing::info!("Startup check: database OK");

    // Queue: a missing or unreachable key-value store degrades to the
    // process-local queue so decisions keep flowing
    let queue: Arc<dyn SignalQueue> = match &config.redis_url {
        Some(url) => match RedisQueue::connect(url, "coinbrain:signals").await {
            Ok(q) => {
                tracing::info!("Startup check: queue store OK");
                Arc::new(q)
            }
            Err(e) => {
                tracing::warn!("Queue store unreachable ({e}); using in-process queue");
                Arc::new(MemoryQueue::new())
            }
        },
        None => {
            tracing::info!("REDIS_URL not set; using in-process queue");
            Arc::new(MemoryQueue::new())
        }
    };

    let venue: Arc<dyn VenueClient> = match config.venue.as_str() {
        "binance" => Arc::new(binance_venue::BinanceVenue::from_env()),
        _ => Arc::new(bybit_venue::BybitVenue::from_env()),
    };

    let market_data = Arc::new(MarketDataClient::new(config.market_data_base_url.clone()));
    let decision_engine =
        DecisionEngine::new(store.clone(), queue.clone(), config.live_execution);
    let remote_table = RemoteAgentTable::from_base(
        &config.remote_agent_base_url,
        config.remote_agent_first_port,
        &config.remote_agent_ports,
    );
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        store.clone(),
        market_data,
        decision_engine,
        signal_agents::local_agents(),
        &remote_table,
    ));

    // One shutdown signal for every long-lived worker
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Shutdown signal received");
        shutdown_tx.send(true).ok();
    });

    // Execution workers
    for i in 0..config.execution_workers {
        let worker = ExecutionWorker::new(
            store.clone(),
            queue.clone(),
            venue.clone(),
            WorkerConfig {
                risk_fraction: config.risk_fraction,
                reference_price: config.reference_price,
                live_execution: config.live_execution,
            },
        );
        let rx = shutdown_rx.clone();
        tokio::spawn(async move {
            tracing::info!("Spawning execution worker {}", i);
            worker.run(rx).await;
        });
    }

    // Scheduler
    if config.pipeline_interval_ms > 0 {
        let scheduler = Scheduler::new(
            orchestrator.clone(),
            config.default_account_id.clone(),
            config.default_symbol.clone(),
            config.default_timeframe,
            if config.use_http_agents {
                AgentMode::Remote
            } else {
                AgentMode::InProcess
            },
            Duration::from_millis(config.pipeline_interval_ms),
        );
        let rx = shutdown_rx.clone();
        tokio::spawn(async move { scheduler.run(rx).await });
    } else {
        tracing::info!("Scheduler disabled (PIPELINE_INTERVAL_MS=0)");
    }

    let state = AppState {
        orchestrator,
        store,
        default_account_id: config.default_account_id.clone(),
        default_symbol: config.default_symbol.clone(),
        default_timeframe: config.default_timeframe,
        use_http_agents: config.use_http_agents,
        started_at: Utc::now(),
    };

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&config.http_bind).await?;
    tracing::info!("Control plane listening on {}", config.http_bind);

    let mut rx = shutdown_rx;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while !*rx.borrow() {
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await?;

    tracing::info!("Engine stopped cleanly");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(_) => {
            tokio::signal::ctrl_c().await.ok();
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT");
        }
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    tokio::signal::ctrl_c().await.ok();
}
