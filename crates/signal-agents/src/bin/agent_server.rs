//! Microservice host for a single agent: `AGENT_NAME` picks the agent,
//! `PORT` the listen port. Exposes the remote-agent contract:
//! `POST /run` with a serialized pipeline context, `GET /health`.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use engine_core::{Agent, AgentKind, PipelineContext};

#[derive(Clone)]
struct HostState {
    agent: Arc<dyn Agent>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let name = std::env::var("AGENT_NAME")
        .map_err(|_| anyhow::anyhow!("AGENT_NAME not set"))?;
    let kind = AgentKind::parse(&name)
        .ok_or_else(|| anyhow::anyhow!("unknown agent name: {name}"))?;
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(9100);

    let state = HostState {
        agent: signal_agents::local_agent(kind),
    };

    let app = Router::new()
        .route("/run", post(run_agent))
        .route("/health", get(health))
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("Agent host for {} listening on {}", kind, addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn run_agent(
    State(state): State<HostState>,
    Json(ctx): Json<PipelineContext>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    match state.agent.evaluate(&ctx).await {
        Ok(result) => Ok(Json(serde_json::json!({
            "score": result.score,
            "confidence": result.confidence,
            "payload": result.payload,
        }))),
        Err(e) => {
            tracing::warn!("Agent {} failed: {}", state.agent.kind(), e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
