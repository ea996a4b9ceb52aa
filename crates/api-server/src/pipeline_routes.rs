use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use engine_core::Timeframe;
use pipeline_orchestrator::AgentMode;
use serde::{Deserialize, Serialize};
use trade_store::{PipelineRunRow, PipelineStepRow};

use crate::{ApiResponse, AppError, AppState};

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RunPipelineRequest {
    pub account_id: Option<String>,
    pub symbol: Option<String>,
    pub timeframe: Option<String>,
    pub use_http_agents: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunPipelineResponse {
    pub run_id: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct RunWithSteps {
    #[serde(flatten)]
    pub run: PipelineRunRow,
    pub steps: Vec<PipelineStepRow>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pipeline/run", post(run_pipeline))
        .route("/pipeline/runs", get(recent_runs))
}

/// Trigger one decision cycle. Body fields default to the configured
/// account/symbol/timeframe.
async fn run_pipeline(
    State(state): State<AppState>,
    body: Option<Json<RunPipelineRequest>>,
) -> Result<Json<ApiResponse<RunPipelineResponse>>, AppError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();

    let account_id = req
        .account_id
        .unwrap_or_else(|| state.default_account_id.clone());
    let symbol = req.symbol.unwrap_or_else(|| state.default_symbol.clone());
    let timeframe = match req.timeframe {
        Some(raw) => Timeframe::parse(&raw)
            .ok_or_else(|| anyhow::anyhow!("invalid timeframe: {raw}"))?,
        None => state.default_timeframe,
    };
    let mode = if req.use_http_agents.unwrap_or(state.use_http_agents) {
        AgentMode::Remote
    } else {
        AgentMode::InProcess
    };

    let run_id = state
        .orchestrator
        .run_once(&account_id, &symbol, timeframe, mode)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    Ok(Json(ApiResponse::success(RunPipelineResponse {
        run_id,
        status: "completed".to_string(),
    })))
}

/// Recent runs with their recorded steps
async fn recent_runs(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<RunWithSteps>>>, AppError> {
    let runs = state.store.recent_runs(20).await?;

    let mut out = Vec::with_capacity(runs.len());
    for run in runs {
        let steps = state.store.steps_for_run(&run.id).await?;
        out.push(RunWithSteps { run, steps });
    }

    Ok(Json(ApiResponse::success(out)))
}
