use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use engine_core::AccountSnapshot;
use trade_store::{BrainDecisionRow, TradeSignalRow};

use crate::{ApiResponse, AppError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts/:id", get(get_account))
        .route("/signals", get(list_signals))
        .route("/decisions", get(list_decisions))
}

async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<AccountSnapshot>>, AppError> {
    let account = state
        .store
        .get_account(&id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("account {id} not found"))?;
    Ok(Json(ApiResponse::success(account)))
}

async fn list_signals(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<TradeSignalRow>>>, AppError> {
    Ok(Json(ApiResponse::success(
        state.store.list_trade_signals(50).await?,
    )))
}

async fn list_decisions(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<BrainDecisionRow>>>, AppError> {
    Ok(Json(ApiResponse::success(
        state.store.list_brain_decisions(50).await?,
    )))
}
