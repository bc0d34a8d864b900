use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::{deposits, vault_transfers, withdrawals, ws};
use crate::config::AppConfig;
use crate::error::AppResult;
use crate::events::EventBus;

pub struct AppState {
    pub db: PgPool,
    pub config: AppConfig,
    pub events: EventBus,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/withdrawals",
            post(withdrawals::submit_withdrawal).get(withdrawals::list_withdrawals),
        )
        .route("/withdrawals/{id}", get(withdrawals::get_withdrawal))
        .route("/withdrawals/{id}/progress", get(withdrawals::get_progress))
        .route("/withdrawals/{id}/cancel", post(withdrawals::cancel_withdrawal))
        .route("/withdrawals/{id}/status", post(withdrawals::admin_transition))
        .route("/deposits", post(deposits::record_deposit))
        .route("/deposits/pending", get(deposits::get_pending_deposits))
        .route(
            "/deposits/{id}/confirmations",
            post(deposits::report_confirmations),
        )
        .route("/vault-transfers", get(vault_transfers::list_vault_transfers))
        .route("/ws/events", get(ws::events_ws))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    sqlx::query("SELECT 1").execute(&state.db).await?;
    Ok(Json(json!({ "status": "ok" })))
}
