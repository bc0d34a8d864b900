use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::routes::AppState;
use crate::db::deposits::{self, Deposit};
use crate::error::{AppError, AppResult};
use crate::events::Event;

#[derive(Debug, Deserialize)]
pub struct RecordDepositRequest {
    pub member_id: String,
    pub asset: String,
    pub amount: i64,
    pub tx_hash: String,
    /// Overrides the configured confirmation depth for this deposit.
    pub required_confirmations: Option<i32>,
}

/// Called by the deposit monitor when a new inbound transaction appears.
pub async fn record_deposit(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RecordDepositRequest>,
) -> AppResult<(StatusCode, Json<Deposit>)> {
    if payload.amount <= 0 {
        return Err(AppError::Validation("Amount must be positive".to_string()));
    }
    if payload.tx_hash.trim().is_empty() {
        return Err(AppError::Validation("Tx hash cannot be empty".to_string()));
    }

    let required = payload
        .required_confirmations
        .unwrap_or(state.config.vault.required_confirmations);

    let deposit = match deposits::insert_deposit(
        &state.db,
        &payload.member_id,
        &payload.asset,
        payload.amount,
        &payload.tx_hash,
        required,
    )
    .await
    {
        Ok(deposit) => deposit,
        Err(e) if e.as_database_error().is_some_and(|db| db.is_unique_violation()) => {
            return Err(AppError::Conflict("Duplicate deposit tx hash".to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    state.events.publish(Event::DepositDetected(deposit.clone()));
    Ok((StatusCode::CREATED, Json(deposit)))
}

pub async fn get_pending_deposits(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<Deposit>>> {
    let rows = deposits::fetch_pending_deposits(&state.db, state.config.queue.batch_size).await?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmationsRequest {
    pub confirmations: i32,
}

/// Confirmation-depth report from the deposit monitor. Status moves and
/// crediting happen in the deposit queue, not here.
pub async fn report_confirmations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmationsRequest>,
) -> AppResult<Json<Deposit>> {
    let deposit = deposits::record_deposit_confirmations(&state.db, id, payload.confirmations)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("deposit {id}")))?;

    state.events.publish(Event::DepositUpdated(deposit.clone()));
    Ok(Json(deposit))
}
