use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::routes::AppState;
use crate::db::withdrawals::{self, NewWithdrawal, Withdrawal};
use crate::error::{AppError, AppResult};
use crate::events::Event;
use crate::status::progress::{project, Progress};
use crate::status::{initial_status, MemberType, WithdrawalStatus};

#[derive(Debug, Deserialize)]
pub struct SubmitWithdrawalRequest {
    pub member_id: String,
    pub member_type: MemberType,
    pub asset: String,
    pub amount: i64,
    pub destination_address: String,
}

pub async fn submit_withdrawal(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubmitWithdrawalRequest>,
) -> AppResult<(StatusCode, Json<Withdrawal>)> {
    if payload.amount <= 0 {
        return Err(AppError::Validation("Amount must be positive".to_string()));
    }
    if payload.member_id.trim().is_empty() {
        return Err(AppError::Validation("Member id cannot be empty".to_string()));
    }
    if payload.destination_address.trim().is_empty() {
        return Err(AppError::Validation(
            "Destination address cannot be empty".to_string(),
        ));
    }

    // Salted reference hash; identifies the request toward the screening
    // provider and the signing service without exposing the row id.
    let nonce = Uuid::new_v4();
    let mut hasher = Sha256::new();
    hasher.update(format!(
        "{}{}{}{}",
        payload.member_id, payload.asset, payload.amount, nonce
    ));
    let reference_hash = format!("{:x}", hasher.finalize());

    let withdrawal = withdrawals::insert_withdrawal(
        &state.db,
        NewWithdrawal {
            member_id: &payload.member_id,
            member_type: payload.member_type,
            asset: &payload.asset,
            amount: payload.amount,
            destination_address: &payload.destination_address,
            reference_hash: &reference_hash,
            status: initial_status(payload.member_type),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(withdrawal)))
}

#[derive(Debug, Deserialize)]
pub struct ListWithdrawalsParams {
    pub status: Option<WithdrawalStatus>,
    pub member_type: Option<MemberType>,
}

pub async fn list_withdrawals(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListWithdrawalsParams>,
) -> AppResult<Json<Vec<Withdrawal>>> {
    let rows = withdrawals::list_withdrawals(&state.db, params.status, params.member_type).await?;
    Ok(Json(rows))
}

pub async fn get_withdrawal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Withdrawal>> {
    let withdrawal = withdrawals::get_withdrawal(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("withdrawal {id}")))?;
    Ok(Json(withdrawal))
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub status: WithdrawalStatus,
    pub label: &'static str,
    pub progress: Progress,
}

pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ProgressResponse>> {
    let withdrawal = withdrawals::get_withdrawal(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("withdrawal {id}")))?;
    Ok(Json(ProgressResponse {
        status: withdrawal.status,
        label: withdrawal.status.label(),
        progress: project(withdrawal.status),
    }))
}

pub async fn cancel_withdrawal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Withdrawal>> {
    let withdrawal = withdrawals::get_withdrawal(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("withdrawal {id}")))?;

    if !withdrawal.status.is_cancellable() {
        return Err(AppError::Conflict(format!(
            "withdrawal in status {} cannot be cancelled",
            withdrawal.status
        )));
    }

    let updated = withdrawals::transition_withdrawal_status(
        &state.db,
        id,
        WithdrawalStatus::WithdrawalStopped,
        Some("cancelled by member"),
    )
    .await?;

    state.events.publish(Event::WithdrawalUpdated(updated.clone()));
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: WithdrawalStatus,
    pub reason: Option<String>,
}

/// Admin-driven lifecycle step. The transition table is enforced; an illegal
/// step is a 422 and a terminal row a 409.
pub async fn admin_transition(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionRequest>,
) -> AppResult<Json<Withdrawal>> {
    let updated = withdrawals::transition_withdrawal_status(
        &state.db,
        id,
        payload.status,
        payload.reason.as_deref(),
    )
    .await?;

    state.events.publish(Event::WithdrawalUpdated(updated.clone()));
    Ok(Json(updated))
}
