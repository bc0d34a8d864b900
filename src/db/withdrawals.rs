use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use uuid::Uuid;

use crate::status::{validate_transition, MemberType, TransitionError, WithdrawalStatus};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: Uuid,
    pub member_id: String,
    pub member_type: MemberType,
    pub asset: String,
    /// Minor units; no floats anywhere near money.
    pub amount: i64,
    pub destination_address: String,
    pub reference_hash: String,
    pub status: WithdrawalStatus,
    pub tx_hash: Option<String>,
    pub retry_count: i32,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewWithdrawal<'a> {
    pub member_id: &'a str,
    pub member_type: MemberType,
    pub asset: &'a str,
    pub amount: i64,
    pub destination_address: &'a str,
    pub reference_hash: &'a str,
    pub status: WithdrawalStatus,
}

#[derive(Debug, Error)]
pub enum WithdrawalUpdateError {
    #[error("withdrawal {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub async fn insert_withdrawal(
    pool: &PgPool,
    new: NewWithdrawal<'_>,
) -> Result<Withdrawal, sqlx::Error> {
    sqlx::query_as::<_, Withdrawal>(
        r#"
        INSERT INTO withdrawals
            (member_id, member_type, asset, amount, destination_address, reference_hash, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(new.member_id)
    .bind(new.member_type)
    .bind(new.asset)
    .bind(new.amount)
    .bind(new.destination_address)
    .bind(new.reference_hash)
    .bind(new.status)
    .fetch_one(pool)
    .await
}

pub async fn get_withdrawal(pool: &PgPool, id: Uuid) -> Result<Option<Withdrawal>, sqlx::Error> {
    sqlx::query_as::<_, Withdrawal>("SELECT * FROM withdrawals WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_withdrawals(
    pool: &PgPool,
    status: Option<WithdrawalStatus>,
    member_type: Option<MemberType>,
) -> Result<Vec<Withdrawal>, sqlx::Error> {
    sqlx::query_as::<_, Withdrawal>(
        r#"
        SELECT * FROM withdrawals
        WHERE ($1::withdrawal_status IS NULL OR status = $1)
          AND ($2::member_type IS NULL OR member_type = $2)
        ORDER BY created_at DESC
        "#,
    )
    .bind(status)
    .bind(member_type)
    .fetch_all(pool)
    .await
}

/// Batch fetch for the polling queues; rows past `max_retries` are left for
/// the queue to fail out explicitly.
pub async fn fetch_withdrawals_in_status(
    pool: &PgPool,
    status: WithdrawalStatus,
    batch_size: i64,
) -> Result<Vec<Withdrawal>, sqlx::Error> {
    sqlx::query_as::<_, Withdrawal>(
        r#"
        SELECT * FROM withdrawals
        WHERE status = $1
        ORDER BY created_at ASC
        LIMIT $2
        "#,
    )
    .bind(status)
    .bind(batch_size)
    .fetch_all(pool)
    .await
}

/// Moves a withdrawal one step through the lifecycle, enforcing the
/// transition table and member-type validity inside a row lock. Terminal rows
/// are immutable; an illegal step leaves the row untouched.
pub async fn transition_withdrawal_status(
    pool: &PgPool,
    id: Uuid,
    to: WithdrawalStatus,
    failure_reason: Option<&str>,
) -> Result<Withdrawal, WithdrawalUpdateError> {
    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, Withdrawal>("SELECT * FROM withdrawals WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(WithdrawalUpdateError::NotFound(id))?;

    validate_transition(current.status, to, current.member_type)?;

    let updated = sqlx::query_as::<_, Withdrawal>(
        r#"
        UPDATE withdrawals
        SET status = $2,
            failure_reason = COALESCE($3, failure_reason),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(to)
    .bind(failure_reason)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(updated)
}

pub async fn process_withdrawal_retry(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE withdrawals SET retry_count = retry_count + 1, updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_withdrawal_tx_hash(
    pool: &PgPool,
    id: Uuid,
    tx_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE withdrawals SET tx_hash = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(tx_hash)
        .execute(pool)
        .await?;
    Ok(())
}
