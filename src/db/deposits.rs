use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Lifecycle of an on-chain deposit as the monitor reports confirmations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "deposit_status", rename_all = "snake_case")]
pub enum DepositStatus {
    Detected,
    Confirming,
    Credited,
    /// The containing block was reorged away before crediting.
    Orphaned,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Deposit {
    pub id: Uuid,
    pub member_id: String,
    pub asset: String,
    pub amount: i64,
    pub tx_hash: String,
    pub confirmations: i32,
    pub required_confirmations: i32,
    pub status: DepositStatus,
    /// Set once the deposit is included in a hot-to-cold sweep.
    pub vault_transfer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn insert_deposit(
    pool: &PgPool,
    member_id: &str,
    asset: &str,
    amount: i64,
    tx_hash: &str,
    required_confirmations: i32,
) -> Result<Deposit, sqlx::Error> {
    sqlx::query_as::<_, Deposit>(
        r#"
        INSERT INTO deposits (member_id, asset, amount, tx_hash, required_confirmations, status)
        VALUES ($1, $2, $3, $4, $5, 'detected')
        RETURNING *
        "#,
    )
    .bind(member_id)
    .bind(asset)
    .bind(amount)
    .bind(tx_hash)
    .bind(required_confirmations)
    .fetch_one(pool)
    .await
}

pub async fn get_deposit(pool: &PgPool, id: Uuid) -> Result<Option<Deposit>, sqlx::Error> {
    sqlx::query_as::<_, Deposit>("SELECT * FROM deposits WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Deposits still waiting on confirmations.
pub async fn fetch_pending_deposits(
    pool: &PgPool,
    batch_size: i64,
) -> Result<Vec<Deposit>, sqlx::Error> {
    sqlx::query_as::<_, Deposit>(
        r#"
        SELECT * FROM deposits
        WHERE status IN ('detected', 'confirming')
        ORDER BY created_at ASC
        LIMIT $1
        "#,
    )
    .bind(batch_size)
    .fetch_all(pool)
    .await
}

/// Records the confirmation count the monitor observed for a deposit.
pub async fn record_deposit_confirmations(
    pool: &PgPool,
    id: Uuid,
    confirmations: i32,
) -> Result<Option<Deposit>, sqlx::Error> {
    sqlx::query_as::<_, Deposit>(
        r#"
        UPDATE deposits
        SET confirmations = $2, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(confirmations)
    .fetch_optional(pool)
    .await
}

pub async fn update_deposit_status(
    pool: &PgPool,
    id: Uuid,
    status: DepositStatus,
) -> Result<Deposit, sqlx::Error> {
    sqlx::query_as::<_, Deposit>(
        "UPDATE deposits SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status)
    .fetch_one(pool)
    .await
}

/// Credited deposits not yet swept into a vault transfer.
pub async fn fetch_unswept_deposits(
    pool: &PgPool,
    batch_size: i64,
) -> Result<Vec<Deposit>, sqlx::Error> {
    sqlx::query_as::<_, Deposit>(
        r#"
        SELECT * FROM deposits
        WHERE status = 'credited' AND vault_transfer_id IS NULL
        ORDER BY created_at ASC
        LIMIT $1
        "#,
    )
    .bind(batch_size)
    .fetch_all(pool)
    .await
}
