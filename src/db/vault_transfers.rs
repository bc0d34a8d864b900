use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "vault_transfer_status", rename_all = "snake_case")]
pub enum VaultTransferStatus {
    Initiated,
    InTransit,
    Completed,
    Failed,
}

/// A hot-to-cold sweep of credited deposits.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct VaultTransfer {
    pub id: Uuid,
    pub asset: String,
    pub amount: i64,
    pub status: VaultTransferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creates a sweep and claims the deposits that fund it in one transaction,
/// so a crash mid-sweep cannot leave those deposits eligible for a second
/// transfer on the next cycle.
pub async fn create_vault_transfer(
    pool: &PgPool,
    asset: &str,
    amount: i64,
    deposit_ids: &[Uuid],
) -> Result<VaultTransfer, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let transfer = sqlx::query_as::<_, VaultTransfer>(
        r#"
        INSERT INTO vault_transfers (asset, amount, status)
        VALUES ($1, $2, 'initiated')
        RETURNING *
        "#,
    )
    .bind(asset)
    .bind(amount)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE deposits
        SET vault_transfer_id = $1, updated_at = now()
        WHERE id = ANY($2)
        "#,
    )
    .bind(transfer.id)
    .bind(deposit_ids)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(transfer)
}

pub async fn list_vault_transfers(pool: &PgPool) -> Result<Vec<VaultTransfer>, sqlx::Error> {
    sqlx::query_as::<_, VaultTransfer>("SELECT * FROM vault_transfers ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

/// Sweeps still in flight.
pub async fn fetch_active_vault_transfers(
    pool: &PgPool,
    batch_size: i64,
) -> Result<Vec<VaultTransfer>, sqlx::Error> {
    sqlx::query_as::<_, VaultTransfer>(
        r#"
        SELECT * FROM vault_transfers
        WHERE status IN ('initiated', 'in_transit')
        ORDER BY created_at ASC
        LIMIT $1
        "#,
    )
    .bind(batch_size)
    .fetch_all(pool)
    .await
}

pub async fn update_vault_transfer_status(
    pool: &PgPool,
    id: Uuid,
    status: VaultTransferStatus,
) -> Result<VaultTransfer, sqlx::Error> {
    sqlx::query_as::<_, VaultTransfer>(
        "UPDATE vault_transfers SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status)
    .fetch_one(pool)
    .await
}
