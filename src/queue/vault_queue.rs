use sqlx::PgPool;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

use crate::{
    config::{QueueConfig, VaultConfig},
    db::deposits::fetch_unswept_deposits,
    db::vault_transfers::{
        create_vault_transfer, fetch_active_vault_transfers, update_vault_transfer_status,
        VaultTransferStatus,
    },
    events::{Event, EventBus},
};

/// Sweeps credited deposits out of the hot wallet into cold storage once the
/// per-asset balance crosses the configured threshold, and walks each sweep
/// through its lifecycle, emitting vault-transfer events along the way.
pub struct VaultQueue {
    db_pool: PgPool,
    config: QueueConfig,
    vault: VaultConfig,
    events: EventBus,
}

impl VaultQueue {
    pub fn new(db_pool: PgPool, config: QueueConfig, vault: VaultConfig, events: EventBus) -> Self {
        Self {
            db_pool,
            config,
            vault,
            events,
        }
    }

    pub async fn run(&self) {
        loop {
            match self.process_cycle().await {
                Ok(_) => info!("Completed vault sweep cycle"),
                Err(e) => error!("Vault sweep cycle failed: {:?}", e),
            }
            sleep(Duration::from_secs(self.config.process_interval_sec)).await;
        }
    }

    async fn process_cycle(&self) -> Result<(), sqlx::Error> {
        self.initiate_sweeps().await?;
        self.advance_transfers().await?;
        Ok(())
    }

    async fn initiate_sweeps(&self) -> Result<(), sqlx::Error> {
        let deposits = fetch_unswept_deposits(&self.db_pool, self.vault.sweep_batch_size).await?;

        let mut by_asset: HashMap<String, (i64, Vec<uuid::Uuid>)> = HashMap::new();
        for deposit in deposits {
            let entry = by_asset.entry(deposit.asset.clone()).or_default();
            entry.0 += deposit.amount;
            entry.1.push(deposit.id);
        }

        for (asset, (amount, deposit_ids)) in by_asset {
            if amount < self.vault.hot_wallet_threshold {
                continue;
            }
            let transfer =
                create_vault_transfer(&self.db_pool, &asset, amount, &deposit_ids).await?;
            info!(
                "Vault transfer {} initiated: {} {} across {} deposits",
                transfer.id,
                amount,
                asset,
                deposit_ids.len()
            );
            self.events.publish(Event::VaultTransferInitiated(transfer));
        }

        Ok(())
    }

    /// One lifecycle step per cycle; the custody signer confirms each leg
    /// out of band, so a sweep spends at least one interval in transit.
    async fn advance_transfers(&self) -> Result<(), sqlx::Error> {
        let transfers =
            fetch_active_vault_transfers(&self.db_pool, self.config.batch_size).await?;

        for transfer in transfers {
            match transfer.status {
                VaultTransferStatus::Initiated => {
                    let updated = update_vault_transfer_status(
                        &self.db_pool,
                        transfer.id,
                        VaultTransferStatus::InTransit,
                    )
                    .await?;
                    self.events.publish(Event::VaultTransferUpdated(updated));
                }
                VaultTransferStatus::InTransit => {
                    let updated = update_vault_transfer_status(
                        &self.db_pool,
                        transfer.id,
                        VaultTransferStatus::Completed,
                    )
                    .await?;
                    info!("Vault transfer {} completed", updated.id);
                    self.events.publish(Event::VaultTransferCompleted(updated));
                }
                VaultTransferStatus::Completed | VaultTransferStatus::Failed => {}
            }
        }

        Ok(())
    }
}
