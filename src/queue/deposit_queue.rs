use sqlx::PgPool;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::{
    config::QueueConfig,
    db::deposits::{fetch_pending_deposits, update_deposit_status, Deposit, DepositStatus},
    events::{Event, EventBus},
};

/// Advances detected deposits through confirmation counting and credits them
/// once the required confirmation depth is reached. The deposit monitor
/// reports observed confirmations through the API; this queue only applies
/// status moves and emits the corresponding events.
pub struct DepositQueue {
    db_pool: PgPool,
    config: QueueConfig,
    events: EventBus,
}

impl DepositQueue {
    pub fn new(db_pool: PgPool, config: QueueConfig, events: EventBus) -> Self {
        Self {
            db_pool,
            config,
            events,
        }
    }

    pub async fn run(&self) {
        loop {
            match self.process_deposits().await {
                Ok(_) => info!("Completed deposit crediting cycle"),
                Err(e) => error!("Deposit crediting cycle failed: {:?}", e),
            }
            sleep(Duration::from_secs(self.config.process_interval_sec)).await;
        }
    }

    async fn process_deposits(&self) -> Result<(), sqlx::Error> {
        let deposits = fetch_pending_deposits(&self.db_pool, self.config.batch_size).await?;

        for deposit in deposits {
            if let Some(next) = next_status(&deposit) {
                let updated = update_deposit_status(&self.db_pool, deposit.id, next).await?;
                match next {
                    DepositStatus::Credited => {
                        info!(
                            "Deposit {} credited after {} confirmations",
                            updated.id, updated.confirmations
                        );
                        self.events.publish(Event::DepositCredited(updated));
                    }
                    DepositStatus::Orphaned => {
                        warn!("Deposit {} orphaned by a reorg", updated.id);
                        self.events.publish(Event::DepositUpdated(updated));
                    }
                    _ => self.events.publish(Event::DepositUpdated(updated)),
                }
            }
        }

        Ok(())
    }
}

/// Next lifecycle step for a deposit given the confirmation count the
/// monitor last reported. The required depth is the row's own: the API
/// defaults it from config at detection time, and a per-deposit override
/// is honored as stored.
fn next_status(deposit: &Deposit) -> Option<DepositStatus> {
    // A negative count means the monitor lost the containing block.
    if deposit.confirmations < 0 {
        return Some(DepositStatus::Orphaned);
    }
    if deposit.confirmations >= deposit.required_confirmations {
        return Some(DepositStatus::Credited);
    }
    if deposit.status == DepositStatus::Detected && deposit.confirmations > 0 {
        return Some(DepositStatus::Confirming);
    }
    None
}
