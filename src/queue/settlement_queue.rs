use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::{
    config::QueueConfig,
    db::withdrawals::{
        fetch_withdrawals_in_status, process_withdrawal_retry, set_withdrawal_tx_hash,
        transition_withdrawal_status, Withdrawal,
    },
    events::{Event, EventBus},
    status::WithdrawalStatus,
    transfer::{ReceiptStatus, TransferExecutor},
};

/// Settles approved withdrawals: hands `processing` rows to the signing
/// service (moving them to `transferring`) and finalizes `transferring` rows
/// from transfer receipts into `success` or `failed`.
pub struct SettlementQueue {
    db_pool: PgPool,
    config: QueueConfig,
    executor: Arc<dyn TransferExecutor>,
    events: EventBus,
}

impl SettlementQueue {
    pub fn new(
        db_pool: PgPool,
        config: QueueConfig,
        executor: Arc<dyn TransferExecutor>,
        events: EventBus,
    ) -> Self {
        Self {
            db_pool,
            config,
            executor,
            events,
        }
    }

    pub async fn run(&self) {
        loop {
            match self.process_cycle().await {
                Ok(_) => info!("Completed settlement cycle"),
                Err(e) => error!("Settlement cycle failed: {:?}", e),
            }
            sleep(Duration::from_secs(self.config.process_interval_sec)).await;
        }
    }

    async fn process_cycle(&self) -> Result<(), sqlx::Error> {
        self.broadcast_approved().await?;
        self.finalize_transfers().await?;
        Ok(())
    }

    async fn broadcast_approved(&self) -> Result<(), sqlx::Error> {
        let withdrawals = fetch_withdrawals_in_status(
            &self.db_pool,
            WithdrawalStatus::Processing,
            self.config.batch_size,
        )
        .await?;

        for withdrawal in withdrawals {
            match self.executor.broadcast(&withdrawal).await {
                Ok(tx_hash) => {
                    info!("Withdrawal {} broadcast as {}", withdrawal.id, tx_hash);
                    set_withdrawal_tx_hash(&self.db_pool, withdrawal.id, &tx_hash).await?;
                    self.transition(&withdrawal, WithdrawalStatus::Transferring, None)
                        .await;
                }

                Err(e) => {
                    let max_retries = self.config.max_retries as i32;
                    if withdrawal.retry_count + 1 >= max_retries {
                        error!(
                            "Withdrawal {} broadcast failed after max retries: {:?}",
                            withdrawal.id, e
                        );
                        self.transition(
                            &withdrawal,
                            WithdrawalStatus::AdminRejected,
                            Some("transfer broadcast failed"),
                        )
                        .await;
                    } else {
                        warn!(
                            "Withdrawal {} broadcast error: {:?}. Will retry.",
                            withdrawal.id, e
                        );
                        process_withdrawal_retry(&self.db_pool, withdrawal.id).await?;
                        sleep(Duration::from_secs(self.config.retry_delay_seconds.into())).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn finalize_transfers(&self) -> Result<(), sqlx::Error> {
        let withdrawals = fetch_withdrawals_in_status(
            &self.db_pool,
            WithdrawalStatus::Transferring,
            self.config.batch_size,
        )
        .await?;

        for withdrawal in withdrawals {
            let Some(tx_hash) = withdrawal.tx_hash.clone() else {
                warn!("Withdrawal {} is transferring without a tx hash", withdrawal.id);
                continue;
            };

            match self.executor.check_receipt(&tx_hash).await {
                Ok(receipt) => {
                    if let Some((to, reason)) = receipt_outcome(receipt) {
                        match to {
                            WithdrawalStatus::Success => {
                                info!("Withdrawal {} settled ({})", withdrawal.id, tx_hash)
                            }
                            _ => error!(
                                "Withdrawal {} transfer failed: {}",
                                withdrawal.id,
                                reason.as_deref().unwrap_or("unknown")
                            ),
                        }
                        self.transition(&withdrawal, to, reason.as_deref()).await;
                    }
                    // Pending receipts are left for the next cycle.
                }

                Err(e) => {
                    let max_retries = self.config.max_retries as i32;
                    if withdrawal.retry_count + 1 >= max_retries {
                        error!(
                            "Withdrawal {} receipt unavailable after max retries: {:?}",
                            withdrawal.id, e
                        );
                        self.transition(
                            &withdrawal,
                            WithdrawalStatus::Failed,
                            Some("transfer receipt unavailable"),
                        )
                        .await;
                    } else {
                        warn!(
                            "Withdrawal {} receipt error: {:?}. Will retry.",
                            withdrawal.id, e
                        );
                        process_withdrawal_retry(&self.db_pool, withdrawal.id).await?;
                    }
                }
            }
        }

        Ok(())
    }

    async fn transition(
        &self,
        withdrawal: &Withdrawal,
        to: WithdrawalStatus,
        reason: Option<&str>,
    ) {
        match transition_withdrawal_status(&self.db_pool, withdrawal.id, to, reason).await {
            Ok(updated) => self.events.publish(Event::WithdrawalUpdated(updated)),
            Err(e) => warn!("Withdrawal {} not transitioned to {}: {}", withdrawal.id, to, e),
        }
    }
}

/// Terminal step for a receipt; `None` keeps the row transferring.
fn receipt_outcome(receipt: ReceiptStatus) -> Option<(WithdrawalStatus, Option<String>)> {
    match receipt {
        ReceiptStatus::Confirmed => Some((WithdrawalStatus::Success, None)),
        ReceiptStatus::Failed { reason } => Some((WithdrawalStatus::Failed, Some(reason))),
        ReceiptStatus::Pending => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::MockTransferExecutor;

    #[test]
    fn confirmed_receipts_settle() {
        assert_eq!(
            receipt_outcome(ReceiptStatus::Confirmed),
            Some((WithdrawalStatus::Success, None))
        );
    }

    #[test]
    fn failed_receipts_carry_the_reason() {
        assert_eq!(
            receipt_outcome(ReceiptStatus::Failed {
                reason: "insufficient hot wallet balance".to_string()
            }),
            Some((
                WithdrawalStatus::Failed,
                Some("insufficient hot wallet balance".to_string())
            ))
        );
    }

    #[test]
    fn pending_receipts_wait() {
        assert_eq!(receipt_outcome(ReceiptStatus::Pending), None);
    }

    #[tokio::test]
    async fn executor_receipts_flow_into_outcomes() {
        let mut executor = MockTransferExecutor::new();
        executor
            .expect_check_receipt()
            .returning(|_| Ok(ReceiptStatus::Confirmed));

        let receipt = executor.check_receipt("0xabc").await.unwrap();
        assert_eq!(
            receipt_outcome(receipt),
            Some((WithdrawalStatus::Success, None))
        );
    }
}
