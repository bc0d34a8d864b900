use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::{
    aml::{ScreeningError, ScreeningProvider, ScreeningRequest, ScreeningVerdict},
    config::QueueConfig,
    db::withdrawals::{
        fetch_withdrawals_in_status, process_withdrawal_retry, transition_withdrawal_status,
        Withdrawal,
    },
    events::{Event, EventBus},
    status::WithdrawalStatus,
};

/// Drives withdrawals through AML screening: `aml_review` rows go to
/// `processing` on a clear verdict and `aml_issue` on a flag, with bounded
/// retries while the provider is unreachable.
pub struct AmlQueue {
    db_pool: PgPool,
    config: QueueConfig,
    provider: Arc<dyn ScreeningProvider>,
    events: EventBus,
}

impl AmlQueue {
    pub fn new(
        db_pool: PgPool,
        config: QueueConfig,
        provider: Arc<dyn ScreeningProvider>,
        events: EventBus,
    ) -> Self {
        Self {
            db_pool,
            config,
            provider,
            events,
        }
    }

    /// Runs the AML queue processor in an infinite loop.
    pub async fn run(&self) {
        loop {
            match self.process_reviews().await {
                Ok(_) => info!("Completed AML screening cycle"),
                Err(e) => error!("AML screening cycle failed: {:?}", e),
            }
            sleep(Duration::from_secs(self.config.process_interval_sec)).await;
        }
    }

    async fn process_reviews(&self) -> Result<(), sqlx::Error> {
        let withdrawals = fetch_withdrawals_in_status(
            &self.db_pool,
            WithdrawalStatus::AmlReview,
            self.config.batch_size,
        )
        .await?;

        for withdrawal in withdrawals {
            self.screen_withdrawal(&withdrawal).await?;
        }

        Ok(())
    }

    async fn screen_withdrawal(&self, withdrawal: &Withdrawal) -> Result<(), sqlx::Error> {
        let request = ScreeningRequest {
            reference: withdrawal.reference_hash.clone(),
            member_id: withdrawal.member_id.clone(),
            member_type: withdrawal.member_type,
            asset: withdrawal.asset.clone(),
            amount: withdrawal.amount,
            destination_address: withdrawal.destination_address.clone(),
        };

        let result = self.provider.screen(request).await;
        let max_retries = self.config.max_retries as i32;

        match decide(withdrawal.retry_count, max_retries, result) {
            ScreeningOutcome::Transition { to, reason } => {
                match to {
                    WithdrawalStatus::Processing => {
                        info!("Withdrawal {} cleared AML screening", withdrawal.id)
                    }
                    _ => warn!(
                        "Withdrawal {} held for review: {}",
                        withdrawal.id,
                        reason.as_deref().unwrap_or("flagged")
                    ),
                }
                self.transition(withdrawal, to, reason.as_deref()).await;
            }

            ScreeningOutcome::Retry(e) => {
                warn!(
                    "Withdrawal {} screening error: {:?}. Will retry.",
                    withdrawal.id, e
                );
                process_withdrawal_retry(&self.db_pool, withdrawal.id).await?;
                sleep(Duration::from_secs(self.config.retry_delay_seconds.into())).await;
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
            // A concurrent admin action may have moved the row already.
            Err(e) => warn!("Withdrawal {} not transitioned to {}: {}", withdrawal.id, to, e),
        }
    }
}

#[derive(Debug)]
enum ScreeningOutcome {
    Transition {
        to: WithdrawalStatus,
        reason: Option<String>,
    },
    Retry(ScreeningError),
}

/// Maps a screening result onto the next lifecycle step. Provider outages
/// retry until the budget is spent, after which the row is parked in
/// `aml_issue` for an admin to resolve.
fn decide(
    retry_count: i32,
    max_retries: i32,
    result: Result<ScreeningVerdict, ScreeningError>,
) -> ScreeningOutcome {
    match result {
        Ok(ScreeningVerdict::Clear) => ScreeningOutcome::Transition {
            to: WithdrawalStatus::Processing,
            reason: None,
        },

        Ok(ScreeningVerdict::Flagged { reason, .. }) => ScreeningOutcome::Transition {
            to: WithdrawalStatus::AmlIssue,
            reason: Some(reason),
        },

        Err(e) if e.is_retriable() && retry_count + 1 < max_retries => {
            ScreeningOutcome::Retry(e)
        }

        Err(e) if e.is_retriable() => ScreeningOutcome::Transition {
            to: WithdrawalStatus::AmlIssue,
            reason: Some("screening provider unavailable".to_string()),
        },

        Err(e) => ScreeningOutcome::Transition {
            to: WithdrawalStatus::AmlIssue,
            reason: Some(e.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aml::{MockScreeningProvider, RiskLevel};
    use crate::status::MemberType;

    fn request() -> ScreeningRequest {
        ScreeningRequest {
            reference: "ref-1".to_string(),
            member_id: "m-1".to_string(),
            member_type: MemberType::Individual,
            asset: "BTC".to_string(),
            amount: 1000,
            destination_address: "bc1q".to_string(),
        }
    }

    #[tokio::test]
    async fn clear_verdict_moves_to_processing() {
        let mut provider = MockScreeningProvider::new();
        provider
            .expect_screen()
            .returning(|_| Ok(ScreeningVerdict::Clear));

        let outcome = decide(0, 3, provider.screen(request()).await);
        match outcome {
            ScreeningOutcome::Transition { to, reason } => {
                assert_eq!(to, WithdrawalStatus::Processing);
                assert_eq!(reason, None);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn flagged_verdict_parks_in_aml_issue() {
        let mut provider = MockScreeningProvider::new();
        provider.expect_screen().returning(|_| {
            Ok(ScreeningVerdict::Flagged {
                risk_level: RiskLevel::High,
                reason: "sanctioned counterparty".to_string(),
            })
        });

        let outcome = decide(0, 3, provider.screen(request()).await);
        match outcome {
            ScreeningOutcome::Transition { to, reason } => {
                assert_eq!(to, WithdrawalStatus::AmlIssue);
                assert_eq!(reason.as_deref(), Some("sanctioned counterparty"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn outage_retries_until_budget_is_spent() {
        let outage = || Err(ScreeningError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE));

        assert!(matches!(decide(0, 3, outage()), ScreeningOutcome::Retry(_)));
        assert!(matches!(decide(1, 3, outage()), ScreeningOutcome::Retry(_)));
        match decide(2, 3, outage()) {
            ScreeningOutcome::Transition { to, .. } => {
                assert_eq!(to, WithdrawalStatus::AmlIssue)
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn malformed_verdict_fails_out_immediately() {
        let result = Err(ScreeningError::UnknownVerdict("maybe".to_string()));
        match decide(0, 3, result) {
            ScreeningOutcome::Transition { to, .. } => {
                assert_eq!(to, WithdrawalStatus::AmlIssue)
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
