//! Client for the signing/broadcast service that actually moves funds.

use async_trait::async_trait;
use mockall::automock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::config::TransferConfig;
use crate::db::withdrawals::Withdrawal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptStatus {
    Pending,
    Confirmed,
    Failed { reason: String },
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Transfer request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transfer service returned status {0}")]
    Status(reqwest::StatusCode),
}

#[automock]
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    /// Hands the withdrawal to the signing service; returns the broadcast
    /// transaction hash.
    async fn broadcast(&self, withdrawal: &Withdrawal) -> Result<String, TransferError>;

    async fn check_receipt(&self, tx_hash: &str) -> Result<ReceiptStatus, TransferError>;
}

#[derive(Debug, Serialize)]
struct BroadcastRequest<'a> {
    withdrawal_id: Uuid,
    asset: &'a str,
    amount: i64,
    destination_address: &'a str,
    reference_hash: &'a str,
}

#[derive(Debug, Deserialize)]
struct BroadcastResponse {
    tx_hash: String,
}

#[derive(Debug, Deserialize)]
struct ReceiptResponse {
    status: String,
    reason: Option<String>,
}

pub struct HttpTransferExecutor {
    client: Client,
    endpoint: String,
}

impl HttpTransferExecutor {
    pub fn new(config: &TransferConfig) -> Result<Self, TransferError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_sec))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl TransferExecutor for HttpTransferExecutor {
    async fn broadcast(&self, withdrawal: &Withdrawal) -> Result<String, TransferError> {
        let request = BroadcastRequest {
            withdrawal_id: withdrawal.id,
            asset: &withdrawal.asset,
            amount: withdrawal.amount,
            destination_address: &withdrawal.destination_address,
            reference_hash: &withdrawal.reference_hash,
        };
        let url = format!("{}/transfers", self.endpoint);
        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(TransferError::Status(response.status()));
        }

        let body: BroadcastResponse = response.json().await?;
        Ok(body.tx_hash)
    }

    async fn check_receipt(&self, tx_hash: &str) -> Result<ReceiptStatus, TransferError> {
        let url = format!("{}/transfers/{}", self.endpoint, tx_hash);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(TransferError::Status(response.status()));
        }

        let body: ReceiptResponse = response.json().await?;
        Ok(match body.status.as_str() {
            "confirmed" => ReceiptStatus::Confirmed,
            "failed" => ReceiptStatus::Failed {
                reason: body.reason.unwrap_or_else(|| "transfer failed".to_string()),
            },
            _ => ReceiptStatus::Pending,
        })
    }
}
