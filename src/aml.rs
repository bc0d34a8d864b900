//! AML screening provider client.
//!
//! Screening itself is an external service; this module owns the HTTP
//! contract and maps provider verdicts onto the withdrawal lifecycle.

use async_trait::async_trait;
use mockall::automock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::AmlConfig;
use crate::status::MemberType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    /// Triggers EDD on the member side; the withdrawal is flagged.
    High,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreeningVerdict {
    Clear,
    Flagged { risk_level: RiskLevel, reason: String },
}

#[derive(Debug, Error)]
pub enum ScreeningError {
    #[error("Screening request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Screening provider returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("Unrecognized screening verdict: {0}")]
    UnknownVerdict(String),
}

impl ScreeningError {
    /// Provider hiccups are retried by the queue; a malformed verdict is not.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, ScreeningError::UnknownVerdict(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScreeningRequest {
    pub reference: String,
    pub member_id: String,
    pub member_type: MemberType,
    pub asset: String,
    pub amount: i64,
    pub destination_address: String,
}

#[automock]
#[async_trait]
pub trait ScreeningProvider: Send + Sync {
    async fn screen(&self, request: ScreeningRequest)
        -> Result<ScreeningVerdict, ScreeningError>;
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    verdict: String,
    risk_level: Option<RiskLevel>,
    reason: Option<String>,
}

pub struct HttpScreeningProvider {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpScreeningProvider {
    pub fn new(config: &AmlConfig) -> Result<Self, ScreeningError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_sec))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.get_api_key(),
        })
    }
}

#[async_trait]
impl ScreeningProvider for HttpScreeningProvider {
    async fn screen(
        &self,
        request: ScreeningRequest,
    ) -> Result<ScreeningVerdict, ScreeningError> {
        let url = format!("{}/screenings?apiKey={}", self.endpoint, self.api_key);
        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(ScreeningError::Status(response.status()));
        }

        let body: ProviderResponse = response.json().await?;
        match body.verdict.as_str() {
            "clear" => Ok(ScreeningVerdict::Clear),
            "review" | "reject" => Ok(ScreeningVerdict::Flagged {
                risk_level: body.risk_level.unwrap_or(RiskLevel::High),
                reason: body.reason.unwrap_or_else(|| body.verdict.clone()),
            }),
            other => Err(ScreeningError::UnknownVerdict(other.to_string())),
        }
    }
}
