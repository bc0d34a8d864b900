use config::{Config, Environment, File};
use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Loads configuration from a given config file or environment variables.
pub fn load_config(config_file_path: Option<&Path>) -> anyhow::Result<AppConfig> {
    // Load .env file if it exists, ignore if not present
    dotenv().ok();

    let mut settings = Config::builder();

    if let Some(path) = config_file_path {
        settings = settings.add_source(File::from(path).required(true));
    }

    // Add environment variables with prefix CUSTODIA
    settings = settings.add_source(Environment::with_prefix("CUSTODIA").separator("__"));

    let app_config = settings.build()?.try_deserialize::<AppConfig>()?;

    Ok(app_config)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
    pub aml: AmlConfig,
    pub transfer: TransferConfig,
    pub vault: VaultConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn get_db_url(&self) -> String {
        std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| panic!("DATABASE_URL is not set in environment or .env file"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    pub process_interval_sec: u64,
    pub max_retries: u32,
    pub batch_size: i64,
    pub retry_delay_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmlConfig {
    pub endpoint: String,
    pub request_timeout_sec: u64,
}

impl AmlConfig {
    pub fn get_api_key(&self) -> String {
        std::env::var("AML_API_KEY")
            .unwrap_or_else(|_| panic!("AML_API_KEY is not set in environment or .env file"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferConfig {
    pub endpoint: String,
    pub request_timeout_sec: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Credited hot-wallet balance (minor units) above which a sweep to cold
    /// storage is initiated.
    pub hot_wallet_threshold: i64,
    pub sweep_batch_size: i64,
    /// Confirmations required before a detected deposit is credited.
    pub required_confirmations: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String, // "debug" | "info" | "warn" | "error"
}
