pub mod aml;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod queue {
    pub mod aml_queue;
    pub mod deposit_queue;
    pub mod settlement_queue;
    pub mod vault_queue;
}
pub mod status;
pub mod transfer;
