pub mod client;
pub mod deposits;
pub mod vault_transfers;
pub mod withdrawals;
