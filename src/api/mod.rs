pub mod deposits;
pub mod routes;
pub mod vault_transfers;
pub mod withdrawals;
pub mod ws;
