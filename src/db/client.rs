use anyhow::Result;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::AppConfig;

pub type DbPool = PgPool;

/// Database client wrapper
#[derive(Clone)]
pub struct DbClient {
    pub pool: DbPool,
}

impl DbClient {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.get_db_url())
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}
