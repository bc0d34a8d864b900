use clap::Parser;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::spawn;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use custodia::aml::HttpScreeningProvider;
use custodia::api::routes::{build_router, AppState};
use custodia::config::load_config;
use custodia::db::client::DbClient;
use custodia::events::EventBus;
use custodia::queue::aml_queue::AmlQueue;
use custodia::queue::deposit_queue::DepositQueue;
use custodia::queue::settlement_queue::SettlementQueue;
use custodia::queue::vault_queue::VaultQueue;
use custodia::transfer::HttpTransferExecutor;

#[derive(Parser)]
#[command(name = "custodia", about = "Custody withdrawal orchestrator")]
struct Cli {
    /// Path to a TOML config file; env vars override it.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting custodia");

    // Create database connection pool and bring the schema up to date
    let db = DbClient::new(&config).await?;
    info!("Running database migrations");
    db.run_migrations().await?;
    let db_pool = db.pool;

    let events = EventBus::default();
    let screening = Arc::new(HttpScreeningProvider::new(&config.aml)?);
    let executor = Arc::new(HttpTransferExecutor::new(&config.transfer)?);

    // Start the lifecycle workers
    let aml_queue = AmlQueue::new(
        db_pool.clone(),
        config.queue.clone(),
        screening,
        events.clone(),
    );
    spawn(async move { aml_queue.run().await });

    let settlement_queue = SettlementQueue::new(
        db_pool.clone(),
        config.queue.clone(),
        executor,
        events.clone(),
    );
    spawn(async move { settlement_queue.run().await });

    let deposit_queue = DepositQueue::new(db_pool.clone(), config.queue.clone(), events.clone());
    spawn(async move { deposit_queue.run().await });

    let vault_queue = VaultQueue::new(
        db_pool.clone(),
        config.queue.clone(),
        config.vault.clone(),
        events.clone(),
    );
    spawn(async move { vault_queue.run().await });

    // Serve the API
    let bind_addr = config.server.bind_addr();
    let state = Arc::new(AppState {
        db: db_pool,
        config,
        events,
    });
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("API listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down custodia");
        })
        .await?;

    Ok(())
}
