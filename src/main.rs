use mimalloc::MiMalloc;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use rak::db::RakStorage;
use rak::router::{RakState, rak_router};
use rak::storage::FilebaseStore;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &rak::config::CONFIG;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        listen_addr = %cfg.listen_addr,
        database_url = %cfg.database_url,
        s3_endpoint = %cfg.s3_endpoint,
        s3_bucket = %cfg.s3_bucket,
        gateway_url = %cfg.gateway_url,
        upload_file_size_mb = cfg.upload_file_size,
        cid_poll_attempts = cfg.cid_poll_attempts,
        loglevel = %cfg.loglevel,
    );
    if cfg.s3_key.is_empty() || cfg.s3_secret.is_empty() {
        warn!("RAK_S3_KEY / RAK_S3_SECRET not set; uploads will be rejected by the gateway");
    }

    let storage = RakStorage::connect(&cfg.database_url).await?;
    let objects = Arc::new(FilebaseStore::from_config(cfg));

    let state = RakState::new(storage, objects, (**cfg).clone())?;
    let app = rak_router(state);

    let listener = TcpListener::bind(cfg.listen_addr.as_str()).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        return;
    }
    info!("shutdown signal received");
}
