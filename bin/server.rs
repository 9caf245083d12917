// Meter Reading Uploader - Web Server
// REST API with Axum

use anyhow::{Context, Result};
use meter_readings::api::{router, AppState};
use meter_readings::{Config, SqliteStore};

#[tokio::main]
async fn main() -> Result<()> {
    meter_readings::init_tracing();

    let config = Config::from_env().context("Failed to read configuration")?;

    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("Failed to open database {:?}", config.database_path))?;
    tracing::info!(path = ?config.database_path, "database opened");

    if config.seed_accounts {
        store
            .seed_default_accounts()
            .context("Failed to seed accounts")?;
    }

    let app = router(AppState::new(store));

    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    tracing::info!("Server running on http://{addr}");
    tracing::info!("Upload: POST http://{addr}/api/meter-reading-uploads");

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
