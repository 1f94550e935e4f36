use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;

use equiptrace::config::Config;
use equiptrace::db::Database;
use equiptrace::handlers::app_router;
use equiptrace::services::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;

    let db = Database::new(config.data_dir.join("equiptrace.sqlite"))
        .context("opening database")?;
    let state = Arc::new(AppState::new(db, config.clone())?);

    let app = app_router(state);
    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
