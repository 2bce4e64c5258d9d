use std::sync::Arc;

use anyhow::Context;
use db::DBService;
use server::{Deployment, app};
use services::services::{clock::SystemClock, config::AppConfig};
use tracing::info;
use utils::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("info,server=debug,services=debug");

    let config = AppConfig::from_env().context("invalid configuration")?;
    info!(
        database_url = %config.database_url,
        insert_attempts = config.insert_attempts,
        "starting warehouse server"
    );

    let db = DBService::new(&config.database_url, config.max_connections)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;

    let addr = config.bind_addr();
    let deployment = Deployment::new(db, Arc::new(SystemClock), &config);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app(deployment))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install Ctrl+C handler: {e}");
        std::future::pending::<()>().await;
    }
}
