//! Cerca Server — application entry point.

use cerca_db::{DbManager, run_migrations};
use cerca_server::{AppState, ServerConfig, build_router};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("cerca=info".parse()?))
        .json()
        .init();

    tracing::info!("Starting cerca server...");

    let config = ServerConfig::from_env();
    let db = DbManager::connect(&config.db).await?.into_client();
    run_migrations(&db).await?;

    let app = build_router(AppState::new(db, &config));
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!("cerca server stopped.");
    Ok(())
}
