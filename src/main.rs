use anyhow::{Context, Result};
use haifriends_gateway::{
    config::AppConfig,
    routes::{mount_table::RouteGroups, routes::routes},
    services::storage_service::StorageService,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("haifriends_gateway=info,tower_http=info")),
        )
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;

    tracing::info!("Starting haifriends-gateway with config: {:?}", cfg);

    // --- Initialize storage backend ---
    let storage = StorageService::from_config(&cfg).await?;
    tracing::info!(
        "Storage backend `{}` ready at {}",
        storage.kind(),
        storage.work_dir().display()
    );

    // --- Build router ---
    let app = routes(storage, RouteGroups::new(), &cfg.cors_allowed_origins);

    // --- Start server ---
    // No retry or fallback address: a bind failure ends the process.
    let addr = cfg.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding listener on {}", addr))?;

    tracing::info!("API running on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
