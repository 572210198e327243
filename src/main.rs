mod archive;
mod cache;
mod catalog;
mod config;
mod db;
mod error;
mod handlers;
mod heat;
mod models;
mod render;
mod router;
mod services;
mod utils;

use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use archive::{ArchiveBuilder, IsoStrategy};
use cache::Cache;
use catalog::{MemoryCatalog, TemplateCatalog};
use config::Config;
use db::Store;
use services::bootstrap::BootstrapService;

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub bootstrap: BootstrapService,
    pub cache: Cache,
}

impl AppState {
    pub fn new(config: Config, catalog: Arc<dyn TemplateCatalog>) -> Self {
        let archives = ArchiveBuilder::new(
            &config.archive_dir,
            IsoStrategy::new(&config.iso_tool, &config.iso_volume_id),
        );
        let bootstrap = BootstrapService::new(catalog, config.template_defaults(), archives);
        Self {
            config,
            bootstrap,
            cache: Cache::new(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bootstrapper=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let cfg = Config::load();
    tracing::info!("Starting Bootstrapper");
    tracing::info!("Templates Dir: {}", cfg.templates_dir);
    tracing::info!("Archive Dir: {}", cfg.archive_dir);
    tracing::info!("ISO Tool: {}", cfg.iso_tool);
    tracing::info!("Listen: {}", cfg.listen_addr);

    // Initialize template catalog
    let catalog: Arc<dyn TemplateCatalog> = if cfg.db_path.is_empty() {
        tracing::warn!("DB_PATH is empty - templates are kept in memory only");
        Arc::new(MemoryCatalog::new())
    } else {
        let store = Store::with_pool_size(&cfg.db_path, cfg.db_max_connections).await?;
        tracing::info!("Database: {} (pool_size={})", cfg.db_path, cfg.db_max_connections);
        Arc::new(store)
    };

    catalog::seeds::seed_default_templates(catalog.as_ref()).await?;
    match catalog::import_templates_from_dir(catalog.as_ref(), Path::new(&cfg.templates_dir)).await {
        Ok(count) => tracing::info!("Imported {} templates from {}", count, cfg.templates_dir),
        Err(e) => tracing::warn!("Failed to import templates from {}: {:#}", cfg.templates_dir, e),
    }

    let state = Arc::new(AppState::new(cfg.clone(), catalog));

    // Build router
    let app = router::build(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    tracing::info!("Bootstrapper listening on {}", cfg.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Bootstrapper shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => { sig.recv().await; }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
