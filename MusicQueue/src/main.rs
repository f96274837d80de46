use mqcatalog::CatalogServerExt;
use mqqueue::QueueServerExt;
use mqserver::{LoggingOptions, ServerBuilder};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut server = ServerBuilder::new_configured().build();

    // ========== PHASE 1 : Logs ==========
    server.init_logging(LoggingOptions::from_config()).await?;

    let config = mqconfig::get_config();
    info!("Configuration loaded from {}", config.directory());

    // ========== PHASE 2 : API ==========
    server.add_handler("/health", || async { "ok" }).await;

    info!("🔎 Initializing catalog search...");
    if let Err(e) = server.init_catalog_api_configured().await {
        // Recherche facultative
        warn!("⚠️ Catalog search unavailable: {}", e);
    }

    info!("🎵 Initializing shared queues...");
    server.init_queue_api_configured().await?;

    // ========== PHASE 3 : Démarrage du serveur ==========
    info!("🌐 Starting HTTP server...");
    server.start().await?;

    let info = server.info();
    info!("✅ {} is ready at http://{}:{}", info.name, info.base_url, info.http_port);
    info!("Press Ctrl+C to stop...");
    server.wait().await;

    Ok(())
}
