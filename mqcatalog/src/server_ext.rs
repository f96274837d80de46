//! Extension de mqserver::Server pour intégrer la recherche catalogue
//!
//! `mqserver` définit un serveur HTTP générique ; `mqcatalog` l'étend avec
//! ses routes via ce trait, sans que le serveur ait besoin de le connaître.

use crate::api_rest::{CatalogApiDoc, CatalogState, create_router};
use crate::client::{CatalogSearch, QobuzClient};
use anyhow::Result;
use mqserver::Server;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;

/// Trait d'extension pour ajouter la recherche à un serveur mqserver
///
/// # Exemple
///
/// ```rust,no_run
/// use mqcatalog::CatalogServerExt;
/// use mqserver::ServerBuilder;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let mut server = ServerBuilder::new_configured().build();
///     server.init_catalog_api_configured().await?;
///     server.start().await?;
///     server.wait().await;
///     Ok(())
/// }
/// ```
pub trait CatalogServerExt {
    /// Enregistre `GET /search` avec la source de résultats fournie
    async fn init_catalog_api(&mut self, client: Arc<dyn CatalogSearch>) -> Result<()>;

    /// Construit le client Qobuz depuis mqconfig et enregistre `GET /search`
    async fn init_catalog_api_configured(&mut self) -> Result<Arc<QobuzClient>>;
}

impl CatalogServerExt for Server {
    async fn init_catalog_api(&mut self, client: Arc<dyn CatalogSearch>) -> Result<()> {
        let router = create_router(CatalogState { client });
        self.add_router("/", router).await;
        self.add_openapi_doc(CatalogApiDoc::openapi(), "catalog").await;
        info!("Catalog search API registered at /search");
        Ok(())
    }

    async fn init_catalog_api_configured(&mut self) -> Result<Arc<QobuzClient>> {
        let client = Arc::new(QobuzClient::from_config()?);
        self.init_catalog_api(client.clone()).await?;
        Ok(client)
    }
}
