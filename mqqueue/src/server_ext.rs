//! Extension de mqserver::Server pour les files partagées

use anyhow::Result;
use mqserver::Server;
use tracing::info;
use utoipa::OpenApi;

use crate::api::{QueueApiDoc, create_router};
use crate::manager::QueueManager;

/// Trait d'extension pour monter l'API des files sur un serveur mqserver
///
/// # Exemple
///
/// ```rust,no_run
/// use mqqueue::QueueServerExt;
/// use mqserver::ServerBuilder;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let mut server = ServerBuilder::new_configured().build();
///     let manager = server.init_queue_api_configured().await?;
///     server.start().await?;
///     server.wait().await;
///     Ok(())
/// }
/// ```
pub trait QueueServerExt {
    /// Enregistre les routes `/queue*` avec le manager fourni
    async fn init_queue_api(&mut self, manager: QueueManager) -> Result<()>;

    /// Ouvre la base configurée dans mqconfig puis enregistre les routes
    async fn init_queue_api_configured(&mut self) -> Result<QueueManager>;
}

impl QueueServerExt for Server {
    async fn init_queue_api(&mut self, manager: QueueManager) -> Result<()> {
        self.add_router("/", create_router(manager)).await;
        self.add_openapi_doc(QueueApiDoc::openapi(), "queue").await;
        info!("Queue API registered at /queue");
        Ok(())
    }

    async fn init_queue_api_configured(&mut self) -> Result<QueueManager> {
        let manager = QueueManager::from_config()?;
        self.init_queue_api(manager.clone()).await?;
        Ok(manager)
    }
}
