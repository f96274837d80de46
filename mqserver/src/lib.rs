//! # mqserver - Serveur web haut niveau basé sur Axum
//!
//! Cette crate fournit une abstraction simple pour créer le serveur HTTP de
//! MusicQueue avec Axum. Les autres crates (`mqcatalog`, `mqqueue`) y ajoutent
//! leurs routes via des traits d'extension, sans que `mqserver` les connaisse.
//!
//! ## Fonctionnalités
//!
//! - **Routes et sous-routers** : `add_handler()`, `add_router()`
//! - **Server-Sent Events** : logs en temps réel via `/log-sse`
//! - **Documentation OpenAPI** : Swagger UI par API avec `add_openapi_doc()`
//! - **Arrêt gracieux** : arrêt propre sur Ctrl+C
//!
//! ## Architecture
//!
//! - [`server`] : serveur principal et builder
//! - [`logs`] : buffer de logs, couche tracing et routes SSE
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use mqserver::{ServerBuilder, logs::LoggingOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut server = ServerBuilder::new_configured().build();
//!     server.init_logging(LoggingOptions::from_config()).await?;
//!
//!     server.add_handler("/health", || async { "ok" }).await;
//!
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod logs;
pub mod server;

pub use logs::{LogState, LoggingOptions, SseLayer, log_dump, log_sse};
pub use server::{Server, ServerBuilder, ServerInfo};
