//! # Module Server - API de haut niveau pour Axum
//!
//! Ce module fournit une abstraction simple pour créer le serveur HTTP, en
//! cachant la configuration du routage et du cycle de vie.
//!
//! ## Fonctionnalités
//!
//! - **Handlers** : ajoutez un endpoint avec `add_handler()`
//! - **Handlers avec état** : SSE, JSON, etc. avec `add_handler_with_state()`
//! - **Sous-routers** : montez un router complet avec `add_router()`
//! - **Documentation API** : Swagger UI avec `add_openapi_doc()`
//! - **Gestion gracieuse** : arrêt propre sur Ctrl+C

use crate::logs::{
    LogState, LoggingOptions, LogsApiDoc, create_logs_router, init_logging, log_dump, log_sse,
};
use anyhow::{Context, Result};
use axum::Router;
use axum::handler::Handler;
use axum::routing::get;
use mqconfig::get_config;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{signal, sync::RwLock, task::JoinHandle};
use tracing::{error, info, warn};
use utoipa_swagger_ui::SwaggerUi;

/// Nom utilisé par les serveurs construits depuis la configuration
pub const DEFAULT_SERVER_NAME: &str = "MusicQueue";

/// Info serveur sérialisable
#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct ServerInfo {
    pub name: String,
    pub base_url: String,
    pub http_port: u16,
}

/// Serveur principal
pub struct Server {
    name: String,
    base_url: String,
    http_port: u16,
    router: Arc<RwLock<Router>>,
    join_handle: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
    log_state: Option<LogState>,
}

impl Server {
    /// Crée une nouvelle instance de serveur
    ///
    /// # Arguments
    ///
    /// * `name` - Nom du serveur (pour les logs)
    /// * `base_url` - Hôte annoncé (ex: "127.0.0.1")
    /// * `http_port` - Port HTTP à écouter (0 pour un port libre)
    ///
    /// # Exemple
    ///
    /// ```rust
    /// # use mqserver::Server;
    /// let server = Server::new("MyAPI", "127.0.0.1", 3000);
    /// ```
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http_port,
            router: Arc::new(RwLock::new(Router::new())),
            join_handle: None,
            local_addr: None,
            log_state: None,
        }
    }

    pub fn new_configured() -> Self {
        let config = get_config();
        Self::new(
            DEFAULT_SERVER_NAME,
            config.get_base_url(),
            config.get_http_port(),
        )
    }

    /// Ajoute un handler GET sans état
    ///
    /// # Exemple
    ///
    /// ```rust,no_run
    /// # use mqserver::Server;
    /// # #[tokio::main]
    /// # async fn main() {
    /// # let mut server = Server::new("Test", "127.0.0.1", 3000);
    /// server.add_handler("/health", || async { "ok" }).await;
    /// # }
    /// ```
    pub async fn add_handler<H, T>(&mut self, path: &str, handler: H)
    where
        H: Handler<T, ()> + Clone + 'static,
        T: 'static,
    {
        let route = Router::new().route(path, get(handler));
        self.merge(route).await;
    }

    /// Ajoute un handler GET avec état
    pub async fn add_handler_with_state<H, T, S>(&mut self, path: &str, handler: H, state: S)
    where
        H: Handler<T, S> + Clone + 'static,
        T: 'static,
        S: Clone + Send + Sync + 'static,
    {
        let route = Router::new().route(path, get(handler)).with_state(state);
        self.merge(route).await;
    }

    /// Ajoute un sous-router au serveur
    ///
    /// - Si `path` est "/", merge directement au router principal
    /// - Sinon, nest le router sous le chemin donné
    pub async fn add_router(&mut self, path: &str, sub_router: Router) {
        if path == "/" {
            self.merge(sub_router).await;
            return;
        }

        let normalized = format!("/{}", path.trim_start_matches('/'));
        let mut r = self.router.write().await;
        *r = std::mem::take(&mut *r).nest(&normalized, sub_router);
    }

    /// Publie la documentation OpenAPI d'une API déjà montée
    ///
    /// - `/swagger-ui/{name}` affiche la documentation Swagger
    /// - `/api-docs/{name}.json` fournit la spécification OpenAPI
    pub async fn add_openapi_doc(&mut self, openapi: utoipa::openapi::OpenApi, name: &str) {
        let swagger_path: &'static str =
            Box::leak(format!("/swagger-ui/{}", name).into_boxed_str());
        let openapi_json_path: &'static str =
            Box::leak(format!("/api-docs/{}.json", name).into_boxed_str());

        let swagger = SwaggerUi::new(swagger_path).url(openapi_json_path, openapi);
        self.merge(Router::new().merge(swagger)).await;
    }

    async fn merge(&mut self, route: Router) {
        let mut r = self.router.write().await;
        *r = std::mem::take(&mut *r).merge(route);
    }

    /// Retourne une copie du router courant (tests, intégration)
    pub async fn router(&self) -> Router {
        self.router.read().await.clone()
    }

    /// Démarre le serveur HTTP
    ///
    /// Le port est réservé avant le retour, une erreur de bind est donc
    /// remontée à l'appelant. Ctrl+C déclenche l'arrêt.
    ///
    /// # Exemple
    ///
    /// ```rust,no_run
    /// # use mqserver::Server;
    /// # #[tokio::main]
    /// # async fn main() -> anyhow::Result<()> {
    /// # let mut server = Server::new("Test", "127.0.0.1", 3000);
    /// server.start().await?;
    /// server.wait().await;  // Attend Ctrl+C
    /// # Ok(())
    /// # }
    /// ```
    pub async fn start(&mut self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.http_port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind HTTP port {}", self.http_port))?;
        let local_addr = listener.local_addr()?;
        self.local_addr = Some(local_addr);

        info!(
            "Server {} running at http://{}:{}",
            self.name,
            self.base_url,
            local_addr.port()
        );

        let router = self.router.read().await.clone();
        let server_task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router.into_make_service()).await {
                error!("HTTP server stopped: {}", e);
            }
        });

        let shutdown_task = tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => info!("Ctrl+C reçu, arrêt gracieux"),
                Err(e) => {
                    warn!("Unable to listen for Ctrl+C: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        });

        self.join_handle = Some(tokio::spawn(async move {
            tokio::select! {
                _ = server_task => {},
                _ = shutdown_task => {},
            }
        }));

        Ok(())
    }

    /// Attend la fin du serveur
    pub async fn wait(&mut self) {
        if let Some(h) = self.join_handle.take() {
            let _ = h.await;
        }
    }

    /// Adresse effectivement écoutée, une fois le serveur démarré
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Récupère les infos du serveur
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            name: self.name.clone(),
            base_url: self.base_url.clone(),
            http_port: self
                .local_addr
                .map(|a| a.port())
                .unwrap_or(self.http_port),
        }
    }

    /// État des logs, si `init_logging` a été appelé
    pub fn log_state(&self) -> Option<&LogState> {
        self.log_state.as_ref()
    }

    /// Initialise le système de logging et enregistre les routes de logs
    ///
    /// Configure le subscriber tracing global puis enregistre les routes
    /// `/log-sse`, `/log-dump` et `/api/log_setup`.
    ///
    /// # Exemple
    ///
    /// ```rust,no_run
    /// # use mqserver::{ServerBuilder, logs::LoggingOptions};
    /// # #[tokio::main]
    /// # async fn main() -> anyhow::Result<()> {
    /// let mut server = ServerBuilder::new_configured().build();
    ///
    /// server.init_logging(LoggingOptions {
    ///     buffer_capacity: 1000,
    ///     enable_console: false,
    ///     ..LoggingOptions::default()
    /// }).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn init_logging(&mut self, options: LoggingOptions) -> Result<()> {
        let log_state = init_logging(options)?;

        self.add_handler_with_state("/log-sse", log_sse, log_state.clone())
            .await;
        self.add_handler_with_state("/log-dump", log_dump, log_state.clone())
            .await;
        self.add_router("/", create_logs_router(log_state.clone()))
            .await;
        self.add_openapi_doc(<LogsApiDoc as utoipa::OpenApi>::openapi(), "logs")
            .await;

        self.log_state = Some(log_state);
        Ok(())
    }
}

/// Builder pattern
pub struct ServerBuilder {
    name: String,
    base_url: String,
    http_port: u16,
}

impl ServerBuilder {
    /// Crée un nouveau builder
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http_port,
        }
    }

    pub fn new_configured() -> Self {
        let config = get_config();
        Self {
            name: DEFAULT_SERVER_NAME.to_string(),
            base_url: config.get_base_url(),
            http_port: config.get_http_port(),
        }
    }

    /// Change le port HTTP
    pub fn http_port(mut self, port: u16) -> Self {
        self.http_port = port;
        self
    }

    /// Construit le serveur
    ///
    /// ```rust
    /// # use mqserver::ServerBuilder;
    /// let server = ServerBuilder::new("MyAPI", "127.0.0.1", 3000).build();
    /// ```
    pub fn build(self) -> Server {
        Server::new(self.name, self.base_url, self.http_port)
    }
}
