//! Couche d'accès à l'API REST Qobuz
//!
//! Ce module fournit une interface bas-niveau pour communiquer avec l'API Qobuz.
//! Une seule tentative par requête : aucun retry n'est fait ici.

pub mod catalog;

use crate::error::{CatalogError, Result};
use reqwest::{Client, Response, header};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// URL de base de l'API Qobuz
pub const API_BASE_URL: &str = "https://www.qobuz.com/api.json/0.2";

/// Timeout total d'une requête
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout d'établissement de la connexion
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Options de construction de l'API bas-niveau
#[derive(Debug, Clone)]
pub struct ApiOptions {
    pub app_id: String,
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl ApiOptions {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            base_url: API_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn timeouts(mut self, timeout: Duration, connect_timeout: Duration) -> Self {
        self.timeout = timeout;
        self.connect_timeout = connect_timeout;
        self
    }
}

/// Client API bas-niveau pour communiquer avec Qobuz
pub struct QobuzApi {
    /// Client HTTP
    client: Client,
    /// App ID pour l'authentification
    app_id: String,
    /// URL de base (surchargée dans les tests)
    base_url: String,
}

impl QobuzApi {
    /// Crée une nouvelle instance de l'API
    pub fn new(options: ApiOptions) -> Result<Self> {
        if options.app_id.trim().is_empty() {
            return Err(CatalogError::Configuration(
                "QOBUZ_APP_ID is required.".to_string(),
            ));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| CatalogError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            app_id: options.app_id,
            base_url: options.base_url,
        })
    }

    /// Retourne l'App ID
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Retourne l'URL de base
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Effectue une requête GET à l'API
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);

        debug!("GET {} with {} params", url, params.len());

        let response = self
            .client
            .get(&url)
            .query(&[("app_id", self.app_id.as_str())])
            .query(params)
            .send()
            .await
            .map_err(|e| {
                warn!("Qobuz transport error: {}", e);
                CatalogError::transport(&e)
            })?;

        self.handle_response(response).await
    }

    /// Traite la réponse HTTP
    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();

        debug!("Response status: {}", status);

        if !status.is_success() {
            warn!("Qobuz API error ({})", status.as_u16());
            return Err(CatalogError::from_status_code(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(|e| {
            warn!("Failed to read Qobuz response: {}", e);
            CatalogError::transport(&e)
        })?;

        serde_json::from_slice(&bytes).map_err(|e| {
            warn!("Failed to parse response: {}", e);
            CatalogError::Upstream("Qobuz returned an invalid payload".to_string())
        })
    }
}
