//! Client principal pour interroger le catalogue
//!
//! Ce module fournit la validation des paramètres de recherche et le client
//! haut-niveau qui renvoie des pistes normalisées.

use crate::api::{ApiOptions, QobuzApi};
use crate::error::{CatalogError, Result};
use crate::models::{RawTrack, SearchPage, Track};
use crate::normalize::normalize_track;
use async_trait::async_trait;
use mqconfig::Config;
use std::num::IntErrorKind;
use std::time::Duration;
use tracing::info;

/// Nombre de résultats par défaut
pub const DEFAULT_LIMIT: u32 = 20;

/// Nombre maximum de résultats par page
pub const MAX_LIMIT: u32 = 200;

/// Lit un entier ; un nombre hors de `i64` est saturé plutôt qu'ignoré
fn parse_integer(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| match s.trim().parse::<i64>() {
        Ok(n) => Some(n),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    })
}

/// Convertit la valeur brute de `limit` : défaut si absente ou non numérique,
/// puis bornée à `[1, MAX_LIMIT]`.
pub fn parse_limit(raw: Option<&str>) -> u32 {
    parse_integer(raw)
        .unwrap_or(DEFAULT_LIMIT as i64)
        .clamp(1, MAX_LIMIT as i64) as u32
}

/// Convertit la valeur brute de `offset` : 0 si absente ou non numérique,
/// jamais négative.
pub fn parse_offset(raw: Option<&str>) -> u64 {
    parse_integer(raw).unwrap_or(0).max(0) as u64
}

/// Requête de recherche validée
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    query: String,
    limit: u32,
    offset: u64,
}

impl SearchRequest {
    /// Construit une requête en bornant `limit` et `offset`.
    ///
    /// Échoue si la requête est vide après suppression des espaces.
    pub fn new(query: &str, limit: i64, offset: i64) -> Result<Self> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CatalogError::InvalidQuery(
                "Query cannot be blank.".to_string(),
            ));
        }

        Ok(Self {
            query: query.to_string(),
            limit: limit.clamp(1, MAX_LIMIT as i64) as u32,
            offset: offset.max(0) as u64,
        })
    }

    /// Construit une requête depuis des paramètres HTTP bruts
    pub fn from_params(
        query: Option<&str>,
        limit: Option<&str>,
        offset: Option<&str>,
    ) -> Result<Self> {
        let query = query.map(str::trim).unwrap_or_default();
        if query.is_empty() {
            return Err(CatalogError::InvalidQuery(
                "Missing 'q' query parameter.".to_string(),
            ));
        }

        Ok(Self {
            query: query.to_string(),
            limit: parse_limit(limit),
            offset: parse_offset(offset),
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// Source de résultats de recherche
///
/// Le serveur REST ne dépend que de ce trait, ce qui permet de substituer le
/// client réel dans les tests.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    /// Recherche brute : les résultats ne sont pas encore normalisés
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage<RawTrack>>;

    /// Recherche et normalise les résultats
    async fn search_tracks(&self, request: &SearchRequest) -> Result<SearchPage<Track>> {
        let page = self.search(request).await?;
        Ok(page.map(|raw| normalize_track(&raw)))
    }
}

/// Client Qobuz haut-niveau
pub struct QobuzClient {
    /// API bas-niveau
    api: QobuzApi,
}

impl QobuzClient {
    /// Crée un client avec un App ID et les options par défaut
    pub fn new(app_id: &str) -> Result<Self> {
        Self::with_options(ApiOptions::new(app_id))
    }

    /// Crée un client avec des options explicites
    pub fn with_options(options: ApiOptions) -> Result<Self> {
        info!(
            "Creating Qobuz client for {} (timeout: {:?}, connect: {:?})",
            options.base_url, options.timeout, options.connect_timeout
        );
        Ok(Self {
            api: QobuzApi::new(options)?,
        })
    }

    /// Crée un client en utilisant la configuration de mqconfig
    ///
    /// # Exemple
    ///
    /// ```rust,no_run
    /// use mqcatalog::QobuzClient;
    ///
    /// let client = QobuzClient::from_config()?;
    /// # Ok::<(), mqcatalog::CatalogError>(())
    /// ```
    pub fn from_config() -> Result<Self> {
        let config = mqconfig::get_config();
        Self::from_config_obj(config.as_ref())
    }

    /// Crée un client depuis un objet Config spécifique
    pub fn from_config_obj(config: &Config) -> Result<Self> {
        let app_id = config.get_qobuz_app_id()?;
        let timeout = Duration::from_secs(config.get_catalog_timeout_secs()? as u64);
        let connect_timeout =
            Duration::from_secs(config.get_catalog_connect_timeout_secs()? as u64);

        Self::with_options(
            ApiOptions::new(app_id)
                .base_url(config.get_qobuz_api_base())
                .timeouts(timeout, connect_timeout),
        )
    }

    /// Accès à l'API bas-niveau
    pub fn api(&self) -> &QobuzApi {
        &self.api
    }
}

#[async_trait]
impl CatalogSearch for QobuzClient {
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage<RawTrack>> {
        self.api
            .search_tracks(request.query(), request.limit(), request.offset())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_defaults_and_clamping() {
        assert_eq!(parse_limit(None), 20);
        assert_eq!(parse_limit(Some("abc")), 20);
        assert_eq!(parse_limit(Some("")), 20);
        assert_eq!(parse_limit(Some("12.5")), 20);
        assert_eq!(parse_limit(Some("0")), 1);
        assert_eq!(parse_limit(Some("-4")), 1);
        assert_eq!(parse_limit(Some("500")), 200);
        assert_eq!(parse_limit(Some(" 50 ")), 50);
        assert_eq!(parse_limit(Some("200")), 200);
        assert_eq!(parse_limit(Some("1")), 1);
        assert_eq!(parse_limit(Some("99999999999999999999")), 200);
        assert_eq!(parse_limit(Some("-99999999999999999999")), 1);
    }

    #[test]
    fn test_offset_defaults_and_clamping() {
        assert_eq!(parse_offset(None), 0);
        assert_eq!(parse_offset(Some("x")), 0);
        assert_eq!(parse_offset(Some("-10")), 0);
        assert_eq!(parse_offset(Some("40")), 40);
        assert_eq!(parse_offset(Some("99999999999999999999")), i64::MAX as u64);
        assert_eq!(parse_offset(Some("-99999999999999999999")), 0);
    }

    #[test]
    fn test_blank_query_is_rejected() {
        assert!(matches!(
            SearchRequest::from_params(Some("   "), None, None),
            Err(CatalogError::InvalidQuery(_))
        ));
        assert!(matches!(
            SearchRequest::from_params(None, None, None),
            Err(CatalogError::InvalidQuery(_))
        ));
        assert!(matches!(
            SearchRequest::new("\t", 10, 0),
            Err(CatalogError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_request_is_trimmed_and_clamped() {
        let request = SearchRequest::new("  miles  ", 1000, -3).unwrap();
        assert_eq!(request.query(), "miles");
        assert_eq!(request.limit(), MAX_LIMIT);
        assert_eq!(request.offset(), 0);
    }
}
