//! Module d'accès au catalogue Qobuz (recherche de pistes)

use super::QobuzApi;
use crate::error::Result;
use crate::models::{RawTrack, SearchPage, lenient};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Réponse paginée de l'API
#[derive(Debug, Default, Deserialize)]
struct PaginatedResponse {
    #[serde(default)]
    items: Vec<Value>,
    #[serde(default, deserialize_with = "lenient")]
    total: Option<u64>,
}

/// Réponse de l'endpoint /search/getResults
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default, deserialize_with = "lenient")]
    tracks: Option<PaginatedResponse>,
}

impl QobuzApi {
    /// Recherche des pistes dans le catalogue
    ///
    /// Les paramètres doivent déjà être validés et bornés par l'appelant.
    pub async fn search_tracks(
        &self,
        query: &str,
        limit: u32,
        offset: u64,
    ) -> Result<SearchPage<RawTrack>> {
        debug!(
            "Searching for '{}' (limit: {}, offset: {})",
            query, limit, offset
        );

        let limit = limit.to_string();
        let offset = offset.to_string();
        let params = [
            ("query", query),
            ("limit", limit.as_str()),
            ("offset", offset.as_str()),
        ];

        let response: SearchResponse = self.get("/search/getResults", &params).await?;
        let section = response.tracks.unwrap_or_default();

        let items: Vec<RawTrack> = section.items.into_iter().map(RawTrack::from_value).collect();
        // Un total nul ou absent est remplacé par le nombre d'éléments reçus
        let total = section
            .total
            .filter(|t| *t > 0)
            .unwrap_or(items.len() as u64);

        Ok(SearchPage { items, total })
    }
}
