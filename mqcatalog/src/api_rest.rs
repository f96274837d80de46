//! Endpoints API REST pour la recherche dans le catalogue
//!
//! Route exposée : `GET /search?q=<texte>&limit=<n>&offset=<n>`

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::client::{CatalogSearch, SearchRequest};
use crate::error::CatalogError;
use crate::models::Track;

/// État partagé des handlers de recherche
#[derive(Clone)]
pub struct CatalogState {
    pub client: Arc<dyn CatalogSearch>,
}

/// Paramètres de recherche
///
/// `limit` et `offset` restent des chaînes : une valeur non numérique
/// retombe sur la valeur par défaut au lieu d'être rejetée.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SearchParams {
    /// Requête de recherche
    pub q: Option<String>,
    /// Alias de `q`
    pub query: Option<String>,
    /// Nombre de résultats (1 à 200, 20 par défaut)
    pub limit: Option<String>,
    /// Décalage (0 par défaut)
    pub offset: Option<String>,
}

/// Réponse de recherche
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    pub items: Vec<Track>,
    pub total: u64,
}

/// Réponse d'erreur REST générique.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Crée le router Axum avec l'endpoint de recherche
pub fn create_router(state: CatalogState) -> Router {
    Router::new()
        .route("/search", get(search))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/search",
    tag = "catalog",
    params(SearchParams),
    responses(
        (status = 200, description = "Pistes trouvées", body = SearchResponse),
        (status = 400, description = "Requête invalide", body = ErrorResponse),
        (status = 502, description = "Catalogue injoignable ou en erreur", body = ErrorResponse)
    )
)]
pub async fn search(
    State(state): State<CatalogState>,
    Query(params): Query<SearchParams>,
) -> Response {
    let query = params.q.as_deref().or(params.query.as_deref());

    let request = match SearchRequest::from_params(
        query,
        params.limit.as_deref(),
        params.offset.as_deref(),
    ) {
        Ok(request) => request,
        Err(err) => return map_error(err),
    };

    match state.client.search_tracks(&request).await {
        Ok(page) => (
            StatusCode::OK,
            Json(SearchResponse {
                items: page.items,
                total: page.total,
            }),
        )
            .into_response(),
        Err(err) => map_error(err),
    }
}

fn map_error(error: CatalogError) -> Response {
    let status = match &error {
        CatalogError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        CatalogError::Upstream(_) => {
            warn!("Qobuz search failed: {}", error);
            StatusCode::BAD_GATEWAY
        }
        CatalogError::Configuration(_) => {
            warn!("Qobuz client misconfigured: {}", error);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

/// Documentation OpenAPI pour l'API de recherche
#[derive(OpenApi)]
#[openapi(
    paths(search),
    components(schemas(SearchResponse, ErrorResponse, Track)),
    tags(
        (name = "catalog", description = "Recherche de pistes dans le catalogue Qobuz")
    )
)]
pub struct CatalogApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::models::{RawArtist, RawTrack, SearchPage};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Faux catalogue qui compte les appels
    struct FakeCatalog {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl CatalogSearch for FakeCatalog {
        async fn search(&self, request: &SearchRequest) -> Result<SearchPage<RawTrack>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CatalogError::Upstream("Qobuz request timed out".into()));
            }
            Ok(SearchPage {
                items: vec![RawTrack {
                    id: Some(format!("{}-{}", request.limit(), request.offset())),
                    title: Some(request.query().to_string()),
                    artist: Some(RawArtist {
                        id: None,
                        name: Some("Artist".into()),
                    }),
                    ..Default::default()
                }],
                total: 99,
            })
        }
    }

    fn app(fail: bool) -> (Router, Arc<FakeCatalog>) {
        let fake = Arc::new(FakeCatalog {
            calls: AtomicUsize::new(0),
            fail,
        });
        let router = create_router(CatalogState {
            client: fake.clone(),
        });
        (router, fake)
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_blank_query_does_not_reach_catalog() {
        let (router, fake) = app(false);
        let (status, body) = get(router, "/search?q=%20%20").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing 'q' query parameter.");
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_search_normalizes_and_clamps() {
        let (router, fake) = app(false);
        let (status, body) = get(router, "/search?q=%20blue%20&limit=abc&offset=-2").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 99);
        assert_eq!(body["items"][0]["id"], "20-0");
        assert_eq!(body["items"][0]["title"], "blue");
        assert_eq!(body["items"][0]["artist"], "Artist");
        assert!(body["items"][0]["cover"].is_null());
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_query_alias() {
        let (router, _) = app(false);
        let (status, body) = get(router, "/search?query=kind&limit=900").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"][0]["id"], "200-0");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let (router, _) = app(true);
        let (status, body) = get(router, "/search?q=x").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Qobuz request failed: Qobuz request timed out");
        assert!(body.get("items").is_none());
    }
}
