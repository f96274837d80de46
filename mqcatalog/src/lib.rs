//! # mqcatalog - Recherche dans le catalogue Qobuz pour MusicQueue
//!
//! Cette crate interroge l'API de recherche Qobuz et transforme les résultats
//! bruts en pistes canoniques ([`Track`]).
//!
//! ## Architecture
//!
//! - `api` : couche bas-niveau (requête HTTP unique, timeouts, classification des erreurs)
//! - `client` : validation des paramètres et trait [`CatalogSearch`]
//! - `models` : résultats bruts (`RawTrack`) et piste canonique
//! - `normalize` : conversion `RawTrack` → `Track`, sans échec possible
//! - `api_rest` / `server_ext` : route `GET /search` (feature `mqserver`)
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use mqcatalog::{CatalogSearch, QobuzClient, SearchRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = QobuzClient::from_config()?;
//!     let request = SearchRequest::new("Miles Davis", 20, 0)?;
//!
//!     let page = client.search_tracks(&request).await?;
//!     for track in page.items {
//!         println!("{} - {}", track.artist, track.title);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Gestion des erreurs
//!
//! Un échec de transport (timeout, connexion refusée) et une réponse hors 2xx
//! donnent tous deux [`CatalogError::Upstream`], avec une cause courte.
//! Aucune nouvelle tentative n'est faite.

pub mod api;
pub mod client;
pub mod error;
pub mod models;
pub mod normalize;

// Extension mqserver (feature-gated)
#[cfg(feature = "mqserver")]
pub mod api_rest;

#[cfg(feature = "mqserver")]
pub mod server_ext;

pub use api::ApiOptions;
pub use client::{CatalogSearch, DEFAULT_LIMIT, MAX_LIMIT, QobuzClient, SearchRequest};
pub use error::{CatalogError, Result};
pub use models::{RawAlbum, RawArtist, RawImage, RawTrack, SearchPage, Track};
pub use normalize::normalize_track;

#[cfg(feature = "mqserver")]
pub use server_ext::CatalogServerExt;
