//! Normalisation des résultats bruts du catalogue en [`Track`]
//!
//! La normalisation ne peut pas échouer : chaque donnée manquante est
//! remplacée par une valeur de repli.

use crate::models::{RawImage, RawTrack, Track};
use uuid::Uuid;

pub const UNKNOWN_TITLE: &str = "Unknown title";
pub const UNKNOWN_ARTIST: &str = "Unknown artist";

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

fn small_image(image: Option<&RawImage>) -> Option<&str> {
    image.and_then(|i| non_empty(i.small.as_ref()))
}

/// Choisit la pochette selon la précédence :
/// image de l'album (small) → `album.cover` → image de la piste (small) → `cover_url`.
pub fn cover_of(track: &RawTrack) -> Option<String> {
    let album = track.album.as_ref();

    small_image(album.and_then(|a| a.image.as_ref()))
        .or_else(|| album.and_then(|a| non_empty(a.cover.as_ref())))
        .or_else(|| small_image(track.image.as_ref()))
        .or_else(|| non_empty(track.cover_url.as_ref()))
        .map(str::to_string)
}

/// Convertit un résultat brut en piste canonique
pub fn normalize_track(track: &RawTrack) -> Track {
    let artist = non_empty(track.artist.as_ref().and_then(|a| a.name.as_ref()))
        .or_else(|| non_empty(track.performer.as_ref().and_then(|p| p.name.as_ref())))
        .unwrap_or(UNKNOWN_ARTIST);

    Track {
        id: track
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        title: non_empty(track.title.as_ref())
            .unwrap_or(UNKNOWN_TITLE)
            .to_string(),
        artist: artist.to_string(),
        album: track.album.as_ref().and_then(|a| a.title.clone()),
        cover: cover_of(track),
    }
}
