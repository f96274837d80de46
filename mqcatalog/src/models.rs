//! Structures de données pour représenter les résultats du catalogue
//!
//! Les types `Raw*` reflètent la forme lâche des réponses Qobuz : tous les
//! champs sont optionnels et un champ mal typé est ignoré au lieu de faire
//! échouer la désérialisation de toute la page.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Désérialiseur flexible pour les IDs qui peuvent être des strings ou des integers
pub(crate) fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Désérialiseur tolérant : une valeur du mauvais type devient `None`
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// Image telle que renvoyée par Qobuz (plusieurs tailles)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawImage {
    #[serde(default, deserialize_with = "lenient")]
    pub small: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub large: Option<String>,
}

/// Artiste ou interprète d'un résultat brut
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawArtist {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

/// Album d'un résultat brut
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawAlbum {
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub image: Option<RawImage>,
    #[serde(default, deserialize_with = "lenient")]
    pub cover: Option<String>,
}

/// Un résultat de recherche brut (une piste Qobuz)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawTrack {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub artist: Option<RawArtist>,
    #[serde(default, deserialize_with = "lenient")]
    pub performer: Option<RawArtist>,
    #[serde(default, deserialize_with = "lenient")]
    pub album: Option<RawAlbum>,
    #[serde(default, deserialize_with = "lenient")]
    pub image: Option<RawImage>,
    #[serde(default, deserialize_with = "lenient")]
    pub cover_url: Option<String>,
}

impl RawTrack {
    /// Construit un résultat brut depuis une valeur JSON quelconque.
    ///
    /// Une valeur qui n'est pas un objet donne un résultat vide.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}

/// Piste canonique, indépendante de la forme du catalogue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "mqserver", derive(utoipa::ToSchema))]
pub struct Track {
    /// Identifiant de la piste dans le catalogue (ou UUID généré)
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    /// URL de la pochette
    pub cover: Option<String>,
}

/// Une page de résultats de recherche
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchPage<T> {
    pub items: Vec<T>,
    /// Total annoncé par le catalogue, ou nombre d'éléments renvoyés
    pub total: u64,
}

impl<T> SearchPage<T> {
    /// Transforme les éléments de la page en conservant le total
    pub fn map<U, F>(self, f: F) -> SearchPage<U>
    where
        F: FnMut(T) -> U,
    {
        SearchPage {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_and_string_ids() {
        let a = RawTrack::from_value(json!({"id": 42}));
        let b = RawTrack::from_value(json!({"id": "abc"}));
        let c = RawTrack::from_value(json!({"id": null}));
        assert_eq!(a.id.as_deref(), Some("42"));
        assert_eq!(b.id.as_deref(), Some("abc"));
        assert_eq!(c.id, None);
    }

    #[test]
    fn test_mistyped_fields_are_ignored() {
        let track = RawTrack::from_value(json!({
            "id": 7,
            "title": 12,
            "artist": "not an object",
            "album": {"title": "Blue", "image": "oops"}
        }));
        assert_eq!(track.id.as_deref(), Some("7"));
        assert_eq!(track.title, None);
        assert_eq!(track.artist, None);
        let album = track.album.unwrap();
        assert_eq!(album.title.as_deref(), Some("Blue"));
        assert_eq!(album.image, None);
    }

    #[test]
    fn test_non_object_value_gives_empty_track() {
        assert_eq!(RawTrack::from_value(json!("nope")), RawTrack::default());
    }
}
