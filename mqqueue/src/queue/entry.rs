//! Entrée de file et horloge d'ajout monotone

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::error::{Error, Result};

static LAST_ADDED_AT: AtomicI64 = AtomicI64::new(0);

/// Un morceau placé dans une file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    /// Identifiant de l'entrée (`queued_id` côté HTTP)
    pub id: i64,
    pub queue_id: i64,
    /// Identifiant du morceau dans le catalogue
    pub track_id: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub cover: Option<String>,
    /// Instant d'ajout, strictement croissant entre deux ajouts
    pub created_at: SystemTime,
}

impl QueueEntry {
    /// Retourne le timestamp en nanosecondes depuis epoch
    pub fn created_at_nanos(&self) -> i64 {
        to_nanos(self.created_at)
    }
}

/// Morceau à ajouter, tel que reçu du client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewEntry {
    pub track_id: Option<String>,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub cover: Option<String>,
}

impl NewEntry {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            ..Default::default()
        }
    }

    pub fn with_track_id(mut self, track_id: impl Into<String>) -> Self {
        self.track_id = Some(track_id.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_cover(mut self, cover: impl Into<String>) -> Self {
        self.cover = Some(cover.into());
        self
    }

    /// Valide et nettoie l'entrée avant insertion.
    ///
    /// Titre et artiste sont obligatoires après suppression des espaces ;
    /// les champs optionnels vides deviennent absents.
    pub(crate) fn validate(self) -> Result<NewEntry> {
        let title = self.title.trim();
        let artist = self.artist.trim();
        if title.is_empty() || artist.is_empty() {
            return Err(Error::Validation(
                "Title and artist are required.".to_string(),
            ));
        }

        Ok(NewEntry {
            track_id: Some(
                non_empty(self.track_id).unwrap_or_else(|| Uuid::new_v4().to_string()),
            ),
            title: title.to_string(),
            artist: artist.to_string(),
            album: non_empty(self.album),
            cover: non_empty(self.cover),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn to_nanos(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64
}

pub(crate) fn from_nanos(nanos: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_nanos(nanos.max(0) as u64)
}

/// Horloge strictement monotone : deux appels ne renvoient jamais la même valeur
pub(crate) fn next_timestamp() -> SystemTime {
    let now_nanos = to_nanos(SystemTime::now());

    let mut last = LAST_ADDED_AT.load(Ordering::Relaxed);
    loop {
        let candidate = if now_nanos > last {
            now_nanos
        } else {
            last.saturating_add(1)
        };

        match LAST_ADDED_AT.compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => return from_nanos(candidate),
            Err(updated) => last = updated,
        }
    }
}

/// Fait avancer l'horloge au-delà d'un timestamp déjà persisté
pub(crate) fn observe_timestamp(nanos: i64) {
    LAST_ADDED_AT.fetch_max(nanos, Ordering::SeqCst);
}
