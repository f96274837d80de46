//! Types d'erreurs pour mqqueue

/// Erreurs de gestion des files
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Entrée invalide (titre vide, nom trop long, référence mal formée...)
    #[error("{0}")]
    Validation(String),

    #[error("Queue not found.")]
    QueueNotFound(String),

    #[error("Queued song not found.")]
    EntryNotFound(String),

    /// Aucun code libre trouvé après le nombre maximal de tentatives
    #[error("Unable to allocate a unique queue code after {0} attempts")]
    CodeExhausted(u32),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::QueueNotFound(_) | Error::EntryNotFound(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::PersistenceError(err.to_string())
    }
}

/// Type Result spécialisé pour mqqueue
pub type Result<T> = std::result::Result<T, Error>;
