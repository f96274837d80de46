//! Gestion des erreurs pour le client catalogue

use thiserror::Error;

/// Type Result personnalisé pour mqcatalog
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Erreurs possibles lors d'une recherche dans le catalogue
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Requête invalide (paramètre manquant ou vide)
    #[error("{0}")]
    InvalidQuery(String),

    /// Le catalogue n'a pas répondu ou a répondu en erreur.
    ///
    /// La cause est une description courte, jamais le corps de la réponse.
    #[error("Qobuz request failed: {0}")]
    Upstream(String),

    /// Erreur de configuration Qobuz (App ID, URL de base, etc.)
    #[error("Qobuz configuration error: {0}")]
    Configuration(String),
}

impl CatalogError {
    /// Erreur amont pour un statut HTTP hors 2xx
    pub fn from_status_code(code: u16) -> Self {
        Self::Upstream(format!("Qobuz responded with {}", code))
    }

    /// Erreur amont pour un échec de transport (timeout, connexion refusée...)
    pub fn transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Upstream("Qobuz request timed out".to_string())
        } else {
            Self::Upstream("Qobuz request failed".to_string())
        }
    }

    /// Vérifie si l'erreur vient du catalogue distant
    pub fn is_upstream(&self) -> bool {
        matches!(self, CatalogError::Upstream(_))
    }
}

impl From<anyhow::Error> for CatalogError {
    fn from(err: anyhow::Error) -> Self {
        CatalogError::Configuration(err.to_string())
    }
}
