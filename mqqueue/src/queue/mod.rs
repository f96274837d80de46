//! Types du domaine : file, référence de file et entrées

pub mod entry;

use std::time::SystemTime;

use crate::error::{Error, Result};

pub use entry::{NewEntry, QueueEntry};

/// Nom utilisé quand aucune file n'est désignée
pub const DEFAULT_QUEUE_NAME: &str = "Default";

/// Longueur maximale d'un nom de file (en caractères)
pub const MAX_NAME_LENGTH: usize = 120;

/// Une file partagée
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Queue {
    pub id: i64,
    pub name: String,
    /// Code court partageable (8 caractères `A-Z0-9`)
    pub code: String,
    pub created_at: SystemTime,
}

/// Désignation d'une file par id, code ou nom
///
/// Priorité : id, puis code, puis nom.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueRef {
    pub id: Option<i64>,
    pub code: Option<String>,
    pub name: Option<String>,
}

/// Forme résolue d'un [`QueueRef`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    Id(i64),
    Code(String),
    Name(String),
}

impl QueueRef {
    pub fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn by_code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Default::default()
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub(crate) fn target(&self) -> Result<Target> {
        if let Some(id) = self.id {
            return Ok(Target::Id(id));
        }

        if let Some(code) = self.code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            return Ok(Target::Code(code.to_ascii_uppercase()));
        }

        normalize_name(self.name.as_deref()).map(Target::Name)
    }
}

/// Nom nettoyé : espaces retirés, "Default" si absent ou vide
pub fn normalize_name(name: Option<&str>) -> Result<String> {
    let name = name.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Ok(DEFAULT_QUEUE_NAME.to_string());
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(Error::Validation(format!(
            "Queue name cannot exceed {} characters.",
            MAX_NAME_LENGTH
        )));
    }

    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let r = QueueRef {
            id: Some(4),
            code: Some("ABCD1234".into()),
            name: Some("party".into()),
        };
        assert_eq!(r.target().unwrap(), Target::Id(4));

        let r = QueueRef {
            code: Some(" abcd1234 ".into()),
            name: Some("party".into()),
            ..Default::default()
        };
        assert_eq!(r.target().unwrap(), Target::Code("ABCD1234".into()));

        let r = QueueRef {
            code: Some("".into()),
            name: Some(" party ".into()),
            ..Default::default()
        };
        assert_eq!(r.target().unwrap(), Target::Name("party".into()));
    }

    #[test]
    fn test_default_name() {
        assert_eq!(QueueRef::default().target().unwrap(), Target::Name("Default".into()));
        assert_eq!(normalize_name(Some("   ")).unwrap(), "Default");
    }

    #[test]
    fn test_name_too_long() {
        let name = "x".repeat(MAX_NAME_LENGTH + 1);
        assert!(matches!(normalize_name(Some(&name)), Err(Error::Validation(_))));
        assert!(normalize_name(Some(&name[..MAX_NAME_LENGTH])).is_ok());
    }
}
