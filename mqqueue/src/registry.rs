//! Résolution et création des files (id, code, nom)

use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::locks::{LockKey, QueueLocks};
use crate::persistence::{InsertQueue, PersistenceManager};
use crate::queue::{Queue, QueueRef, Target, normalize_name};

/// Alphabet des codes de partage
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Longueur d'un code de partage
pub const CODE_LENGTH: usize = 8;

/// Nombre maximal de tirages de code lors d'une création
pub const MAX_CODE_ATTEMPTS: u32 = 32;

/// Tire un code de 8 caractères uniformément dans `A-Z0-9`
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

pub struct QueueRegistry {
    persistence: Arc<PersistenceManager>,
    locks: Arc<QueueLocks>,
}

impl QueueRegistry {
    pub fn new(persistence: Arc<PersistenceManager>, locks: Arc<QueueLocks>) -> Self {
        Self { persistence, locks }
    }

    /// Résout une référence de file.
    ///
    /// Par id ou par code, une file inconnue est une erreur ; par nom, la
    /// file est créée si besoin.
    pub async fn resolve(&self, queue: &QueueRef) -> Result<Queue> {
        match queue.target()? {
            Target::Id(id) => self
                .persistence
                .queue_by_id(id)?
                .ok_or_else(|| Error::QueueNotFound(id.to_string())),
            Target::Code(code) => self
                .persistence
                .queue_by_code(&code)?
                .ok_or(Error::QueueNotFound(code)),
            Target::Name(name) => self.get_or_create(&name).await,
        }
    }

    /// Crée une file, ou retourne celle qui porte déjà ce nom
    pub async fn create(&self, name: Option<&str>) -> Result<Queue> {
        let name = normalize_name(name)?;
        self.get_or_create(&name).await
    }

    async fn get_or_create(&self, name: &str) -> Result<Queue> {
        self.get_or_create_with(name, generate_code).await
    }

    /// Get-or-create atomique par nom, avec un générateur de codes donné
    pub(crate) async fn get_or_create_with<F>(&self, name: &str, mut next_code: F) -> Result<Queue>
    where
        F: FnMut() -> String,
    {
        if let Some(queue) = self.persistence.queue_by_name(name)? {
            return Ok(queue);
        }

        let _guard = self.locks.lock(LockKey::Name(name.to_string())).await;

        // Une autre requête a pu créer la file pendant l'attente du verrou
        if let Some(queue) = self.persistence.queue_by_name(name)? {
            return Ok(queue);
        }

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = next_code();
            match self.persistence.insert_queue(name, &code)? {
                InsertQueue::Created(queue) => {
                    info!(
                        "Queue '{}' created (id: {}, code: {})",
                        queue.name, queue.id, queue.code
                    );
                    return Ok(queue);
                }
                InsertQueue::CodeTaken => {
                    debug!("Queue code collision on attempt {}, retrying", attempt);
                }
                InsertQueue::NameTaken => {
                    return self
                        .persistence
                        .queue_by_name(name)?
                        .ok_or_else(|| Error::QueueNotFound(name.to_string()));
                }
            }
        }

        Err(Error::CodeExhausted(MAX_CODE_ATTEMPTS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn registry() -> QueueRegistry {
        QueueRegistry::new(
            Arc::new(PersistenceManager::in_memory().unwrap()),
            Arc::new(QueueLocks::new()),
        )
    }

    #[test]
    fn test_code_shape() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[tokio::test]
    async fn test_resolution_precedence() {
        let registry = registry();
        let party = registry.create(Some("party")).await.unwrap();
        let other = registry.create(Some("other")).await.unwrap();

        let by_all = QueueRef {
            id: Some(party.id),
            code: Some(other.code.clone()),
            name: Some("third".into()),
        };
        assert_eq!(registry.resolve(&by_all).await.unwrap(), party);

        let by_code = QueueRef {
            code: Some(other.code.to_lowercase()),
            name: Some("party".into()),
            ..Default::default()
        };
        assert_eq!(registry.resolve(&by_code).await.unwrap(), other);
    }

    #[tokio::test]
    async fn test_unknown_id_or_code_is_not_found() {
        let registry = registry();
        assert!(matches!(
            registry.resolve(&QueueRef::by_id(999)).await,
            Err(Error::QueueNotFound(_))
        ));
        assert!(matches!(
            registry.resolve(&QueueRef::by_code("ZZZZZZZZ")).await,
            Err(Error::QueueNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_default_queue_is_created_once() {
        let registry = registry();
        let a = registry.resolve(&QueueRef::default()).await.unwrap();
        let b = registry.resolve(&QueueRef::by_name("  ")).await.unwrap();
        let c = registry.create(None).await.unwrap();

        assert_eq!(a.name, "Default");
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[tokio::test]
    async fn test_distinct_names_get_distinct_codes() {
        let registry = registry();
        let mut ids = HashSet::new();
        let mut codes = HashSet::new();

        for i in 0..50 {
            let queue = registry.create(Some(&format!("queue-{}", i))).await.unwrap();
            ids.insert(queue.id);
            codes.insert(queue.code);
        }

        assert_eq!(ids.len(), 50);
        assert_eq!(codes.len(), 50);
        // Seul le dernier verrou de nom, relâché, peut subsister
        assert!(registry.locks.len() <= 1);
    }

    #[tokio::test]
    async fn test_code_collision_is_retried() {
        let registry = registry();
        registry
            .get_or_create_with("first", || "SAMECODE".to_string())
            .await
            .unwrap();

        let mut codes = vec!["OTHER001".to_string(), "SAMECODE".to_string()];
        let second = registry
            .get_or_create_with("second", || codes.pop().unwrap())
            .await
            .unwrap();

        assert_eq!(second.code, "OTHER001");
    }

    #[tokio::test]
    async fn test_code_exhaustion_is_an_error() {
        let registry = registry();
        registry
            .get_or_create_with("first", || "SAMECODE".to_string())
            .await
            .unwrap();

        let mut attempts = 0;
        let result = registry
            .get_or_create_with("second", || {
                attempts += 1;
                "SAMECODE".to_string()
            })
            .await;

        assert!(matches!(result, Err(Error::CodeExhausted(32))));
        assert_eq!(attempts, 32);
    }
}
