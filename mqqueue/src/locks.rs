//! Verrous asynchrones par file
//!
//! Toutes les mutations d'une même file passent par le même verrou, qui reste
//! tenu de l'écriture en base jusqu'à la publication de l'évènement.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Clé de verrou : une file existante, ou un nom en cours de création
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockKey {
    Queue(i64),
    Name(String),
}

#[derive(Default)]
pub struct QueueLocks {
    locks: Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
}

impl QueueLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attend puis prend le verrou associé à `key`
    ///
    /// Les verrous que plus personne ne tient ni n'attend sont retirés au
    /// passage : la table ne contient que les clés actives.
    pub async fn lock(&self, key: LockKey) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
            locks.entry(key).or_default().clone()
        };
        mutex.lock_owned().await
    }

    /// Nombre de clés présentes dans la table
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
