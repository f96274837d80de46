//! Mutations et lecture du contenu des files
//!
//! Chaque mutation suit la séquence écriture → relecture → publication sous le
//! verrou de la file, pour que les abonnés voient les évènements dans l'ordre
//! des mutations.

use std::sync::Arc;

use tracing::debug;

use crate::broadcaster::{QueueChange, QueueEvent, QueueSubscription, StreamBroadcaster};
use crate::error::{Error, Result};
use crate::locks::{LockKey, QueueLocks};
use crate::persistence::PersistenceManager;
use crate::queue::entry::next_timestamp;
use crate::queue::{NewEntry, Queue, QueueEntry};

pub struct QueueStore {
    persistence: Arc<PersistenceManager>,
    locks: Arc<QueueLocks>,
    broadcaster: StreamBroadcaster,
}

impl QueueStore {
    pub fn new(
        persistence: Arc<PersistenceManager>,
        locks: Arc<QueueLocks>,
        broadcaster: StreamBroadcaster,
    ) -> Self {
        Self {
            persistence,
            locks,
            broadcaster,
        }
    }

    /// Ajoute un morceau en fin de file
    pub async fn add(&self, queue: &Queue, entry: NewEntry) -> Result<QueueEntry> {
        let entry = entry.validate()?;

        let _guard = self.locks.lock(LockKey::Queue(queue.id)).await;
        let (created, items) = self
            .persistence
            .insert_entry(queue.id, &entry, next_timestamp())?;

        debug!(
            "Entry {} ('{}') added to queue {}",
            created.id, created.title, queue.id
        );

        self.broadcaster.publish(QueueEvent::new(
            queue.id,
            QueueChange::Added(created.clone()),
            items,
        ));

        Ok(created)
    }

    /// Retire une entrée par son identifiant
    pub async fn remove(&self, queue: &Queue, entry_id: i64) -> Result<QueueEntry> {
        let _guard = self.locks.lock(LockKey::Queue(queue.id)).await;
        self.remove_locked(queue, entry_id)
    }

    /// Retire l'entrée la plus ancienne portant ce `track_id`
    pub async fn remove_by_track(&self, queue: &Queue, track_id: &str) -> Result<QueueEntry> {
        let _guard = self.locks.lock(LockKey::Queue(queue.id)).await;
        let entry_id = self
            .persistence
            .oldest_entry_for_track(queue.id, track_id)?
            .ok_or_else(|| Error::EntryNotFound(track_id.to_string()))?;
        self.remove_locked(queue, entry_id)
    }

    fn remove_locked(&self, queue: &Queue, entry_id: i64) -> Result<QueueEntry> {
        let (removed, items) = self
            .persistence
            .delete_entry(queue.id, entry_id)?
            .ok_or_else(|| Error::EntryNotFound(entry_id.to_string()))?;

        debug!("Entry {} removed from queue {}", entry_id, queue.id);

        self.broadcaster.publish(QueueEvent::new(
            queue.id,
            QueueChange::Removed {
                entry_id,
                track_id: removed.track_id.clone(),
            },
            items,
        ));

        Ok(removed)
    }

    /// Contenu de la file, du plus ancien au plus récent
    pub fn list(&self, queue: &Queue) -> Result<Vec<QueueEntry>> {
        self.persistence.list_entries(queue.id)
    }

    /// Instantané cohérent et abonnement aux mutations suivantes
    ///
    /// Pris sous le verrou de la file : aucun évènement n'est perdu ni
    /// dupliqué entre l'instantané et le premier évènement reçu.
    pub async fn snapshot_and_subscribe(
        &self,
        queue: &Queue,
    ) -> Result<(Vec<QueueEntry>, QueueSubscription)> {
        let _guard = self.locks.lock(LockKey::Queue(queue.id)).await;
        let items = self.persistence.list_entries(queue.id)?;
        let subscription = self.broadcaster.subscribe(queue.id);
        Ok((items, subscription))
    }
}
