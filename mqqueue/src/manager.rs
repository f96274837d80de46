//! QueueManager : point d'entrée unique sur les files partagées
//!
//! Regroupe le registre, le stockage et la diffusion autour d'une même base.
//! Le manager est construit au démarrage et injecté dans les handlers ; il
//! n'existe pas d'instance globale.

use std::path::Path;
use std::sync::Arc;

use crate::broadcaster::{DEFAULT_STREAM_BUFFER, QueueSubscription, StreamBroadcaster};
use crate::error::Result;
use crate::locks::QueueLocks;
use crate::persistence::PersistenceManager;
use crate::queue::{NewEntry, Queue, QueueEntry, QueueRef};
use crate::registry::QueueRegistry;
use crate::store::QueueStore;

struct ManagerInner {
    registry: QueueRegistry,
    store: QueueStore,
    broadcaster: StreamBroadcaster,
}

/// Gestionnaire central des files
#[derive(Clone)]
pub struct QueueManager {
    inner: Arc<ManagerInner>,
}

impl QueueManager {
    /// Ouvre la base `db_path` ; `stream_buffer` borne le tampon de chaque abonné
    pub fn new(db_path: &Path, stream_buffer: usize) -> Result<Self> {
        let persistence = PersistenceManager::new(db_path)?;
        tracing::info!("Queue database opened at {}", db_path.display());
        Ok(Self::with_persistence(persistence, stream_buffer))
    }

    /// Manager sur une base en mémoire (tests)
    pub fn in_memory() -> Result<Self> {
        Ok(Self::with_persistence(
            PersistenceManager::in_memory()?,
            DEFAULT_STREAM_BUFFER,
        ))
    }

    /// Manager en mémoire avec un tampon d'abonné donné
    pub fn in_memory_with_buffer(stream_buffer: usize) -> Result<Self> {
        Ok(Self::with_persistence(
            PersistenceManager::in_memory()?,
            stream_buffer,
        ))
    }

    fn with_persistence(persistence: PersistenceManager, stream_buffer: usize) -> Self {
        let persistence = Arc::new(persistence);
        let locks = Arc::new(QueueLocks::new());
        let broadcaster = StreamBroadcaster::new(stream_buffer);

        Self {
            inner: Arc::new(ManagerInner {
                registry: QueueRegistry::new(persistence.clone(), locks.clone()),
                store: QueueStore::new(persistence, locks, broadcaster.clone()),
                broadcaster,
            }),
        }
    }

    /// Initialise avec la configuration de mqconfig
    #[cfg(feature = "mqconfig")]
    pub fn from_config() -> Result<Self> {
        use crate::config_ext::QueueConfigExt;

        let config = mqconfig::get_config();
        let db_path = config.queue_db_path()?;
        let buffer = config.get_queue_stream_buffer()?;

        Self::new(&db_path, buffer)
    }

    /// Résout une file par id, code ou nom (création à la volée par nom)
    pub async fn resolve(&self, queue: &QueueRef) -> Result<Queue> {
        self.inner.registry.resolve(queue).await
    }

    /// Crée une file, ou retourne celle qui porte déjà ce nom
    pub async fn create_queue(&self, name: Option<&str>) -> Result<Queue> {
        self.inner.registry.create(name).await
    }

    pub async fn add(&self, queue: &Queue, entry: NewEntry) -> Result<QueueEntry> {
        self.inner.store.add(queue, entry).await
    }

    pub async fn remove(&self, queue: &Queue, entry_id: i64) -> Result<QueueEntry> {
        self.inner.store.remove(queue, entry_id).await
    }

    pub async fn remove_by_track(&self, queue: &Queue, track_id: &str) -> Result<QueueEntry> {
        self.inner.store.remove_by_track(queue, track_id).await
    }

    pub fn list(&self, queue: &Queue) -> Result<Vec<QueueEntry>> {
        self.inner.store.list(queue)
    }

    /// Contenu actuel de la file et abonnement aux mutations suivantes
    pub async fn watch(&self, queue: &Queue) -> Result<(Vec<QueueEntry>, QueueSubscription)> {
        self.inner.store.snapshot_and_subscribe(queue).await
    }

    /// Abonnement seul, sans instantané
    pub fn subscribe(&self, queue_id: i64) -> QueueSubscription {
        self.inner.broadcaster.subscribe(queue_id)
    }

    pub fn unsubscribe(&self, subscription: &QueueSubscription) {
        self.inner.broadcaster.unsubscribe(subscription);
    }

    pub fn subscriber_count(&self, queue_id: i64) -> usize {
        self.inner.broadcaster.subscriber_count(queue_id)
    }
}
