//! Diffusion des mutations de files vers les abonnés
//!
//! Chaque abonné dispose d'un tampon borné. Un abonné dont le tampon est plein
//! au moment d'une publication est déconnecté : il reçoit encore ce qui était
//! déjà en attente, puis son flux se termine.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};
use std::time::SystemTime;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_stream::Stream;
use tracing::{debug, warn};

use crate::queue::QueueEntry;

/// Taille par défaut du tampon d'un abonné
pub const DEFAULT_STREAM_BUFFER: usize = 64;

/// Nature d'une mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueChange {
    Added(QueueEntry),
    Removed { entry_id: i64, track_id: String },
}

/// Évènement publié après chaque mutation d'une file
#[derive(Debug, Clone)]
pub struct QueueEvent {
    pub queue_id: i64,
    pub change: QueueChange,
    /// Contenu complet de la file après la mutation
    pub items: Vec<QueueEntry>,
    pub timestamp: SystemTime,
}

impl QueueEvent {
    pub fn new(queue_id: i64, change: QueueChange, items: Vec<QueueEntry>) -> Self {
        Self {
            queue_id,
            change,
            items,
            timestamp: SystemTime::now(),
        }
    }
}

type Subscribers = HashMap<i64, HashMap<u64, mpsc::Sender<QueueEvent>>>;

struct BroadcasterInner {
    subscribers: Mutex<Subscribers>,
    counter: AtomicU64,
    buffer: usize,
}

impl BroadcasterInner {
    fn subscribers(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, queue_id: i64, token: u64) -> bool {
        let mut subscribers = self.subscribers();
        let Some(queue) = subscribers.get_mut(&queue_id) else {
            return false;
        };
        let removed = queue.remove(&token).is_some();
        if queue.is_empty() {
            subscribers.remove(&queue_id);
        }
        removed
    }
}

/// Registre des abonnés, par file
#[derive(Clone)]
pub struct StreamBroadcaster {
    inner: Arc<BroadcasterInner>,
}

impl Default for StreamBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_STREAM_BUFFER)
    }
}

impl StreamBroadcaster {
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(BroadcasterInner {
                subscribers: Mutex::new(HashMap::new()),
                counter: AtomicU64::new(1),
                buffer: buffer.max(1),
            }),
        }
    }

    /// Abonne un nouvel observateur aux évènements d'une file
    pub fn subscribe(&self, queue_id: i64) -> QueueSubscription {
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        let token = self.inner.counter.fetch_add(1, Ordering::Relaxed);

        self.inner
            .subscribers()
            .entry(queue_id)
            .or_default()
            .insert(token, tx);

        debug!("Subscriber {} attached to queue {}", token, queue_id);

        QueueSubscription {
            queue_id,
            token,
            rx,
            broadcaster: Arc::downgrade(&self.inner),
        }
    }

    /// Désabonne un observateur. Sans effet s'il l'est déjà.
    pub fn unsubscribe(&self, subscription: &QueueSubscription) {
        self.inner.remove(subscription.queue_id, subscription.token);
    }

    /// Publie un évènement vers tous les abonnés de la file.
    ///
    /// Retourne le nombre d'abonnés qui l'ont reçu.
    pub fn publish(&self, event: QueueEvent) -> usize {
        let queue_id = event.queue_id;
        let mut subscribers = self.inner.subscribers();
        let Some(queue) = subscribers.get_mut(&queue_id) else {
            return 0;
        };

        let mut delivered = 0;
        queue.retain(|token, tx| match tx.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(
                    "Subscriber {} of queue {} is too slow, disconnecting",
                    token, queue_id
                );
                false
            }
            Err(TrySendError::Closed(_)) => false,
        });

        if queue.is_empty() {
            subscribers.remove(&queue_id);
        }
        delivered
    }

    /// Nombre d'abonnés actifs d'une file
    pub fn subscriber_count(&self, queue_id: i64) -> usize {
        self.inner
            .subscribers()
            .get(&queue_id)
            .map(HashMap::len)
            .unwrap_or(0)
    }
}

/// Abonnement aux évènements d'une file
///
/// Se désabonne automatiquement quand il est détruit.
pub struct QueueSubscription {
    queue_id: i64,
    token: u64,
    rx: mpsc::Receiver<QueueEvent>,
    broadcaster: Weak<BroadcasterInner>,
}

impl QueueSubscription {
    pub fn queue_id(&self) -> i64 {
        self.queue_id
    }

    /// Prochain évènement ; `None` une fois l'abonnement terminé
    pub async fn recv(&mut self) -> Option<QueueEvent> {
        self.rx.recv().await
    }
}

impl Stream for QueueSubscription {
    type Item = QueueEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for QueueSubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.broadcaster.upgrade() {
            if inner.remove(self.queue_id, self.token) {
                debug!(
                    "Subscriber {} detached from queue {}",
                    self.token, self.queue_id
                );
            }
        }
    }
}
