//! # mqqueue - Files d'écoute partagées
//!
//! Cette crate fournit les files partagées de MusicQueue :
//! - Registre des files (id, code de partage, nom), création à la volée
//! - Ajout et retrait de morceaux, ordre d'ajout strict
//! - Persistance SQLite
//! - Diffusion en temps réel des mutations aux abonnés
//!
//! # Architecture
//!
//! - **QueueManager** : façade construite au démarrage et partagée par les handlers
//! - **QueueRegistry** : résolution `QueueRef` → `Queue`, génération des codes
//! - **QueueStore** : mutations sous verrou par file, puis publication
//! - **StreamBroadcaster** : un tampon borné par abonné
//!
//! # Exemple d'utilisation
//!
//! ```no_run
//! use mqqueue::{NewEntry, QueueManager, QueueRef};
//!
//! # #[tokio::main]
//! # async fn main() -> mqqueue::Result<()> {
//! let manager = QueueManager::from_config()?;
//!
//! let queue = manager.resolve(&QueueRef::by_name("party")).await?;
//! let (items, mut subscription) = manager.watch(&queue).await?;
//! println!("{} songs queued", items.len());
//!
//! manager
//!     .add(&queue, NewEntry::new("So What", "Miles Davis"))
//!     .await?;
//!
//! if let Some(event) = subscription.recv().await {
//!     println!("queue now holds {} songs", event.items.len());
//! }
//! # Ok(())
//! # }
//! ```

mod broadcaster;
mod error;
mod locks;
mod manager;
mod persistence;
mod queue;
mod registry;
mod store;

#[cfg(feature = "mqconfig")]
mod config_ext;

#[cfg(feature = "mqserver")]
pub mod api;
#[cfg(feature = "mqserver")]
pub mod server_ext;
#[cfg(feature = "mqserver")]
pub mod sse;

// Réexports publics
pub use broadcaster::{
    DEFAULT_STREAM_BUFFER, QueueChange, QueueEvent, QueueSubscription, StreamBroadcaster,
};
pub use error::{Error, Result};
pub use manager::QueueManager;
pub use queue::{DEFAULT_QUEUE_NAME, MAX_NAME_LENGTH, NewEntry, Queue, QueueEntry, QueueRef};
pub use registry::{CODE_ALPHABET, CODE_LENGTH, MAX_CODE_ATTEMPTS, generate_code};

#[cfg(feature = "mqconfig")]
pub use config_ext::QueueConfigExt;

#[cfg(feature = "mqserver")]
pub use server_ext::QueueServerExt;
