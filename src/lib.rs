//!
//! FTP session core
//!
//! Connection profiles, one session per profile, connect/disconnect state
//! tracking, directory listing with a name-only fallback, and salted password
//! hashes for the connection store. The FTP protocol itself is handled by
//! `suppaftp`.
//!
//! Everything here blocks on network I/O; embedders should call it from a
//! worker thread and marshal [`SessionEvent`]s back to their UI thread.
//!

use std::sync::{Arc, Mutex, MutexGuard};

pub mod config;
pub mod credentials;
pub mod entry;
pub mod error;
pub mod events;
pub mod listing;
pub mod profile;
pub mod registry;
pub mod session;
pub mod store;
pub mod transport;

pub use config::ClientConfig;
pub use credentials::CredentialStore;
pub use entry::{sort_for_display, DirectoryEntry};
pub use error::{ListingError, SessionError, SessionResult, StoreError, TransportError};
pub use events::{EventBus, SessionEvent};
pub use listing::ListingParser;
pub use profile::ConnectionProfile;
pub use registry::SessionRegistry;
pub use session::FtpSession;
pub use store::{ConnectionManager, ConnectionStore, JsonFileStore, MemoryStore, ProfileRecord};
pub use transport::{Connector, DataMode, SuppaConnector, Transport};

/// Initialize logging. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::try_init();
}

/// Registry and connection manager wired from `config`, with the store at
/// [`ClientConfig::store_location`]. The store is not loaded yet.
pub fn bootstrap(config: &ClientConfig) -> ConnectionManager {
    let registry = Arc::new(SessionRegistry::new(config.connector()));
    let store = config.store();
    log::info!("Using connection store {}", store.path().display());
    ConnectionManager::new(Box::new(store), registry)
}

// State behind these mutexes stays consistent across a panic, so poisoning
// is ignored.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
