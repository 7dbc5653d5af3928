//! Connection persistence.
//!
//! [`ConnectionStore`] is the load/save port; [`JsonFileStore`] keeps the
//! records as a JSON array on disk. [`ConnectionManager`] owns the list of
//! known profiles and keeps store and registry in step with it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::credentials::CredentialStore;
use crate::error::StoreError;
use crate::events::SessionEvent;
use crate::lock;
use crate::profile::ConnectionProfile;
use crate::registry::SessionRegistry;

/// At-rest form of a profile. Never carries the plaintext password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password_hash: String,
    pub salt: String,
    pub passive_mode: bool,
}

pub trait ConnectionStore: Send + Sync {
    fn load(&self) -> Result<Vec<ProfileRecord>, StoreError>;
    fn save(&self, records: &[ProfileRecord]) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl ConnectionStore for JsonFileStore {
    fn load(&self) -> Result<Vec<ProfileRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let json = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&json)?)
    }

    fn save(&self, records: &[ProfileRecord]) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, json).map_err(|e| self.io_error(e))
    }
}

/// In-process store, for embedding without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<ProfileRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<ProfileRecord>) -> Self {
        MemoryStore {
            records: Mutex::new(records),
        }
    }
}

impl ConnectionStore for MemoryStore {
    fn load(&self) -> Result<Vec<ProfileRecord>, StoreError> {
        Ok(lock(&self.records).clone())
    }

    fn save(&self, records: &[ProfileRecord]) -> Result<(), StoreError> {
        *lock(&self.records) = records.to_vec();
        Ok(())
    }
}

/// The user's list of connections.
///
/// Every mutation updates memory first, then saves. A failed save is logged
/// and returned, but the in-memory list keeps the change.
pub struct ConnectionManager {
    profiles: Mutex<Vec<ConnectionProfile>>,
    store: Box<dyn ConnectionStore>,
    registry: Arc<SessionRegistry>,
}

impl ConnectionManager {
    pub fn new(store: Box<dyn ConnectionStore>, registry: Arc<SessionRegistry>) -> Self {
        ConnectionManager {
            profiles: Mutex::new(Vec::new()),
            store,
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Replace the in-memory list with the stored records. Records without a
    /// host or username are skipped.
    pub fn load(&self) -> Result<usize, StoreError> {
        let records = self.store.load().map_err(|e| {
            error!("Failed to load connections: {}", e);
            e
        })?;

        let loaded: Vec<ConnectionProfile> = records
            .iter()
            .filter(|record| {
                let usable = !record.host.is_empty() && !record.username.is_empty();
                if !usable {
                    warn!("Skipping stored connection {} without host or username", record.id);
                }
                usable
            })
            .map(CredentialStore::unseal)
            .collect();

        let count = loaded.len();
        *lock(&self.profiles) = loaded;
        info!("Loaded {} connections from store", count);
        self.notify(None);
        Ok(count)
    }

    /// Snapshot of the known profiles.
    pub fn connections(&self) -> Vec<ConnectionProfile> {
        lock(&self.profiles).clone()
    }

    pub fn get(&self, profile_id: &str) -> Option<ConnectionProfile> {
        lock(&self.profiles).iter().find(|p| p.id() == profile_id).cloned()
    }

    pub fn add(&self, profile: ConnectionProfile) -> Result<(), StoreError> {
        let mut profile = profile;
        profile.set_connected(false);
        let id = profile.id().to_string();

        lock(&self.profiles).push(profile);
        let saved = self.save();
        self.notify(Some(id));
        saved
    }

    /// Replace the profile with the same id. Unknown ids are an error.
    ///
    /// A blank password means "unchanged": the stored hash and any unlocked
    /// password are carried over from the existing entry. The connected flag
    /// always stays the existing entry's.
    pub fn update(&self, profile: ConnectionProfile) -> Result<(), StoreError> {
        let mut profile = profile;
        {
            let mut profiles = lock(&self.profiles);
            let slot = profiles
                .iter_mut()
                .find(|p| **p == profile)
                .ok_or_else(|| StoreError::UnknownProfile(profile.id().to_string()))?;

            if profile.password.is_empty() {
                profile.password = slot.password.clone();
                if !profile.has_stored_password() {
                    if let (Some(hash), Some(salt)) = (slot.password_hash(), slot.salt()) {
                        profile.set_stored_credentials(hash, salt);
                    }
                }
            }
            profile.set_connected(slot.is_connected());
            *slot = profile.clone();
        }

        if let Some(session) = self.registry.find(&profile) {
            session.reconcile(&profile);
        }

        let saved = self.save();
        self.notify(Some(profile.id().to_string()));
        saved
    }

    /// Disconnect, evict the session and forget the profile.
    pub fn remove(&self, profile: &ConnectionProfile) -> Result<(), StoreError> {
        self.registry.remove(profile);

        let removed = {
            let mut profiles = lock(&self.profiles);
            let before = profiles.len();
            profiles.retain(|p| p != profile);
            profiles.len() != before
        };
        if !removed {
            return Ok(());
        }

        let saved = self.save();
        self.notify(Some(profile.id().to_string()));
        saved
    }

    pub fn verify_password(&self, profile_id: &str, entered_password: &str) -> bool {
        self.get(profile_id)
            .map(|p| CredentialStore::verify(&p, entered_password))
            .unwrap_or(false)
    }

    /// Check `password` against the stored hash and, when it matches, keep it
    /// in memory for connecting.
    pub fn unlock(&self, profile_id: &str, password: &str) -> bool {
        let mut profiles = lock(&self.profiles);
        let Some(profile) = profiles.iter_mut().find(|p| p.id() == profile_id) else {
            return false;
        };
        if !CredentialStore::verify(profile, password) {
            warn!("[{}] Password does not match stored hash", profile.name);
            return false;
        }
        profile.password = password.to_string();
        true
    }

    fn save(&self) -> Result<(), StoreError> {
        let records = {
            let mut profiles = lock(&self.profiles);
            let records = profiles.iter().map(seal_for_store).collect::<Result<Vec<_>, _>>()?;
            // Keep memory verifiable against what was just written.
            for (profile, record) in profiles.iter_mut().zip(&records) {
                profile.set_stored_credentials(&record.password_hash, &record.salt);
            }
            records
        };

        self.store.save(&records).map_err(|e| {
            error!("Failed to save connections: {}", e);
            e
        })
    }

    fn notify(&self, profile_id: Option<String>) {
        self.registry
            .events()
            .publish(SessionEvent::ConnectionsChanged { profile_id });
    }
}

/// A profile loaded from the store but not yet unlocked has no password in
/// memory; its existing hash is written back unchanged.
fn seal_for_store(profile: &ConnectionProfile) -> Result<ProfileRecord, StoreError> {
    if profile.password.is_empty() {
        if let (Some(hash), Some(salt)) = (profile.password_hash(), profile.salt()) {
            return Ok(ProfileRecord {
                id: profile.id().to_string(),
                name: profile.name.clone(),
                host: profile.host.clone(),
                port: profile.port,
                username: profile.username.clone(),
                password_hash: hash.to_string(),
                salt: salt.to_string(),
                passive_mode: profile.passive_mode,
            });
        }
    }
    Ok(CredentialStore::seal(profile)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_uses_camel_case_keys() {
        let record = ProfileRecord {
            id: "1".to_string(),
            name: "n".to_string(),
            host: "h".to_string(),
            port: 21,
            username: "u".to_string(),
            password_hash: "ph".to_string(),
            salt: "s".to_string(),
            passive_mode: true,
        };
        let value = serde_json::to_value(&record).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            ["host", "id", "name", "passiveMode", "passwordHash", "port", "salt", "username"]
        );
    }

    #[test]
    fn test_seal_for_store_keeps_hash_of_locked_profile() {
        let original = ConnectionProfile::new("p", "h", 21, "u", "secret");
        let record = CredentialStore::seal(&original).unwrap();
        let locked = CredentialStore::unseal(&record);

        let resealed = seal_for_store(&locked).unwrap();
        assert_eq!(resealed, record);
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_empty());

        let record = CredentialStore::seal(&ConnectionProfile::new("p", "h", 21, "u", "pw")).unwrap();
        store.save(std::slice::from_ref(&record)).unwrap();
        assert_eq!(store.load().unwrap(), vec![record]);
    }
}
