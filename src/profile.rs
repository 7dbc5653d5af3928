//! Connection profile: identity, endpoint, credentials.

use std::fmt;
use std::hash::{Hash, Hasher};

use uuid::Uuid;

use crate::config::ClientConfig;

pub const DEFAULT_PORT: u16 = 21;

/// A named, identity-stable set of connection parameters.
///
/// Two profiles are equal iff their `id`s are equal; every other field can be
/// edited without changing identity.
#[derive(Debug, Clone)]
pub struct ConnectionProfile {
    id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    /// Held in memory only. Never written to the connection store.
    pub password: String,
    pub passive_mode: bool,
    connected: bool,
    password_hash: Option<String>,
    salt: Option<String>,
}

impl ConnectionProfile {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), name, host, port, username, password)
    }

    /// Rebuild a profile around an existing identity (e.g. from the store).
    pub fn with_id(
        id: impl Into<String>,
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        ConnectionProfile {
            id: id.into(),
            name: name.into(),
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            passive_mode: true,
            connected: false,
            password_hash: None,
            salt: None,
        }
    }

    /// Empty profile carrying the configured port and data-channel mode.
    pub fn from_config_defaults(config: &ClientConfig) -> Self {
        let mut profile = Self::new("", "", config.default_port, "", "");
        profile.passive_mode = config.default_passive_mode;
        profile
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Returns `true` when the flag actually changed.
    pub fn set_connected(&mut self, connected: bool) -> bool {
        let changed = self.connected != connected;
        self.connected = connected;
        changed
    }

    pub fn password_hash(&self) -> Option<&str> {
        self.password_hash.as_deref()
    }

    pub fn salt(&self) -> Option<&str> {
        self.salt.as_deref()
    }

    pub fn set_stored_credentials(&mut self, password_hash: impl Into<String>, salt: impl Into<String>) {
        self.password_hash = Some(password_hash.into());
        self.salt = Some(salt.into());
    }

    /// True when this profile came from the store and carries a hash and salt.
    pub fn has_stored_password(&self) -> bool {
        self.password_hash.is_some() && self.salt.is_some()
    }

    /// Copy the fields a live connection depends on. Identity, name and the
    /// stored hash are left alone.
    pub fn copy_connection_fields_from(&mut self, other: &ConnectionProfile) {
        self.host = other.host.clone();
        self.port = other.port;
        self.username = other.username.clone();
        self.password = other.password.clone();
        self.passive_mode = other.passive_mode;
    }
}

impl PartialEq for ConnectionProfile {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionProfile {}

impl Hash for ConnectionProfile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equality_follows_id_only() {
        let a = ConnectionProfile::new("prod", "ftp.example.com", 21, "bob", "secret");
        let mut b = a.clone();
        b.name = "renamed".to_string();
        b.host = "other.example.com".to_string();
        b.port = 2121;
        b.password = "changed".to_string();
        b.set_connected(true);

        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a.clone());
        assert!(set.contains(&b));

        let c = ConnectionProfile::new("prod", "ftp.example.com", 21, "bob", "secret");
        assert_ne!(a, c, "fresh profiles get fresh ids");
    }

    #[test]
    fn test_defaults_and_display_name() {
        let p = ConnectionProfile::new("x", "ftp.example.com", DEFAULT_PORT, "bob", "");
        assert!(p.passive_mode);
        assert!(!p.is_connected());
        assert_eq!(p.display_name(), "bob@ftp.example.com:21");
        assert_eq!(p.to_string(), "bob@ftp.example.com:21");
        assert!(Uuid::parse_str(p.id()).is_ok());
    }

    #[test]
    fn test_from_config_defaults() {
        let config = ClientConfig {
            default_port: 2121,
            default_passive_mode: false,
            ..ClientConfig::default()
        };
        let p = ConnectionProfile::from_config_defaults(&config);
        assert_eq!(p.port, 2121);
        assert!(!p.passive_mode);
    }

    #[test]
    fn test_has_stored_password_needs_hash_and_salt() {
        let mut p = ConnectionProfile::new("x", "h", 21, "u", "");
        assert!(!p.has_stored_password());
        p.set_stored_credentials("hash", "salt");
        assert!(p.has_stored_password());
    }

    #[test]
    fn test_set_connected_reports_transitions() {
        let mut p = ConnectionProfile::new("x", "h", 21, "u", "");
        assert!(p.set_connected(true));
        assert!(!p.set_connected(true));
        assert!(p.set_connected(false));
        assert!(!p.set_connected(false));
    }

    #[test]
    fn test_copy_connection_fields_keeps_identity() {
        let mut original = ConnectionProfile::new("orig", "a.example.com", 21, "alice", "pw");
        let mut edited = ConnectionProfile::with_id(original.id(), "edited", "b.example.com", 990, "bob", "pw2");
        edited.passive_mode = false;

        original.copy_connection_fields_from(&edited);

        assert_eq!(original.name, "orig");
        assert_eq!(original.host, "b.example.com");
        assert_eq!(original.port, 990);
        assert_eq!(original.username, "bob");
        assert_eq!(original.password, "pw2");
        assert!(!original.passive_mode);
    }
}
