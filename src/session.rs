//! One live FTP control connection bound to a single profile.
//!
//! ```text
//! Disconnected --connect()--> Connected --disconnect()--> Disconnected
//! ```
//!
//! All network operations block. Callers are expected to issue one operation
//! per session at a time from a worker thread.

use std::sync::{Arc, Mutex};

use log::{debug, error, info, warn};

use crate::entry::DirectoryEntry;
use crate::error::{ListingError, SessionError, SessionResult};
use crate::events::{EventBus, SessionEvent};
use crate::listing::ListingParser;
use crate::lock;
use crate::profile::ConnectionProfile;
use crate::transport::{Connector, DataMode, Transport};

pub struct FtpSession {
    id: String,
    profile: Mutex<ConnectionProfile>,
    // Lock order: transport before profile.
    transport: Mutex<Option<Box<dyn Transport>>>,
    connector: Arc<dyn Connector>,
    events: Arc<EventBus>,
}

impl FtpSession {
    pub fn new(profile: ConnectionProfile, connector: Arc<dyn Connector>, events: Arc<EventBus>) -> Self {
        let mut profile = profile;
        profile.set_connected(false);

        FtpSession {
            id: profile.id().to_string(),
            profile: Mutex::new(profile),
            transport: Mutex::new(None),
            connector,
            events,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Snapshot of the bound profile.
    pub fn profile(&self) -> ConnectionProfile {
        lock(&self.profile).clone()
    }

    /// Open, authenticate and configure the control connection.
    ///
    /// Returns immediately when already connected. Any failing step closes
    /// whatever was opened and leaves the session disconnected; nothing is
    /// retried.
    pub fn connect(&self) -> SessionResult<()> {
        let mut transport = lock(&self.transport);

        if let Some(conn) = transport.as_ref() {
            if conn.is_connected() && lock(&self.profile).is_connected() {
                return Ok(());
            }
        }
        if let Some(stale) = transport.take() {
            debug!("[{}] Dropping stale transport before reconnecting", self.name());
            teardown(stale, &self.name());
            self.mark_connected(false);
        }

        let profile = self.profile();
        info!("[{}] Connecting to {}:{}", profile.name, profile.host, profile.port);

        let mut conn = self
            .connector
            .connect(&profile.host, profile.port)
            .map_err(|e| {
                error!("[{}] Connection failed: {}", profile.name, e);
                SessionError::ConnectionRefused {
                    host: profile.host.clone(),
                    port: profile.port,
                    reason: e.to_string(),
                }
            })?;

        if let Err(e) = open(&mut *conn, &profile) {
            error!("[{}] {}", profile.name, e);
            teardown(conn, &profile.name);
            self.mark_connected(false);
            return Err(e);
        }

        *transport = Some(conn);
        info!("[{}] Logged in as {}", profile.name, profile.username);
        self.mark_connected(true);
        Ok(())
    }

    /// Log out and close. Never fails; cleanup errors are only logged.
    /// Emits a state change only when the session was actually connected.
    pub fn disconnect(&self) {
        let mut transport = lock(&self.transport);
        if let Some(conn) = transport.take() {
            info!("[{}] Disconnecting", self.name());
            teardown(conn, &self.name());
        }
        self.mark_connected(false);
    }

    pub fn is_connected(&self) -> bool {
        let transport = lock(&self.transport);
        let live = transport.as_ref().map_or(false, |conn| conn.is_connected());
        live && lock(&self.profile).is_connected()
    }

    /// List `path` (`/` when empty).
    ///
    /// Falls back to a name-only listing when the LIST output is in an
    /// unrecognized dialect. If that fails too, the result is empty, which
    /// callers cannot tell apart from an empty directory.
    pub fn list_files(&self, path: &str) -> SessionResult<Vec<DirectoryEntry>> {
        let path = if path.is_empty() { "/" } else { path };
        let name = self.name();

        self.with_transport(|conn| {
            let lines = conn.list(path)?;
            match ListingParser::parse(path, &lines) {
                Ok(entries) => {
                    debug!("[{}] Listed {} entries in {}", name, entries.len(), path);
                    Ok(entries)
                }
                Err(e) => {
                    warn!("[{}] {}; falling back to name listing", name, e);
                    Ok(list_simple(conn, path, &name))
                }
            }
        })
    }

    pub fn change_directory(&self, path: &str) -> SessionResult<()> {
        self.with_transport(|conn| Ok(conn.cwd(path)?))
    }

    pub fn current_directory(&self) -> SessionResult<String> {
        self.with_transport(|conn| Ok(conn.pwd()?))
    }

    /// Download a whole file into memory.
    pub fn retrieve_file(&self, path: &str) -> SessionResult<Vec<u8>> {
        let name = self.name();
        self.with_transport(|conn| {
            let data = conn.retrieve(path)?;
            debug!("[{}] Retrieved {} ({} bytes)", name, path, data.len());
            Ok(data)
        })
    }

    /// Upload `data`, replacing any existing file at `path`.
    pub fn store_file(&self, path: &str, data: &[u8]) -> SessionResult<()> {
        let name = self.name();
        self.with_transport(|conn| {
            conn.store(path, data)?;
            debug!("[{}] Stored {} ({} bytes)", name, path, data.len());
            Ok(())
        })
    }

    /// Copy edited connection fields onto the bound profile. Skipped while a
    /// connection is live or an operation holds the transport.
    pub(crate) fn reconcile(&self, incoming: &ConnectionProfile) {
        let Ok(transport) = self.transport.try_lock() else {
            debug!("[{}] Session busy, keeping current connection fields", self.name());
            return;
        };
        let live = transport.as_ref().map_or(false, |conn| conn.is_connected());

        let mut profile = lock(&self.profile);
        if live || profile.is_connected() {
            debug!("[{}] Session connected, keeping current connection fields", profile.name);
            return;
        }
        profile.name = incoming.name.clone();
        profile.copy_connection_fields_from(incoming);
    }

    fn with_transport<T>(
        &self,
        op: impl FnOnce(&mut dyn Transport) -> SessionResult<T>,
    ) -> SessionResult<T> {
        let mut transport = lock(&self.transport);
        let connected = lock(&self.profile).is_connected();

        match transport.as_mut() {
            Some(conn) if connected && conn.is_connected() => op(&mut **conn),
            _ => Err(SessionError::NotConnected),
        }
    }

    fn mark_connected(&self, connected: bool) {
        let changed = lock(&self.profile).set_connected(connected);
        if changed {
            self.events.publish(SessionEvent::StateChanged {
                profile_id: self.id.clone(),
                connected,
            });
        }
    }

    fn name(&self) -> String {
        lock(&self.profile).name.clone()
    }
}

impl Drop for FtpSession {
    fn drop(&mut self) {
        let transport = self.transport.get_mut().map(Option::take);
        if let Ok(Some(conn)) = transport {
            let name = self.profile.get_mut().map(|p| p.name.clone()).unwrap_or_default();
            teardown(conn, &name);
        }
    }
}

fn open(conn: &mut dyn Transport, profile: &ConnectionProfile) -> SessionResult<()> {
    if !conn.greeting_positive() {
        return Err(SessionError::ConnectionRefused {
            host: profile.host.clone(),
            port: profile.port,
            reason: "FTP server refused connection.".to_string(),
        });
    }

    conn.login(&profile.username, &profile.password)
        .map_err(|e| SessionError::AuthenticationFailed {
            username: profile.username.clone(),
            reason: e.to_string(),
        })?;

    conn.set_data_mode(DataMode::from_passive(profile.passive_mode));
    conn.set_binary()?;
    Ok(())
}

fn list_simple(conn: &mut dyn Transport, path: &str, name: &str) -> Vec<DirectoryEntry> {
    match conn.nlst(path) {
        Ok(names) => ListingParser::parse_simple(path, &names),
        Err(e) => {
            warn!("[{}] {}", name, ListingError::Unavailable(e.to_string()));
            Vec::new()
        }
    }
}

fn teardown(mut conn: Box<dyn Transport>, name: &str) {
    if conn.is_connected() {
        if let Err(e) = conn.logout() {
            warn!("[{}] Logout failed during cleanup: {}", name, e);
        }
    }
    if let Err(e) = conn.close() {
        warn!("[{}] Close failed during cleanup: {}", name, e);
    }
}
