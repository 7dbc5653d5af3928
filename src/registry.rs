//! At most one [`FtpSession`] per profile id.
//!
//! The registry is an ordinary value: create one, wrap it in an `Arc` and hand
//! it to whoever needs sessions. Map mutations run under a single lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crossbeam::channel::Receiver;
use log::{debug, info};

use crate::events::{EventBus, SessionEvent};
use crate::lock;
use crate::profile::ConnectionProfile;
use crate::session::FtpSession;
use crate::transport::Connector;

pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<FtpSession>>>,
    connector: Arc<dyn Connector>,
    events: Arc<EventBus>,
}

impl SessionRegistry {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        SessionRegistry {
            sessions: Mutex::new(HashMap::new()),
            connector,
            events: Arc::new(EventBus::new()),
        }
    }

    /// Existing session for `profile.id()`, or a freshly registered one.
    ///
    /// For an existing, disconnected session the edited connection fields of
    /// `profile` are copied onto the bound profile first.
    pub fn get_or_create(&self, profile: &ConnectionProfile) -> Arc<FtpSession> {
        let mut sessions = lock(&self.sessions);
        if let Some(existing) = sessions.get(profile.id()) {
            existing.reconcile(profile);
            return Arc::clone(existing);
        }

        let session = Arc::new(FtpSession::new(
            profile.clone(),
            Arc::clone(&self.connector),
            Arc::clone(&self.events),
        ));
        sessions.insert(profile.id().to_string(), Arc::clone(&session));
        info!("[{}] Registered session for {}", profile.name, profile.display_name());
        session
    }

    pub fn find(&self, profile: &ConnectionProfile) -> Option<Arc<FtpSession>> {
        lock(&self.sessions).get(profile.id()).cloned()
    }

    /// Evict the session for `profile`, if any, then disconnect it.
    ///
    /// The map lock is released before the logout round-trip, so other
    /// profiles' lookups never wait on this session's network I/O.
    pub fn remove(&self, profile: &ConnectionProfile) {
        let removed = lock(&self.sessions).remove(profile.id());

        match removed {
            Some(session) => {
                session.disconnect();
                info!("[{}] Removed session", profile.name);
            }
            None => debug!("[{}] No session to remove", profile.name),
        }
    }

    /// Immutable snapshot of the registered sessions.
    pub fn sessions(&self) -> Vec<Arc<FtpSession>> {
        lock(&self.sessions).values().cloned().collect()
    }

    /// Disconnect every session. Sessions stay registered.
    pub fn disconnect_all(&self) {
        for session in self.sessions() {
            session.disconnect();
        }
    }

    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }
}
