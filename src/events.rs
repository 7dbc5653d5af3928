//! Connection notifications.
//!
//! Subscribers get an unbounded `crossbeam` channel. Publishing happens on the
//! thread that performed the mutation and never blocks; receivers that have
//! been dropped are pruned on the next publish.

use std::sync::Mutex;

use crossbeam::channel::{self, Receiver, Sender};

use crate::lock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A profile was added to or removed from the connection set.
    ConnectionsChanged { profile_id: Option<String> },
    /// A session's connected flag flipped.
    StateChanged { profile_id: String, connected: bool },
}

#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<SessionEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        let (tx, rx) = channel::unbounded();
        lock(&self.subscribers).push(tx);
        rx
    }

    pub fn publish(&self, event: SessionEvent) {
        log::debug!("Publishing {:?}", event);
        lock(&self.subscribers).retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }
}
