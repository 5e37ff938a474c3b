//! Connection hub
//!
//! Tracks the outbound queue of every open WebSocket and fans events out
//! to audiences. Each broadcast is serialized once. Delivery is best
//! effort: a connection whose queue is gone is skipped.

use crate::protocol::{ConnectionId, Role, ServerEvent};
use crate::session::Audience;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Frame queued for a connection's writer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// Serialized server event
    Text(Arc<str>),
    /// Close the socket after everything queued before it
    Close,
}

#[derive(Debug)]
struct ConnectionEntry {
    tx: mpsc::UnboundedSender<Outgoing>,
    roles: HashSet<Role>,
}

/// Registry of open connections
#[derive(Debug, Default)]
pub struct Hub {
    connections: RwLock<HashMap<ConnectionId, ConnectionEntry>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and get the receiving end of its queue
    pub fn register(&self, id: ConnectionId) -> mpsc::UnboundedReceiver<Outgoing> {
        let (tx, rx) = mpsc::unbounded_channel();
        let entry = ConnectionEntry {
            tx,
            roles: HashSet::new(),
        };
        self.connections.write().insert(id.clone(), entry);
        debug!(connection = %id, "connection registered");
        rx
    }

    /// Forget a connection
    pub fn unregister(&self, id: &ConnectionId) {
        if self.connections.write().remove(id).is_some() {
            debug!(connection = %id, "connection unregistered");
        }
    }

    /// Add a connection to the audience for `role`
    pub fn subscribe(&self, id: &ConnectionId, role: Role) {
        if let Some(entry) = self.connections.write().get_mut(id) {
            entry.roles.insert(role);
        }
    }

    /// Take a connection out of the audience for `role`
    pub fn unsubscribe(&self, id: &ConnectionId, role: Role) {
        if let Some(entry) = self.connections.write().get_mut(id) {
            entry.roles.remove(&role);
        }
    }

    /// Whether the connection is subscribed as `role`
    pub fn has_role(&self, id: &ConnectionId, role: Role) -> bool {
        self.connections
            .read()
            .get(id)
            .is_some_and(|entry| entry.roles.contains(&role))
    }

    /// Send an event to an audience. Returns the number of queues reached.
    pub fn send(&self, audience: &Audience, event: &ServerEvent) -> usize {
        let text: Arc<str> = match event.to_json() {
            Ok(json) => json.into(),
            Err(err) => {
                warn!(event = event.name(), error = %err, "failed to serialize event");
                return 0;
            }
        };

        let connections = self.connections.read();
        let mut delivered = 0;
        let mut push = |id: &ConnectionId, entry: &ConnectionEntry| {
            if entry.tx.send(Outgoing::Text(text.clone())).is_ok() {
                delivered += 1;
            } else {
                debug!(connection = %id, event = event.name(), "connection queue closed");
            }
        };

        match audience {
            Audience::All => connections.iter().for_each(|(id, entry)| push(id, entry)),
            Audience::Teachers => connections
                .iter()
                .filter(|(_, entry)| entry.roles.contains(&Role::Teacher))
                .for_each(|(id, entry)| push(id, entry)),
            Audience::Connection(id) => {
                if let Some(entry) = connections.get(id) {
                    push(id, entry);
                }
            }
        }
        delivered
    }

    /// Ask the connection's writer to close the socket
    pub fn close(&self, id: &ConnectionId) {
        if let Some(entry) = self.connections.read().get(id) {
            let _ = entry.tx.send(Outgoing::Close);
        }
    }

    /// Number of open connections
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }
}
