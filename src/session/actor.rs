//! Session actor
//!
//! Owns the [`Session`] on a single task and applies commands one at a
//! time from an mpsc mailbox. Poll timers sleep on their own tasks and
//! post the expiry back into the same mailbox, so they interleave with
//! client events but never run concurrently with them.

use super::{Effect, Session, SessionStats};
use crate::protocol::{ClientEvent, ConnectionId};
use crate::server::hub::Hub;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Session actor errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session actor has stopped")]
    Closed,
}

/// Messages accepted by the session actor
#[derive(Debug)]
pub enum SessionCommand {
    /// Inbound client event
    Event {
        connection: ConnectionId,
        event: ClientEvent,
    },
    /// Connection closed
    Disconnect { connection: ConnectionId },
    /// Poll timer fired
    ExpirePoll { poll_id: String },
    /// Name pre-check
    CheckName {
        name: String,
        reply: oneshot::Sender<bool>,
    },
    /// Health counters
    Stats { reply: oneshot::Sender<SessionStats> },
}

/// Cloneable handle to a running session actor
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// Start the actor. It stops once every handle is dropped.
    pub fn spawn(session: Session, hub: Arc<Hub>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let timers = tx.downgrade();
        let task = tokio::spawn(run(session, hub, rx, timers));
        (Self { tx }, task)
    }

    /// Queue a client event. Best effort: dropped if the actor is gone.
    pub fn dispatch(&self, connection: ConnectionId, event: ClientEvent) {
        self.send(SessionCommand::Event { connection, event });
    }

    /// Report a closed connection
    pub fn disconnect(&self, connection: ConnectionId) {
        self.send(SessionCommand::Disconnect { connection });
    }

    /// Ask whether a student name is free
    pub async fn check_name(&self, name: impl Into<String>) -> Result<bool, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::CheckName {
                name: name.into(),
                reply,
            })
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Snapshot of session counters
    pub async fn stats(&self) -> Result<SessionStats, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Stats { reply })
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    fn send(&self, command: SessionCommand) {
        if self.tx.send(command).is_err() {
            warn!("session actor stopped; command dropped");
        }
    }
}

async fn run(
    mut session: Session,
    hub: Arc<Hub>,
    mut rx: mpsc::UnboundedReceiver<SessionCommand>,
    timers: mpsc::WeakUnboundedSender<SessionCommand>,
) {
    info!("session actor started");
    while let Some(command) = rx.recv().await {
        let effects = match command {
            SessionCommand::Event { connection, event } => {
                debug!(connection = %connection, event = event.name(), "client event");
                session.handle(&connection, event)
            }
            SessionCommand::Disconnect { connection } => session.disconnect(&connection),
            SessionCommand::ExpirePoll { poll_id } => session.expire_poll(&poll_id),
            SessionCommand::CheckName { name, reply } => {
                let _ = reply.send(session.is_name_available(&name));
                continue;
            }
            SessionCommand::Stats { reply } => {
                let _ = reply.send(session.stats());
                continue;
            }
        };
        apply_effects(effects, &hub, &timers);
    }
    info!("session actor stopped");
}

fn apply_effects(
    effects: Vec<Effect>,
    hub: &Hub,
    timers: &mpsc::WeakUnboundedSender<SessionCommand>,
) {
    for effect in effects {
        match effect {
            Effect::Emit { audience, event } => {
                hub.send(&audience, &event);
            }
            Effect::Subscribe { connection, role } => hub.subscribe(&connection, role),
            Effect::Unsubscribe { connection, role } => hub.unsubscribe(&connection, role),
            Effect::Disconnect { connection } => hub.close(&connection),
            Effect::ScheduleClose { poll_id, after } => {
                let timers = timers.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    if let Some(tx) = timers.upgrade() {
                        let _ = tx.send(SessionCommand::ExpirePoll { poll_id });
                    }
                });
            }
        }
    }
}
