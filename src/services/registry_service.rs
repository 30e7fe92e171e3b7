//! Task that owns the [`ConnectionRegistry`].
//!
//! Every mutation goes through one tokio task reached over an unbounded
//! channel, so register, drain and remove are serialized without a lock and
//! a drain is a snapshot no concurrent subscribe can interleave with.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::state::{ConnectionHandle, ConnectionRegistry, PendingSubscription, SubscriptionId};

enum Command {
    Register {
        handle: ConnectionHandle,
        callback: Option<String>,
    },
    DrainAll {
        reply: oneshot::Sender<Vec<PendingSubscription>>,
    },
    Remove {
        id: SubscriptionId,
    },
    Len {
        reply: oneshot::Sender<usize>,
    },
    CloseAll {
        reply: oneshot::Sender<usize>,
    },
}

/// Cloneable access to the registry task.
#[derive(Clone, Debug)]
pub struct RegistryHandle {
    tx: mpsc::UnboundedSender<Command>,
    next_id: Arc<AtomicU64>,
}

impl RegistryHandle {
    /// Spawn the registry task on the current runtime.
    ///
    /// The task stops once every handle has been dropped.
    pub fn spawn() -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(ConnectionRegistry::new(), rx));
        let handle = Self {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        };
        (handle, task)
    }

    /// Generate a fresh id for a subscriber connection.
    pub fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Queue a new pending subscription. Queued before any command sent
    /// afterwards from any handle.
    pub fn register(&self, handle: ConnectionHandle, callback: Option<String>) {
        let id = handle.id();
        if self.tx.send(Command::Register { handle, callback }).is_err() {
            warn!(subscription_id = %id, "registry stopped, subscription dropped");
        }
    }

    /// Take every pending subscription in registration order. Returns an
    /// empty list if the registry task is gone.
    pub async fn drain_all(&self) -> Vec<PendingSubscription> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::DrainAll { reply }).is_err() {
            warn!("registry stopped, nothing to drain");
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Forget a subscription. Unknown or already-removed ids are ignored.
    pub fn remove(&self, id: SubscriptionId) {
        let _ = self.tx.send(Command::Remove { id });
    }

    pub async fn len(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Len { reply }).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    /// Drop every pending subscription without a notification and refuse
    /// new ones from now on. Each held response then ends with an empty body.
    pub async fn close_all(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::CloseAll { reply }).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

async fn run(mut registry: ConnectionRegistry, mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut closing = false;

    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Register { handle, .. } if closing => {
                debug!(subscription_id = %handle.id(), "closing, subscription refused");
            }
            Command::Register { handle, callback } => {
                debug!(subscription_id = %handle.id(), pending = registry.len() + 1, "registered");
                registry.register(handle, callback);
            }
            Command::DrainAll { reply } => {
                let _ = reply.send(registry.drain_all());
            }
            Command::Remove { id } => {
                if registry.remove(id).is_some() {
                    debug!(subscription_id = %id, pending = registry.len(), "removed");
                }
            }
            Command::Len { reply } => {
                let _ = reply.send(registry.len());
            }
            Command::CloseAll { reply } => {
                closing = true;
                let closed = registry.drain_all().len();
                let _ = reply.send(closed);
            }
        }
    }

    debug!("registry task finished");
}
