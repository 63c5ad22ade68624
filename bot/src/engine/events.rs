use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

use super::family_tree::FamilyTree;
use super::tree_node::ServerId;
use crate::store::codec;
use crate::store::models::NodeRecord;

/// Maximum queued events for a channel subscriber (a stalled consumer drops
/// events instead of blocking tree mutations).
pub const MAX_QUEUED_EVENTS: usize = 1024;

/// Receives registry lifecycle notifications.
///
/// Callbacks run synchronously on the mutating thread, while the registry
/// holds the write guard of the affected entry. They must not call back into
/// the registry.
pub trait RegistryObserver: Send + Sync {
    /// A tree was registered for a server. The tree holds at least its root.
    fn on_tree_created(&self, _server_id: ServerId, _tree: &FamilyTree) {}

    /// A registered tree was mutated.
    fn on_tree_modified(&self, _server_id: ServerId, _tree: &FamilyTree) {}

    /// A server was removed; `tree` is the tree that was dropped from the registry.
    fn on_tree_removed(&self, _server_id: ServerId, _tree: &FamilyTree) {}
}

/// Registered observers, shared between the registry and the pass-through
/// subscriptions it attaches to each tree.
#[derive(Default)]
pub struct ObserverList {
    observers: RwLock<Vec<Arc<dyn RegistryObserver>>>,
}

impl ObserverList {
    pub fn push(&self, observer: Arc<dyn RegistryObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current list, so callbacks run without the lock held.
    fn snapshot(&self) -> Vec<Arc<dyn RegistryObserver>> {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn tree_created(&self, server_id: ServerId, tree: &FamilyTree) {
        for observer in self.snapshot() {
            observer.on_tree_created(server_id, tree);
        }
    }

    pub fn tree_modified(&self, server_id: ServerId, tree: &FamilyTree) {
        for observer in self.snapshot() {
            observer.on_tree_modified(server_id, tree);
        }
    }

    pub fn tree_removed(&self, server_id: ServerId, tree: &FamilyTree) {
        for observer in self.snapshot() {
            observer.on_tree_removed(server_id, tree);
        }
    }
}

/// Serializable form of a registry notification, for consumers that live on
/// the other side of a channel (diagram generation, logging).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeEvent {
    /// A tree was created for a newly added server.
    TreeCreated {
        server_id: ServerId,
        nodes: Vec<NodeRecord>,
    },

    /// A tree changed. Carries the full node list after the change.
    TreeModified {
        server_id: ServerId,
        nodes: Vec<NodeRecord>,
    },

    /// The server was removed and its tree dropped.
    TreeRemoved { server_id: ServerId },
}

impl TreeEvent {
    pub fn server_id(&self) -> ServerId {
        match self {
            TreeEvent::TreeCreated { server_id, .. }
            | TreeEvent::TreeModified { server_id, .. }
            | TreeEvent::TreeRemoved { server_id } => *server_id,
        }
    }
}

/// Observer that forwards every notification as a [`TreeEvent`] over a
/// bounded channel.
pub struct EventForwarder {
    outbound: mpsc::Sender<TreeEvent>,
}

impl EventForwarder {
    /// Create a forwarder and the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::Receiver<TreeEvent>) {
        let (tx, rx) = mpsc::channel(MAX_QUEUED_EVENTS);
        (Self { outbound: tx }, rx)
    }

    /// Returns false if the receiver is gone or the queue is full.
    fn send(&self, event: TreeEvent) -> bool {
        self.outbound.try_send(event).is_ok()
    }

    fn forward(&self, event: TreeEvent) {
        let server_id = event.server_id();
        if !self.send(event) {
            warn!(%server_id, "tree event dropped (queue full or receiver closed)");
        }
    }
}

impl RegistryObserver for EventForwarder {
    fn on_tree_created(&self, server_id: ServerId, tree: &FamilyTree) {
        self.forward(TreeEvent::TreeCreated {
            server_id,
            nodes: codec::encode(tree),
        });
    }

    fn on_tree_modified(&self, server_id: ServerId, tree: &FamilyTree) {
        self.forward(TreeEvent::TreeModified {
            server_id,
            nodes: codec::encode(tree),
        });
    }

    fn on_tree_removed(&self, server_id: ServerId, _tree: &FamilyTree) {
        self.forward(TreeEvent::TreeRemoved { server_id });
    }
}
