use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use dashmap::mapref::one::{Ref, RefMut};
use tracing::info;

use super::events::{ObserverList, RegistryObserver};
use super::family_tree::FamilyTree;
use super::tree_node::{ServerId, TreeNode};
use crate::error::{Result, TreeError};

/// Keeps one family tree per server and re-publishes tree changes tagged with
/// the owning server id.
///
/// Each entry lives behind a DashMap shard lock, so every mutation made
/// through [`get_tree_mut`](Self::get_tree_mut) is a critical section for
/// that tree. Observers are notified while the guard is held.
pub struct FamilyTreeRegistry {
    trees: DashMap<ServerId, FamilyTree>,
    observers: Arc<ObserverList>,
}

impl Default for FamilyTreeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FamilyTreeRegistry {
    pub fn new() -> Self {
        Self {
            trees: DashMap::new(),
            observers: Arc::new(ObserverList::default()),
        }
    }

    /// Register an observer for tree created/modified/removed notifications.
    pub fn subscribe(&self, observer: Arc<dyn RegistryObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn contains(&self, server_id: ServerId) -> bool {
        self.trees.contains_key(&server_id)
    }

    /// Ids of every registered server, sorted.
    pub fn server_ids(&self) -> Vec<ServerId> {
        let mut ids: Vec<ServerId> = self.trees.iter().map(|t| *t.key()).collect();
        ids.sort_unstable();
        ids
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Create the tree of a newly added server, rooted at `root`.
    pub fn register_server(&self, server_id: ServerId, root: TreeNode) -> Result<()> {
        let Entry::Vacant(slot) = self.trees.entry(server_id) else {
            return Err(TreeError::AlreadyExists(server_id));
        };

        let mut tree = FamilyTree::new(root)?;
        self.attach(server_id, &mut tree);
        let tree = slot.insert(tree);
        self.observers.tree_created(server_id, &tree);

        info!(%server_id, root = tree.root().id(), "family tree created");
        Ok(())
    }

    /// Put back a tree loaded from storage. Unlike
    /// [`register_server`](Self::register_server) this emits no "created"
    /// notification, since the tree is already persisted.
    pub fn restore_tree(&self, server_id: ServerId, mut tree: FamilyTree) -> Result<()> {
        let Entry::Vacant(slot) = self.trees.entry(server_id) else {
            return Err(TreeError::AlreadyExists(server_id));
        };

        self.attach(server_id, &mut tree);
        slot.insert(tree);
        Ok(())
    }

    /// Remove a server and return its tree.
    pub fn remove_server(&self, server_id: ServerId) -> Result<FamilyTree> {
        let (_, mut tree) = self
            .trees
            .remove(&server_id)
            .ok_or_else(|| TreeError::NotFound(format!("Family tree for server {server_id}")))?;

        // The tree no longer belongs to the registry; stop forwarding its changes.
        tree.clear_subscribers();
        self.observers.tree_removed(server_id, &tree);

        info!(%server_id, "family tree removed");
        Ok(tree)
    }

    /// Re-emit the tree's modifications as registry notifications for `server_id`.
    fn attach(&self, server_id: ServerId, tree: &mut FamilyTree) {
        let observers = self.observers.clone();
        tree.on_modified(move |tree| observers.tree_modified(server_id, tree));
    }

    // ── Access ──────────────────────────────────────────────────────

    pub fn get_tree(&self, server_id: ServerId) -> Result<Ref<'_, ServerId, FamilyTree>> {
        self.trees
            .get(&server_id)
            .ok_or_else(|| TreeError::NotFound(format!("Family tree for server {server_id}")))
    }

    /// Exclusive access to a server's tree. Do not hold the guard across
    /// another registry call for the same server.
    pub fn get_tree_mut(&self, server_id: ServerId) -> Result<RefMut<'_, ServerId, FamilyTree>> {
        self.trees
            .get_mut(&server_id)
            .ok_or_else(|| TreeError::NotFound(format!("Family tree for server {server_id}")))
    }
}
