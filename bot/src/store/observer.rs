use std::sync::Arc;

use tracing::error;

use super::json_store::TreeSerializer;
use crate::engine::events::RegistryObserver;
use crate::engine::family_tree::FamilyTree;
use crate::engine::tree_node::ServerId;

/// Writes every registry change through to a [`TreeSerializer`].
///
/// Storage failures cannot be returned to the code that mutated the tree, so
/// they are logged here.
pub struct PersistOnChange {
    store: Arc<dyn TreeSerializer>,
}

impl PersistOnChange {
    pub fn new(store: Arc<dyn TreeSerializer>) -> Self {
        Self { store }
    }

    fn save(&self, server_id: ServerId, tree: &FamilyTree) {
        if let Err(e) = self.store.save_tree(server_id, tree) {
            error!(%server_id, error = %e, "failed to persist family tree");
        }
    }
}

impl RegistryObserver for PersistOnChange {
    fn on_tree_created(&self, server_id: ServerId, tree: &FamilyTree) {
        self.save(server_id, tree);
    }

    fn on_tree_modified(&self, server_id: ServerId, tree: &FamilyTree) {
        self.save(server_id, tree);
    }

    fn on_tree_removed(&self, server_id: ServerId, _tree: &FamilyTree) {
        if let Err(e) = self.store.remove_tree(server_id) {
            error!(%server_id, error = %e, "failed to remove persisted family tree");
        }
    }
}
