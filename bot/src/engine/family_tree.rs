use std::collections::HashMap;
use std::fmt;

use super::tree_node::{TreeNode, UserId, full_username};
use super::tree_view::TreeView;
use crate::error::{Result, TreeError};

/// Callback fired after every successful mutation of a tree.
pub type ModifiedHandler = Box<dyn Fn(&FamilyTree) + Send + Sync>;

/// The invite tree of one server.
///
/// Always holds exactly one root (a node without inviter), and every other
/// node's inviter is a node of the same tree. All checks of a mutating call
/// run before anything is written, so a failed call leaves the tree as it was.
pub struct FamilyTree {
    root_id: UserId,
    /// All nodes, keyed by member id.
    nodes: HashMap<UserId, TreeNode>,
    /// Insertion order of `nodes`, used for views.
    order: Vec<UserId>,
    on_modified: Vec<ModifiedHandler>,
}

impl FamilyTree {
    /// Create a tree holding only `root`. The root must not have an inviter.
    pub fn new(root: TreeNode) -> Result<Self> {
        if root.inviter().is_some() {
            return Err(TreeError::InvalidRoot(root.id()));
        }

        let root_id = root.id();
        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);

        Ok(Self {
            root_id,
            nodes,
            order: vec![root_id],
            on_modified: Vec::new(),
        })
    }

    /// Number of nodes in the tree. Never zero.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a tree is created with its root and the root is never removed.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[&self.root_id]
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.nodes.contains_key(&user_id)
    }

    /// Subscribe to modifications. Handlers run synchronously, in
    /// subscription order, after each successful mutation.
    pub fn on_modified<F>(&mut self, handler: F)
    where
        F: Fn(&FamilyTree) + Send + Sync + 'static,
    {
        self.on_modified.push(Box::new(handler));
    }

    /// Drop every modification handler.
    pub fn clear_subscribers(&mut self) {
        self.on_modified.clear();
    }

    fn notify_modified(&self) {
        for handler in &self.on_modified {
            handler(self);
        }
    }

    // ── Mutations ───────────────────────────────────────────────────

    /// Add a member. The node's inviter must already be in the tree.
    pub fn add_node(&mut self, node: TreeNode) -> Result<()> {
        if self.nodes.contains_key(&node.id()) {
            return Err(TreeError::DuplicateId(node.id()));
        }

        let Some(inviter_id) = node.inviter() else {
            return Err(TreeError::InvalidRoot(node.id()));
        };
        if !self.nodes.contains_key(&inviter_id) {
            return Err(TreeError::UnknownInviter {
                user_id: node.id(),
                inviter_id,
            });
        }

        let id = node.id();
        self.nodes.insert(id, node);
        self.order.push(id);

        self.notify_modified();
        Ok(())
    }

    /// Remove the member matching `node`'s username and discriminator.
    ///
    /// The node is resolved by its full username, not by identity. Its direct
    /// children are re-parented to its own inviter. Returns the removed node.
    pub fn remove_node(&mut self, node: &TreeNode) -> Result<TreeNode> {
        let target_id = self
            .find_node_by_username(node.username(), node.discriminator())?
            .id();
        self.remove_resolved(target_id)
    }

    /// Same as [`remove_node`](Self::remove_node), resolving the node by id.
    pub fn remove_node_by_user_id(&mut self, user_id: UserId) -> Result<TreeNode> {
        let target_id = self.find_node_by_user_id(user_id)?.id();
        self.remove_resolved(target_id)
    }

    fn remove_resolved(&mut self, target_id: UserId) -> Result<TreeNode> {
        let target = &self.nodes[&target_id];
        if target_id == self.root_id {
            return Err(TreeError::CannotRemoveRoot(target.full_username()));
        }

        // Only the root lacks an inviter, so this is always Some.
        let new_inviter = target.inviter();

        // Collect every child before touching anything.
        let child_ids: Vec<UserId> = self
            .get_view()
            .filter_to_child_nodes(target)
            .iter()
            .map(TreeNode::id)
            .collect();

        for child_id in child_ids {
            if let Some(child) = self.nodes.get_mut(&child_id) {
                child.set_inviter(new_inviter);
            }
        }

        let removed = self
            .nodes
            .remove(&target_id)
            .ok_or_else(|| TreeError::NotFound(format!("Node for user {target_id}")))?;
        self.order.retain(|id| *id != target_id);

        self.notify_modified();
        Ok(removed)
    }

    /// Change a member's nickname.
    pub fn update_nickname(&mut self, user_id: UserId, nickname: &str) -> Result<()> {
        let node = self
            .nodes
            .get_mut(&user_id)
            .ok_or_else(|| TreeError::NotFound(format!("Node for user {user_id}")))?;
        node.set_nickname(nickname)?;

        self.notify_modified();
        Ok(())
    }

    /// Change the background color of a member's diagram node.
    pub fn update_background_color(&mut self, user_id: UserId, color: &str) -> Result<()> {
        let node = self
            .nodes
            .get_mut(&user_id)
            .ok_or_else(|| TreeError::NotFound(format!("Node for user {user_id}")))?;
        node.set_background_color(color)?;

        self.notify_modified();
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub fn find_node_by_user_id(&self, user_id: UserId) -> Result<&TreeNode> {
        let view = self.get_view().filter_by_user_id(user_id);
        debug_assert!(view.len() <= 1);
        view.first()
            .ok_or_else(|| TreeError::NotFound(format!("Node for user {user_id}")))
    }

    pub fn find_node_by_username(&self, username: &str, discriminator: u32) -> Result<&TreeNode> {
        self.get_view()
            .filter_by_username(username)
            .filter_by_discriminator(discriminator)
            .first()
            .ok_or_else(|| {
                TreeError::NotFound(format!(
                    "Node for user {}",
                    full_username(username, discriminator)
                ))
            })
    }

    /// View over every node, in insertion order.
    pub fn get_view(&self) -> TreeView<'_> {
        TreeView::new(self.order.iter().filter_map(|id| self.nodes.get(id)))
    }
}

impl fmt::Debug for FamilyTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FamilyTree")
            .field("root_id", &self.root_id)
            .field("nodes", &self.get_view().iter().collect::<Vec<_>>())
            .field("subscribers", &self.on_modified.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use proptest::prelude::*;

    use super::*;
    use crate::engine::tree_node::DEFAULT_BACKGROUND_COLOR;

    fn node(id: UserId, username: &str, inviter: Option<UserId>) -> TreeNode {
        TreeNode::new(id, username, 0, username, DEFAULT_BACKGROUND_COLOR, inviter).unwrap()
    }

    /// alice(1) -> bob(2) -> carol(3)
    fn setup_tree() -> FamilyTree {
        let mut tree = FamilyTree::new(node(1, "alice", None)).unwrap();
        tree.add_node(node(2, "bob", Some(1))).unwrap();
        tree.add_node(node(3, "carol", Some(2))).unwrap();
        tree
    }

    fn inviter_of(tree: &FamilyTree, id: UserId) -> Option<UserId> {
        tree.find_node_by_user_id(id).unwrap().inviter()
    }

    #[test]
    fn test_new_tree_has_only_root() {
        let tree = FamilyTree::new(node(1, "alice", None)).unwrap();
        assert_eq!(tree.len(), 1);
        assert!(!tree.is_empty());
        assert_eq!(tree.root().id(), 1);
        assert!(tree.root().is_root());
    }

    #[test]
    fn test_new_rejects_root_with_inviter() {
        let err = FamilyTree::new(node(1, "alice", Some(5))).unwrap_err();
        assert!(matches!(err, TreeError::InvalidRoot(1)));
    }

    #[test]
    fn test_add_node() {
        let tree = setup_tree();
        assert_eq!(tree.len(), 3);
        assert_eq!(inviter_of(&tree, 3), Some(2));
    }

    #[test]
    fn test_add_duplicate_id_leaves_tree_unchanged() {
        let mut tree = setup_tree();
        let err = tree.add_node(node(2, "impostor", Some(1))).unwrap_err();
        assert!(matches!(err, TreeError::DuplicateId(2)));
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.find_node_by_user_id(2).unwrap().username(), "bob");
    }

    #[test]
    fn test_add_second_root_fails() {
        let mut tree = setup_tree();
        let err = tree.add_node(node(4, "dave", None)).unwrap_err();
        assert!(matches!(err, TreeError::InvalidRoot(4)));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_add_with_unknown_inviter_fails() {
        let mut tree = setup_tree();
        let err = tree.add_node(node(4, "dave", Some(42))).unwrap_err();
        assert!(matches!(
            err,
            TreeError::UnknownInviter {
                user_id: 4,
                inviter_id: 42
            }
        ));
        assert!(!tree.contains(4));
    }

    #[test]
    fn test_remove_middle_node_reparents_children() {
        let mut tree = setup_tree();
        let bob = tree.find_node_by_user_id(2).unwrap().clone();

        let removed = tree.remove_node(&bob).unwrap();
        assert_eq!(removed.id(), 2);
        assert_eq!(tree.len(), 2);
        assert_eq!(inviter_of(&tree, 3), Some(1));
        assert!(!tree.contains(2));
    }

    #[test]
    fn test_remove_reparents_all_children_one_level() {
        // alice(1) -> bob(2) -> {carol(3) -> erin(5), dave(4)}
        let mut tree = setup_tree();
        tree.add_node(node(4, "dave", Some(2))).unwrap();
        tree.add_node(node(5, "erin", Some(3))).unwrap();

        tree.remove_node_by_user_id(2).unwrap();

        assert_eq!(inviter_of(&tree, 3), Some(1));
        assert_eq!(inviter_of(&tree, 4), Some(1));
        // Grandchildren keep their own inviter
        assert_eq!(inviter_of(&tree, 5), Some(3));
    }

    #[test]
    fn test_remove_resolves_by_full_username() {
        let mut tree = setup_tree();
        // Different id and nickname, same username#discriminator as bob
        let stale = TreeNode::new(200, "bob", 0, "Old Bob", "#000000", Some(1)).unwrap();
        let removed = tree.remove_node(&stale).unwrap();
        assert_eq!(removed.id(), 2);
    }

    #[test]
    fn test_remove_unknown_node_fails() {
        let mut tree = setup_tree();
        let stranger = node(9, "mallory", Some(1));
        assert!(matches!(
            tree.remove_node(&stranger),
            Err(TreeError::NotFound(_))
        ));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_remove_root_fails() {
        let mut tree = setup_tree();
        let root = tree.root().clone();
        assert!(matches!(
            tree.remove_node(&root),
            Err(TreeError::CannotRemoveRoot(_))
        ));
        assert!(matches!(
            tree.remove_node_by_user_id(1),
            Err(TreeError::CannotRemoveRoot(_))
        ));
        assert_eq!(tree.len(), 3);
        assert_eq!(inviter_of(&tree, 2), Some(1));
    }

    #[test]
    fn test_find_node_by_user_id_missing() {
        let tree = setup_tree();
        assert!(matches!(
            tree.find_node_by_user_id(999),
            Err(TreeError::NotFound(_))
        ));
    }

    #[test]
    fn test_find_node_by_username() {
        let mut tree = setup_tree();
        tree.add_node(TreeNode::new(4, "bob", 1234, "Other Bob", "#FFFFFF", Some(1)).unwrap())
            .unwrap();

        assert_eq!(tree.find_node_by_username("bob", 0).unwrap().id(), 2);
        assert_eq!(tree.find_node_by_username("bob", 1234).unwrap().id(), 4);
        assert!(matches!(
            tree.find_node_by_username("bob", 1),
            Err(TreeError::NotFound(_))
        ));
    }

    #[test]
    fn test_view_follows_insertion_order() {
        let mut tree = setup_tree();
        tree.add_node(node(4, "dave", Some(1))).unwrap();
        tree.remove_node_by_user_id(3).unwrap();

        let ids: Vec<UserId> = tree.get_view().iter().map(|n| n.id()).collect();
        assert_eq!(ids, vec![1, 2, 4]);
    }

    #[test]
    fn test_update_nickname_and_color() {
        let mut tree = setup_tree();
        tree.update_nickname(2, "Bobby").unwrap();
        tree.update_background_color(2, "#00FF00").unwrap();

        let bob = tree.find_node_by_user_id(2).unwrap();
        assert_eq!(bob.nickname(), "Bobby");
        assert_eq!(bob.background_color(), "#00FF00");

        assert!(matches!(
            tree.update_nickname(2, ""),
            Err(TreeError::InvalidValue(_))
        ));
        assert!(matches!(
            tree.update_nickname(999, "ghost"),
            Err(TreeError::NotFound(_))
        ));
        assert_eq!(tree.find_node_by_user_id(2).unwrap().nickname(), "Bobby");
    }

    #[test]
    fn test_modified_fires_only_on_success() {
        let mut tree = FamilyTree::new(node(1, "alice", None)).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let sizes = Arc::new(std::sync::Mutex::new(Vec::new()));

        let c = count.clone();
        let s = sizes.clone();
        tree.on_modified(move |t| {
            c.fetch_add(1, Ordering::SeqCst);
            s.lock().unwrap().push(t.len());
        });

        tree.add_node(node(2, "bob", Some(1))).unwrap();
        let _ = tree.add_node(node(2, "bob", Some(1)));
        let _ = tree.remove_node_by_user_id(1);
        tree.update_nickname(2, "B").unwrap();
        tree.remove_node_by_user_id(2).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(*sizes.lock().unwrap(), vec![2, 2, 1]);
    }

    /// Build a tree where node `i + 2` is invited by an already present node
    /// picked by `picks[i]`.
    fn build_from_picks(picks: &[usize]) -> FamilyTree {
        let mut tree = FamilyTree::new(node(1, "root", None)).unwrap();
        let mut ids: Vec<UserId> = vec![1];
        for (i, pick) in picks.iter().enumerate() {
            let id = i as UserId + 2;
            let inviter = ids[pick % ids.len()];
            tree.add_node(node(id, &format!("user{id}"), Some(inviter)))
                .unwrap();
            ids.push(id);
        }
        tree
    }

    fn assert_well_formed(tree: &FamilyTree) {
        let view = tree.get_view();
        let roots = view.filter_by(|n| n.inviter().is_none());
        assert_eq!(roots.len(), 1);
        assert_eq!(roots.first().unwrap().id(), tree.root().id());
        for n in view.iter() {
            if let Some(inviter) = n.inviter() {
                assert!(tree.contains(inviter), "dangling inviter {inviter}");
            }
        }
    }

    proptest! {
        #[test]
        fn prop_valid_adds_keep_single_root(picks in proptest::collection::vec(0usize..64, 0..40)) {
            let tree = build_from_picks(&picks);
            prop_assert_eq!(tree.len(), 1 + picks.len());
            assert_well_formed(&tree);
        }

        #[test]
        fn prop_removals_keep_tree_well_formed(
            picks in proptest::collection::vec(0usize..64, 1..40),
            removals in proptest::collection::vec(0usize..64, 0..20),
        ) {
            let mut tree = build_from_picks(&picks);
            for r in removals {
                let members: Vec<UserId> = tree
                    .get_view()
                    .filter_by(|n| !n.is_root())
                    .iter()
                    .map(|n| n.id())
                    .collect();
                if members.is_empty() {
                    break;
                }
                let victim = members[r % members.len()];
                let expected_parent = tree.find_node_by_user_id(victim).unwrap().inviter();
                let children: Vec<UserId> = {
                    let victim_node = tree.find_node_by_user_id(victim).unwrap();
                    tree.get_view()
                        .filter_to_child_nodes(victim_node)
                        .iter()
                        .map(|n| n.id())
                        .collect()
                };

                let before = tree.len();
                tree.remove_node_by_user_id(victim).unwrap();
                prop_assert_eq!(tree.len(), before - 1);
                for child in children {
                    prop_assert_eq!(tree.find_node_by_user_id(child).unwrap().inviter(), expected_parent);
                }
                assert_well_formed(&tree);
            }
        }
    }
}
