use super::tree_node::{TreeNode, UserId};

/// Read-only projection over a set of tree nodes.
///
/// Nodes are yielded in the order the view was built from. Every filter
/// returns a new view and leaves both the source view and the nodes
/// untouched, so filters can be chained:
///
/// ```ignore
/// let view = tree.get_view().filter_by_username("alice").filter_by_discriminator(0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TreeView<'a> {
    nodes: Vec<&'a TreeNode>,
}

impl<'a> TreeView<'a> {
    pub fn new(nodes: impl IntoIterator<Item = &'a TreeNode>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a TreeNode> + '_ {
        self.nodes.iter().copied()
    }

    /// First node of the view, if any.
    pub fn first(&self) -> Option<&'a TreeNode> {
        self.nodes.first().copied()
    }

    /// Keep only the nodes matching `predicate`.
    pub fn filter_by<P>(&self, mut predicate: P) -> TreeView<'a>
    where
        P: FnMut(&TreeNode) -> bool,
    {
        TreeView {
            nodes: self
                .nodes
                .iter()
                .copied()
                .filter(|node| predicate(node))
                .collect(),
        }
    }

    /// Ids are unique within a tree, so the result holds at most one node.
    pub fn filter_by_user_id(&self, user_id: UserId) -> TreeView<'a> {
        self.filter_by(|node| node.id() == user_id)
    }

    pub fn filter_by_username(&self, username: &str) -> TreeView<'a> {
        self.filter_by(|node| node.username() == username)
    }

    pub fn filter_by_discriminator(&self, discriminator: u32) -> TreeView<'a> {
        self.filter_by(|node| node.discriminator() == discriminator)
    }

    pub fn filter_by_nickname(&self, nickname: &str) -> TreeView<'a> {
        self.filter_by(|node| node.nickname() == nickname)
    }

    /// Nodes directly invited by `parent`. Matches on the parent's id only.
    pub fn filter_to_child_nodes(&self, parent: &TreeNode) -> TreeView<'a> {
        let parent_id = parent.id();
        self.filter_by(|node| node.inviter() == Some(parent_id))
    }
}

impl<'a> IntoIterator for TreeView<'a> {
    type Item = &'a TreeNode;
    type IntoIter = std::vec::IntoIter<&'a TreeNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

impl<'a, 'v> IntoIterator for &'v TreeView<'a> {
    type Item = &'a TreeNode;
    type IntoIter = std::iter::Copied<std::slice::Iter<'v, &'a TreeNode>>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter().copied()
    }
}
