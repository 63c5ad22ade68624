//! Conversion between family trees and flat record lists.

use std::collections::{HashMap, VecDeque};

use super::models::NodeRecord;
use crate::engine::family_tree::FamilyTree;
use crate::engine::tree_node::{TreeNode, UserId};
use crate::error::{Result, TreeError};

/// Flatten a tree into records. Record order is not significant; every
/// `inviter_id` refers to another record of the same list.
pub fn encode(tree: &FamilyTree) -> Vec<NodeRecord> {
    tree.get_view().iter().map(NodeRecord::from).collect()
}

/// Rebuild a tree from records listed in any order.
///
/// Nodes are first built unlinked and indexed by id, then linked to their
/// inviters through the index, so a record may name an inviter that appears
/// later in the list. The tree is then grown outwards from the root with
/// [`FamilyTree::add_node`], which re-checks every insertion.
pub fn decode(records: &[NodeRecord]) -> Result<FamilyTree> {
    if records.is_empty() {
        return Err(TreeError::EmptyRecordList);
    }

    // Pass 1: build every node without its inviter.
    let mut index: HashMap<UserId, TreeNode> = HashMap::with_capacity(records.len());
    for record in records {
        let node = TreeNode::new(
            record.id,
            record.username.as_str(),
            record.discriminator,
            record.nickname.as_str(),
            record.background_color.as_str(),
            None,
        )?;
        if index.insert(record.id, node).is_some() {
            return Err(TreeError::DuplicateId(record.id));
        }
    }

    // Pass 2: resolve inviters by id and find the root.
    let mut roots = Vec::new();
    let mut children: HashMap<UserId, Vec<UserId>> = HashMap::new();
    for record in records {
        let Some(inviter_id) = record.inviter_id else {
            roots.push(record.id);
            continue;
        };
        if !index.contains_key(&inviter_id) {
            return Err(TreeError::DanglingInviterReference {
                user_id: record.id,
                inviter_id,
            });
        }
        if let Some(node) = index.get_mut(&record.id) {
            node.set_inviter(Some(inviter_id));
        }
        children.entry(inviter_id).or_default().push(record.id);
    }

    let root_id = match roots.as_slice() {
        [] => return Err(TreeError::NoRootFound),
        [root_id] => *root_id,
        _ => return Err(TreeError::MultipleRootsFound(roots)),
    };

    let root = index.remove(&root_id).ok_or(TreeError::NoRootFound)?;
    let mut tree = FamilyTree::new(root)?;

    // Insert parents before children.
    let mut queue = VecDeque::from([root_id]);
    while let Some(parent_id) = queue.pop_front() {
        for child_id in children.remove(&parent_id).unwrap_or_default() {
            if let Some(node) = index.remove(&child_id) {
                tree.add_node(node)?;
                queue.push_back(child_id);
            }
        }
    }

    // Anything left is on an inviter cycle that never reaches the root.
    if let Some(record) = records.iter().find(|r| index.contains_key(&r.id)) {
        return Err(TreeError::CyclicInviterChain(record.id));
    }

    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: UserId, username: &str, inviter_id: Option<UserId>) -> NodeRecord {
        NodeRecord {
            id,
            username: username.into(),
            discriminator: 0,
            nickname: username.to_uppercase(),
            background_color: "#FFFFFF".into(),
            inviter_id,
        }
    }

    fn inviter_map(tree: &FamilyTree) -> Vec<(UserId, Option<UserId>)> {
        let mut pairs: Vec<_> = tree
            .get_view()
            .iter()
            .map(|n| (n.id(), n.inviter()))
            .collect();
        pairs.sort();
        pairs
    }

    #[test]
    fn test_encode_decode_preserves_relationships() {
        let mut tree =
            FamilyTree::new(TreeNode::new(1, "alice", 0, "A", "#FFFFFF", None).unwrap()).unwrap();
        tree.add_node(TreeNode::new(2, "bob", 3, "B", "#FF0000", Some(1)).unwrap())
            .unwrap();
        tree.add_node(TreeNode::new(3, "carol", 0, "C", "#00FF00", Some(2)).unwrap())
            .unwrap();
        tree.add_node(TreeNode::new(4, "dave", 0, "D", "#0000FF", Some(1)).unwrap())
            .unwrap();

        let records = encode(&tree);
        assert_eq!(records.len(), 4);

        let restored = decode(&records).unwrap();
        assert_eq!(inviter_map(&restored), inviter_map(&tree));
        assert_eq!(restored.root().id(), 1);

        let bob = restored.find_node_by_user_id(2).unwrap();
        assert_eq!(bob.full_username(), "bob#3");
        assert_eq!(bob.nickname(), "B");
        assert_eq!(bob.background_color(), "#FF0000");
    }

    #[test]
    fn test_decode_forward_references() {
        // Children listed before their inviters, root last
        let records = vec![
            record(3, "carol", Some(2)),
            record(2, "bob", Some(1)),
            record(1, "alice", None),
        ];
        let tree = decode(&records).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(
            inviter_map(&tree),
            vec![(1, None), (2, Some(1)), (3, Some(2))]
        );
    }

    #[test]
    fn test_decode_empty() {
        assert!(matches!(decode(&[]), Err(TreeError::EmptyRecordList)));
    }

    #[test]
    fn test_decode_no_root() {
        let records = vec![record(1, "alice", Some(2)), record(2, "bob", Some(1))];
        assert!(matches!(decode(&records), Err(TreeError::NoRootFound)));
    }

    #[test]
    fn test_decode_multiple_roots() {
        let records = vec![
            record(1, "alice", None),
            record(2, "bob", None),
            record(3, "carol", Some(1)),
        ];
        match decode(&records) {
            Err(TreeError::MultipleRootsFound(ids)) => assert_eq!(ids, vec![1, 2]),
            other => panic!("expected MultipleRootsFound, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_dangling_inviter() {
        let records = vec![record(1, "alice", None), record(2, "bob", Some(77))];
        assert!(matches!(
            decode(&records),
            Err(TreeError::DanglingInviterReference {
                user_id: 2,
                inviter_id: 77
            })
        ));
    }

    #[test]
    fn test_decode_duplicate_id() {
        let records = vec![record(1, "alice", None), record(1, "alice2", Some(1))];
        assert!(matches!(decode(&records), Err(TreeError::DuplicateId(1))));
    }

    #[test]
    fn test_decode_cycle_detached_from_root() {
        let records = vec![
            record(1, "alice", None),
            record(2, "bob", Some(3)),
            record(3, "carol", Some(2)),
        ];
        assert!(matches!(
            decode(&records),
            Err(TreeError::CyclicInviterChain(2))
        ));
    }

    #[test]
    fn test_decode_self_invite() {
        let records = vec![record(1, "alice", None), record(2, "bob", Some(2))];
        assert!(matches!(
            decode(&records),
            Err(TreeError::CyclicInviterChain(2))
        ));
    }

    #[test]
    fn test_decode_rejects_empty_nickname() {
        let mut bad = record(1, "alice", None);
        bad.nickname.clear();
        assert!(matches!(decode(&[bad]), Err(TreeError::InvalidValue(_))));
    }
}
