use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::tree_node::{TreeNode, UserId};

/// Flat, persisted form of one tree node. The inviter is referenced by id,
/// so a list of records can be stored in any order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: UserId,
    pub username: String,
    pub discriminator: u32,
    pub nickname: String,
    pub background_color: String,
    /// `null` for the root record.
    pub inviter_id: Option<UserId>,
}

impl From<&TreeNode> for NodeRecord {
    fn from(node: &TreeNode) -> Self {
        Self {
            id: node.id(),
            username: node.username().to_string(),
            discriminator: node.discriminator(),
            nickname: node.nickname().to_string(),
            background_color: node.background_color().to_string(),
            inviter_id: node.inviter(),
        }
    }
}

/// The whole store file: stringified server id -> that server's records.
pub type StoreDocument = BTreeMap<String, Vec<NodeRecord>>;
