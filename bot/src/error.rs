//! Error types for family tree operations.

use thiserror::Error;

use crate::engine::tree_node::{ServerId, UserId};

/// Result type for family tree operations.
pub type Result<T> = std::result::Result<T, TreeError>;

/// Errors raised by the tree engine, the registry and the tree store.
///
/// Every error is raised before any state is written, so a failed call
/// leaves the tree exactly as it was.
#[derive(Debug, Error)]
pub enum TreeError {
    /// A node with this id is already in the tree.
    #[error("Node for user {0} already exists")]
    DuplicateId(UserId),

    /// A second node without an inviter, or a root that has one.
    #[error("Invalid root node (user {0}): a tree has exactly one root, without an inviter")]
    InvalidRoot(UserId),

    /// The inviter of a new node is not in the tree.
    #[error("Inviter {inviter_id} of user {user_id} does not exist in the tree")]
    UnknownInviter { user_id: UserId, inviter_id: UserId },

    /// Lookup failed.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The root node can never be removed.
    #[error("Cannot remove the root node {0}")]
    CannotRemoveRoot(String),

    /// A tree is already registered for this server.
    #[error("Family tree for server {0} already exists")]
    AlreadyExists(ServerId),

    #[error("Cannot convert an empty record list to a tree")]
    EmptyRecordList,

    /// A record names an inviter that has no record of its own.
    #[error("Record for user {user_id} references unknown inviter {inviter_id}")]
    DanglingInviterReference { user_id: UserId, inviter_id: UserId },

    #[error("No root record (null inviter) found")]
    NoRootFound,

    #[error("Multiple root records found: {0:?}")]
    MultipleRootsFound(Vec<UserId>),

    /// The inviter chain of this node never reaches the root.
    #[error("Inviter chain of user {0} does not reach the root")]
    CyclicInviterChain(UserId),

    /// The persisted store could not be parsed or decoded.
    #[error("Corrupt tree store: {0}")]
    CorruptStore(String),

    /// Empty nickname or background color.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// The invite resolver has nothing to attribute a join to.
    #[error("Unable to determine who invited user {user_id} to server {server_id}")]
    NoInviteRecorded { server_id: ServerId, user_id: UserId },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
