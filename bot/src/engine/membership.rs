use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::invite::{InviteRecord, InviteResolver};
use super::registry::FamilyTreeRegistry;
use super::tree_node::{ServerId, TreeNode, UserId};
use crate::error::Result;

/// Applies chat-server membership events to the family trees.
///
/// This is the single entry point for event sources (the gateway connection
/// in production, the REPL when testing locally).
pub struct MembershipSync {
    registry: Arc<FamilyTreeRegistry>,
    invites: Arc<dyn InviteResolver>,
    /// Background color given to every new node.
    default_color: String,
}

impl MembershipSync {
    pub fn new(
        registry: Arc<FamilyTreeRegistry>,
        invites: Arc<dyn InviteResolver>,
        default_color: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            invites,
            default_color: default_color.into(),
        }
    }

    pub fn registry(&self) -> &FamilyTreeRegistry {
        &self.registry
    }

    /// The bot was added to a server. The owner becomes the root.
    pub fn on_server_added(
        &self,
        server_id: ServerId,
        owner_id: UserId,
        owner_username: &str,
        owner_discriminator: u32,
        owner_nickname: &str,
    ) -> Result<()> {
        let root = TreeNode::new(
            owner_id,
            owner_username,
            owner_discriminator,
            owner_nickname,
            self.default_color.as_str(),
            None,
        )?;
        self.registry.register_server(server_id, root)
    }

    /// The bot was removed from a server.
    pub fn on_server_removed(&self, server_id: ServerId) -> Result<()> {
        self.registry.remove_server(server_id)?;
        self.invites.forget_server(server_id);
        Ok(())
    }

    pub fn on_invite_created(
        &self,
        server_id: ServerId,
        inviter_id: UserId,
        code: &str,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) {
        info!(%server_id, %inviter_id, %code, "invite recorded");
        self.invites.record_invite(
            server_id,
            InviteRecord {
                inviter_id,
                code: code.to_string(),
                created_at,
                expires_at,
            },
        );
    }

    /// A member joined. Their nickname starts out as their username.
    pub fn on_user_joined(
        &self,
        server_id: ServerId,
        user_id: UserId,
        username: &str,
        discriminator: u32,
    ) -> Result<()> {
        let inviter_id = self.invites.get_inviter(server_id, user_id)?;
        let node = TreeNode::new(
            user_id,
            username,
            discriminator,
            username,
            self.default_color.as_str(),
            Some(inviter_id),
        )?;

        self.registry.get_tree_mut(server_id)?.add_node(node)?;
        info!(%server_id, %user_id, %inviter_id, "member added to family tree");
        Ok(())
    }

    /// A member left. Their invitees move up to the member's own inviter.
    pub fn on_user_left(&self, server_id: ServerId, user_id: UserId) -> Result<TreeNode> {
        let removed = self
            .registry
            .get_tree_mut(server_id)?
            .remove_node_by_user_id(user_id)?;

        info!(%server_id, %user_id, "member removed from family tree");
        Ok(removed)
    }

    pub fn on_user_nickname_changed(
        &self,
        server_id: ServerId,
        user_id: UserId,
        nickname: &str,
    ) -> Result<()> {
        self.registry
            .get_tree_mut(server_id)?
            .update_nickname(user_id, nickname)
    }
}
