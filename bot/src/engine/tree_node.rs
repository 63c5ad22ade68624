use super::validation;
use crate::error::Result;

/// Unique identifier of a chat server (guild).
pub type ServerId = u64;

/// Unique identifier of a member's account.
pub type UserId = u64;

/// Background color given to nodes that have not picked one.
pub const DEFAULT_BACKGROUND_COLOR: &str = "#FFFFFF";

/// Build the `username#discriminator` form used as a secondary key.
pub fn full_username(username: &str, discriminator: u32) -> String {
    format!("{username}#{discriminator}")
}

/// One member of a family tree.
///
/// The inviter is held as an id rather than a reference: a node never owns
/// its inviter, and the owning tree resolves the id when it needs the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    id: UserId,
    username: String,
    /// Most accounts have a discriminator of 0 since the migration to unique
    /// usernames, but it is still part of the account identity.
    discriminator: u32,
    nickname: String,
    background_color: String,
    inviter: Option<UserId>,
}

impl TreeNode {
    /// Create a node. Fails with `InvalidValue` if the nickname or background
    /// color is empty.
    pub fn new(
        id: UserId,
        username: impl Into<String>,
        discriminator: u32,
        nickname: impl Into<String>,
        background_color: impl Into<String>,
        inviter: Option<UserId>,
    ) -> Result<Self> {
        let nickname = nickname.into();
        let background_color = background_color.into();
        validation::validate_nickname(&nickname)?;
        validation::validate_background_color(&background_color)?;

        Ok(Self {
            id,
            username: username.into(),
            discriminator,
            nickname,
            background_color,
            inviter,
        })
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn discriminator(&self) -> u32 {
        self.discriminator
    }

    /// `username#discriminator`.
    pub fn full_username(&self) -> String {
        full_username(&self.username, self.discriminator)
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn set_nickname(&mut self, nickname: impl Into<String>) -> Result<()> {
        let nickname = nickname.into();
        validation::validate_nickname(&nickname)?;
        self.nickname = nickname;
        Ok(())
    }

    pub fn background_color(&self) -> &str {
        &self.background_color
    }

    pub fn set_background_color(&mut self, color: impl Into<String>) -> Result<()> {
        let color = color.into();
        validation::validate_background_color(&color)?;
        self.background_color = color;
        Ok(())
    }

    /// Id of the member who invited this one. `None` only for the root.
    pub fn inviter(&self) -> Option<UserId> {
        self.inviter
    }

    pub fn set_inviter(&mut self, inviter: Option<UserId>) {
        self.inviter = inviter;
    }

    pub fn is_root(&self) -> bool {
        self.inviter.is_none()
    }
}
