use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::tree_node::{ServerId, UserId};
use crate::error::{Result, TreeError};

/// An invite created on a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteRecord {
    pub inviter_id: UserId,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Works out who invited a member who just joined.
///
/// The chat server reports joins without saying which invite was used, so
/// implementations have to guess from the invites they have seen.
pub trait InviteResolver: Send + Sync {
    fn record_invite(&self, server_id: ServerId, invite: InviteRecord);

    /// Id of the member credited with inviting `user_id`.
    fn get_inviter(&self, server_id: ServerId, user_id: UserId) -> Result<UserId>;

    /// Forget everything known about a server.
    fn forget_server(&self, _server_id: ServerId) {}
}

/// Credits every join to the creator of the most recently created invite.
/// Expiry times are not taken into account.
#[derive(Default)]
pub struct MostRecentInviteResolver {
    latest: DashMap<ServerId, InviteRecord>,
}

impl MostRecentInviteResolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InviteResolver for MostRecentInviteResolver {
    fn record_invite(&self, server_id: ServerId, invite: InviteRecord) {
        // Events may arrive out of order; keep the newest invite.
        self.latest
            .entry(server_id)
            .and_modify(|current| {
                if invite.created_at >= current.created_at {
                    *current = invite.clone();
                }
            })
            .or_insert_with(|| invite.clone());
    }

    fn get_inviter(&self, server_id: ServerId, user_id: UserId) -> Result<UserId> {
        self.latest
            .get(&server_id)
            .map(|invite| invite.inviter_id)
            .ok_or(TreeError::NoInviteRecorded { server_id, user_id })
    }

    fn forget_server(&self, server_id: ServerId) {
        self.latest.remove(&server_id);
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn invite(inviter_id: UserId, code: &str, hour: u32) -> InviteRecord {
        InviteRecord {
            inviter_id,
            code: code.into(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap(),
            expires_at: None,
        }
    }

    #[test]
    fn test_no_invite_recorded() {
        let resolver = MostRecentInviteResolver::new();
        assert!(matches!(
            resolver.get_inviter(100, 5),
            Err(TreeError::NoInviteRecorded {
                server_id: 100,
                user_id: 5
            })
        ));
    }

    #[test]
    fn test_most_recent_invite_wins() {
        let resolver = MostRecentInviteResolver::new();
        resolver.record_invite(100, invite(1, "aaa", 10));
        resolver.record_invite(100, invite(2, "bbb", 11));
        assert_eq!(resolver.get_inviter(100, 5).unwrap(), 2);

        // An older invite reported late does not take over
        resolver.record_invite(100, invite(3, "ccc", 9));
        assert_eq!(resolver.get_inviter(100, 5).unwrap(), 2);
    }

    #[test]
    fn test_servers_are_independent() {
        let resolver = MostRecentInviteResolver::new();
        resolver.record_invite(100, invite(1, "aaa", 10));
        resolver.record_invite(200, invite(7, "zzz", 8));
        assert_eq!(resolver.get_inviter(100, 5).unwrap(), 1);
        assert_eq!(resolver.get_inviter(200, 5).unwrap(), 7);

        resolver.forget_server(100);
        assert!(resolver.get_inviter(100, 5).is_err());
        assert_eq!(resolver.get_inviter(200, 5).unwrap(), 7);
    }
}
