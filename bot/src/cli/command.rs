use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::engine::tree_node::{ServerId, UserId};

/// One line typed into the REPL.
///
/// Examples:
///   `event server_added --sid 100 --uid 1 -u alice -d 0 -n Alice`
///   `event invite_created --sid 100 --iid 1 --ic abc123`
///   `event user_joined --sid 100 --uid 2 -u bob -d 0`
///   `show --sid 100`
#[derive(Debug, Parser)]
#[command(
    name = ">>",
    no_binary_name = true,
    disable_version_flag = true,
    about = "Simulate chat-server events for local testing"
)]
pub struct ReplLine {
    #[command(subcommand)]
    pub command: ReplCommand,
}

impl ReplLine {
    /// Parse a line of whitespace-separated words.
    pub fn parse_line(line: &str) -> Result<Self, clap::Error> {
        Self::try_parse_from(line.split_whitespace())
    }
}

#[derive(Debug, Subcommand)]
pub enum ReplCommand {
    /// Emit a chat-server event.
    Event(EventArgs),

    /// Print a server's family tree.
    Show {
        #[arg(long = "server-id", visible_alias = "sid")]
        server_id: ServerId,
    },

    /// Leave the REPL.
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum EventKind {
    ServerAdded,
    ServerRemoved,
    InviteCreated,
    UserJoined,
    UserLeft,
    UserNicknameChanged,
}

/// Arguments of `event`. Which options are required depends on the kind.
#[derive(Debug, Args)]
pub struct EventArgs {
    #[arg(value_enum)]
    pub kind: EventKind,

    #[arg(long = "server-id", visible_alias = "sid")]
    pub server_id: ServerId,

    /// Creator of the invite (invite_created).
    #[arg(long = "inviter-id", visible_alias = "iid")]
    pub inviter_id: Option<UserId>,

    /// Invite code (invite_created).
    #[arg(long = "invite-code", visible_alias = "ic")]
    pub invite_code: Option<String>,

    /// RFC 3339 creation time (invite_created). Defaults to now.
    #[arg(long = "create-time", visible_alias = "ct")]
    pub create_time: Option<DateTime<Utc>>,

    /// RFC 3339 expiry time (invite_created).
    #[arg(long = "expire-time", visible_alias = "et")]
    pub expire_time: Option<DateTime<Utc>>,

    /// User the event is about (owner for server_added).
    #[arg(long = "user-id", visible_alias = "uid")]
    pub user_id: Option<UserId>,

    #[arg(long, short = 'u', visible_alias = "name")]
    pub username: Option<String>,

    #[arg(long, short = 'd', visible_alias = "dc")]
    pub discriminator: Option<u32>,

    #[arg(long, short = 'n', visible_alias = "nick")]
    pub nickname: Option<String>,
}

/// A membership event with every field its kind needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipEvent {
    ServerAdded {
        server_id: ServerId,
        owner_id: UserId,
        username: String,
        discriminator: u32,
        nickname: String,
    },
    ServerRemoved {
        server_id: ServerId,
    },
    InviteCreated {
        server_id: ServerId,
        inviter_id: UserId,
        code: String,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    },
    UserJoined {
        server_id: ServerId,
        user_id: UserId,
        username: String,
        discriminator: u32,
    },
    UserLeft {
        server_id: ServerId,
        user_id: UserId,
    },
    UserNicknameChanged {
        server_id: ServerId,
        user_id: UserId,
        nickname: String,
    },
}

fn required<T>(value: Option<T>, flag: &str) -> Result<T, String> {
    value.ok_or_else(|| format!("Missing --{flag} argument"))
}

impl TryFrom<EventArgs> for MembershipEvent {
    type Error = String;

    fn try_from(args: EventArgs) -> Result<Self, Self::Error> {
        let server_id = args.server_id;
        let event = match args.kind {
            EventKind::ServerAdded => MembershipEvent::ServerAdded {
                server_id,
                owner_id: required(args.user_id, "user-id")?,
                username: required(args.username, "username")?,
                discriminator: required(args.discriminator, "discriminator")?,
                nickname: required(args.nickname, "nickname")?,
            },
            EventKind::ServerRemoved => MembershipEvent::ServerRemoved { server_id },
            EventKind::InviteCreated => MembershipEvent::InviteCreated {
                server_id,
                inviter_id: required(args.inviter_id, "inviter-id")?,
                code: required(args.invite_code, "invite-code")?,
                created_at: args.create_time.unwrap_or_else(Utc::now),
                expires_at: args.expire_time,
            },
            EventKind::UserJoined => MembershipEvent::UserJoined {
                server_id,
                user_id: required(args.user_id, "user-id")?,
                username: required(args.username, "username")?,
                discriminator: required(args.discriminator, "discriminator")?,
            },
            EventKind::UserLeft => MembershipEvent::UserLeft {
                server_id,
                user_id: required(args.user_id, "user-id")?,
            },
            EventKind::UserNicknameChanged => MembershipEvent::UserNicknameChanged {
                server_id,
                user_id: required(args.user_id, "user-id")?,
                nickname: required(args.nickname, "nickname")?,
            },
        };
        Ok(event)
    }
}
