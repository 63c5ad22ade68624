use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::command::{MembershipEvent, ReplCommand, ReplLine};
use super::formatter;
use crate::engine::membership::MembershipSync;
use crate::error::Result;

const PROMPT: &str = ">> ";

/// What the REPL should do after a line.
#[derive(Debug, PartialEq, Eq)]
pub enum Reply {
    /// Nothing to print.
    Empty,
    Output(String),
    Exit,
}

/// Parse and execute one line. Errors are turned into output so the loop
/// can keep going.
pub fn handle_line(sync: &MembershipSync, line: &str) -> Reply {
    if line.trim().is_empty() {
        return Reply::Empty;
    }

    let command = match ReplLine::parse_line(line) {
        Ok(parsed) => parsed.command,
        // Covers --help as well as real parse errors
        Err(e) => return Reply::Output(e.to_string()),
    };

    match command {
        ReplCommand::Exit => Reply::Exit,
        ReplCommand::Show { server_id } => match sync.registry().get_tree(server_id) {
            Ok(tree) => Reply::Output(formatter::render_tree(&tree)),
            Err(e) => Reply::Output(format!("Error: {e}")),
        },
        ReplCommand::Event(args) => {
            let event = match MembershipEvent::try_from(args) {
                Ok(event) => event,
                Err(msg) => return Reply::Output(format!("Error: {msg}")),
            };
            debug!(?event, "applying event");
            match apply_event(sync, event) {
                Ok(msg) => Reply::Output(msg),
                Err(e) => Reply::Output(format!("Error: {e}")),
            }
        }
    }
}

fn apply_event(sync: &MembershipSync, event: MembershipEvent) -> Result<String> {
    match event {
        MembershipEvent::ServerAdded {
            server_id,
            owner_id,
            username,
            discriminator,
            nickname,
        } => {
            sync.on_server_added(server_id, owner_id, &username, discriminator, &nickname)?;
            Ok(format!("Created family tree for server {server_id}"))
        }
        MembershipEvent::ServerRemoved { server_id } => {
            sync.on_server_removed(server_id)?;
            Ok(format!("Removed family tree for server {server_id}"))
        }
        MembershipEvent::InviteCreated {
            server_id,
            inviter_id,
            code,
            created_at,
            expires_at,
        } => {
            sync.on_invite_created(server_id, inviter_id, &code, created_at, expires_at);
            Ok(format!("Recorded invite {code} by {inviter_id}"))
        }
        MembershipEvent::UserJoined {
            server_id,
            user_id,
            username,
            discriminator,
        } => {
            sync.on_user_joined(server_id, user_id, &username, discriminator)?;
            Ok(format!("Added {user_id} to server {server_id}"))
        }
        MembershipEvent::UserLeft { server_id, user_id } => {
            let removed = sync.on_user_left(server_id, user_id)?;
            Ok(format!(
                "Removed {} from server {server_id}",
                formatter::node_line(&removed)
            ))
        }
        MembershipEvent::UserNicknameChanged {
            server_id,
            user_id,
            nickname,
        } => {
            sync.on_user_nickname_changed(server_id, user_id, &nickname)?;
            Ok(format!("Renamed {user_id} to {nickname}"))
        }
    }
}

/// Read commands line by line until `exit`, end of input or shutdown.
pub async fn run<R, W>(
    input: R,
    mut output: W,
    sync: &MembershipSync,
    shutdown: CancellationToken,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(input).lines();

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let line = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("REPL interrupted");
                break;
            }
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            break; // EOF
        };

        match handle_line(sync, &line) {
            Reply::Exit => break,
            Reply::Empty => {}
            Reply::Output(text) => {
                output.write_all(text.as_bytes()).await?;
                if !text.ends_with('\n') {
                    output.write_all(b"\n").await?;
                }
            }
        }
    }

    output.flush().await
}
