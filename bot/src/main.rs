use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use family_tree_bot::cli::repl;
use family_tree_bot::config::BotConfig;
use family_tree_bot::engine::events::EventForwarder;
use family_tree_bot::engine::invite::MostRecentInviteResolver;
use family_tree_bot::engine::membership::MembershipSync;
use family_tree_bot::engine::registry::FamilyTreeRegistry;
use family_tree_bot::store::json_store::{JsonTreeStore, TreeSerializer};
use family_tree_bot::store::observer::PersistOnChange;

/// Tracks who invited whom on each server.
#[derive(Debug, Parser)]
#[command(name = "family-tree-bot", version)]
struct Args {
    /// Path to the TOML config file.
    #[arg(long, default_value = "family-tree.toml")]
    config: String,

    /// Override the JSON store path.
    #[arg(long)]
    save_path: Option<String>,

    /// Override the log filter (e.g. "debug").
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_found = Path::new(&args.config).exists();
    let mut config = BotConfig::load(&args.config)?;
    if let Some(path) = args.save_path {
        config.store.path = path;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    // Initialize logging. stdout belongs to the REPL.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    if !config_found {
        info!(path = %args.config, "no config file found, using defaults");
    }

    let store = Arc::new(JsonTreeStore::new(&config.store.path));
    let registry = Arc::new(FamilyTreeRegistry::new());

    // Restore persisted trees before anything subscribes, so the reload
    // doesn't write every tree straight back.
    let trees = store
        .load_trees()
        .with_context(|| format!("failed to load {}", config.store.path))?;
    for (server_id, tree) in trees {
        registry.restore_tree(server_id, tree)?;
    }
    info!(servers = registry.len(), path = %config.store.path, "family trees loaded");

    registry.subscribe(Arc::new(PersistOnChange::new(store)));

    let (forwarder, mut events) = EventForwarder::channel();
    registry.subscribe(Arc::new(forwarder));
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!(server_id = event.server_id(), ?event, "tree event");
        }
    });

    let sync = MembershipSync::new(
        registry,
        Arc::new(MostRecentInviteResolver::new()),
        config.tree.default_background_color.as_str(),
    );

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    info!("family tree bot ready, type `help` for commands");
    repl::run(tokio::io::stdin(), tokio::io::stdout(), &sync, shutdown).await?;
    info!("family tree bot stopped");
    Ok(())
}
