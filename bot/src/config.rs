use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::engine::tree_node::DEFAULT_BACKGROUND_COLOR;

/// Top-level bot configuration, loaded from family-tree.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct BotConfig {
    pub store: StoreSection,
    pub tree: TreeSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// JSON file holding every server's family tree.
    pub path: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: "trees.json".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TreeSection {
    /// Background color of new nodes in generated diagrams.
    pub default_background_color: String,
}

impl Default for TreeSection {
    fn default() -> Self {
        Self {
            default_background_color: DEFAULT_BACKGROUND_COLOR.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Filter directive used when RUST_LOG is not set.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl BotConfig {
    /// Load config from a TOML file. Falls back to defaults if the file doesn't exist
    /// (runs before logging is set up, so callers report that themselves).
    /// Environment variables override TOML values.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let mut config = if Path::new(path).exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {path}"))?;
            Self::from_toml(&contents)
                .with_context(|| format!("failed to parse config file {path}"))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TREE_STORE_PATH") {
            self.store.path = v;
        }
        if let Ok(v) = std::env::var("DEFAULT_NODE_COLOR") {
            self.tree.default_background_color = v;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            self.logging.level = v;
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        crate::engine::validation::validate_background_color(&self.tree.default_background_color)
            .context("invalid [tree] default_background_color")?;
        if self.store.path.trim().is_empty() {
            anyhow::bail!("[store] path cannot be empty");
        }
        Ok(())
    }
}
