use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use super::codec;
use super::models::StoreDocument;
use crate::engine::family_tree::FamilyTree;
use crate::engine::tree_node::ServerId;
use crate::error::{Result, TreeError};

/// Durable storage for family trees.
pub trait TreeSerializer: Send + Sync {
    /// Load every stored tree, keyed by server id. An absent store is empty.
    fn load_trees(&self) -> Result<HashMap<ServerId, FamilyTree>>;

    /// Insert or replace the stored tree of `server_id`.
    fn save_tree(&self, server_id: ServerId, tree: &FamilyTree) -> Result<()>;

    /// Delete the stored tree of `server_id`.
    fn remove_tree(&self, server_id: ServerId) -> Result<()>;
}

/// Stores all trees in one pretty-printed JSON document.
///
/// Every save or removal rewrites the whole file: read the document, change
/// one entry, write it to a temporary file and rename it over the original.
/// A mutex serialises these cycles so concurrent saves for different servers
/// cannot lose each other's updates.
pub struct JsonTreeStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonTreeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the raw document. A missing or blank file is an empty store.
    fn read_document(&self) -> Result<StoreDocument> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no tree store yet");
                return Ok(StoreDocument::new());
            }
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(StoreDocument::new());
        }

        serde_json::from_str(&contents)
            .map_err(|e| TreeError::CorruptStore(format!("{}: {e}", self.path.display())))
    }

    fn write_document(&self, document: &StoreDocument) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(document).map_err(std::io::Error::from)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Decode every entry of a document.
    fn decode_document(document: &StoreDocument) -> Result<HashMap<ServerId, FamilyTree>> {
        let mut trees = HashMap::with_capacity(document.len());
        for (key, records) in document {
            let server_id: ServerId = key
                .parse()
                .map_err(|_| TreeError::CorruptStore(format!("invalid server id {key:?}")))?;
            let tree = codec::decode(records)
                .map_err(|e| TreeError::CorruptStore(format!("server {server_id}: {e}")))?;
            trees.insert(server_id, tree);
        }
        Ok(trees)
    }
}

impl TreeSerializer for JsonTreeStore {
    fn load_trees(&self) -> Result<HashMap<ServerId, FamilyTree>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let document = self.read_document()?;
        let trees = Self::decode_document(&document)?;

        info!(count = trees.len(), path = %self.path.display(), "loaded family trees");
        Ok(trees)
    }

    fn save_tree(&self, server_id: ServerId, tree: &FamilyTree) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut document = self.read_document()?;
        document.insert(server_id.to_string(), codec::encode(tree));
        self.write_document(&document)?;

        debug!(%server_id, nodes = tree.len(), "family tree saved");
        Ok(())
    }

    fn remove_tree(&self, server_id: ServerId) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut document = self.read_document()?;
        if document.remove(&server_id.to_string()).is_none() {
            debug!(%server_id, "no stored family tree to remove");
            return Ok(());
        }
        self.write_document(&document)?;

        debug!(%server_id, "family tree removed from store");
        Ok(())
    }
}
