//! YAML-file-backed implementation of IAccountRegistry
//!
//! The backing file holds a flat list of registry entries:
//!
//! ```yaml
//! - name: user@example.com
//!   type_tag: com.enigmora.mailsync
//! - name: other@example.com
//!   type_tag: com.example.calendar
//! ```
//!
//! Entries of foreign type tags are preserved verbatim across rewrites.
//! Every rewrite goes through a temp file followed by an atomic rename so
//! external watchers never read a half-written file.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::debug;

use mailsync_core::domain::{Email, RegistryAccount};
use mailsync_core::ports::IAccountRegistry;

use crate::RegistryError;

/// File-backed registry of platform accounts
///
/// Mutations are serialized through an internal async mutex so concurrent
/// create/delete calls never interleave their read-modify-write cycles.
pub struct FileRegistry {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileRegistry {
    /// Creates a registry over the given backing file
    ///
    /// The file does not have to exist yet; a missing file reads as an
    /// empty registry and is created on the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all entries from the backing file
    ///
    /// A missing file is an empty registry, not an error.
    fn load_entries(&self) -> Result<Vec<RegistryAccount>, RegistryError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(RegistryError::Io(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_yaml::from_str(&contents).map_err(|e| {
            RegistryError::Malformed(format!("Failed to parse {}: {}", self.path.display(), e))
        })
    }

    /// Rewrites the backing file with the given entries
    ///
    /// Writes to a sibling temp file first and renames it into place.
    fn store_entries(&self, entries: &[RegistryAccount]) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RegistryError::Io(format!(
                    "Failed to create registry directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let yaml = serde_yaml::to_string(entries)
            .map_err(|e| RegistryError::Malformed(format!("Failed to serialize entries: {}", e)))?;

        let tmp_path = self.path.with_extension("yaml.tmp");
        std::fs::write(&tmp_path, yaml).map_err(|e| {
            RegistryError::Io(format!("Failed to write {}: {}", tmp_path.display(), e))
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            RegistryError::Io(format!(
                "Failed to move {} into place: {}",
                tmp_path.display(),
                e
            ))
        })?;

        debug!(path = %self.path.display(), count = entries.len(), "Rewrote registry file");
        Ok(())
    }
}

#[async_trait::async_trait]
impl IAccountRegistry for FileRegistry {
    async fn list_accounts(&self, type_tag: &str) -> anyhow::Result<Vec<RegistryAccount>> {
        let entries = self.load_entries()?;
        Ok(entries
            .into_iter()
            .filter(|e| e.type_tag() == type_tag)
            .collect())
    }

    async fn create_account(&self, name: &Email, type_tag: &str) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load_entries()?;

        if entries
            .iter()
            .any(|e| e.name() == name && e.type_tag() == type_tag)
        {
            return Err(RegistryError::AlreadyExists(name.as_str().to_string()).into());
        }

        entries.push(RegistryAccount::new(name.clone(), type_tag));
        self.store_entries(&entries)?;

        debug!(name = %name, type_tag, "Created registry entry");
        Ok(())
    }

    async fn delete_account(&self, name: &Email, type_tag: &str) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load_entries()?;

        let before = entries.len();
        entries.retain(|e| !(e.name() == name && e.type_tag() == type_tag));
        if entries.len() == before {
            return Err(RegistryError::NotFound(name.as_str().to_string()).into());
        }

        self.store_entries(&entries)?;

        debug!(name = %name, type_tag, "Deleted registry entry");
        Ok(())
    }
}
