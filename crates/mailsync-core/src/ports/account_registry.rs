//! Account registry port (driven/secondary port)
//!
//! Interface to the platform-level registry of authenticated identities.
//! The registry is shared with other applications, so every entry carries
//! a type tag and this port only ever touches entries of the caller's tag.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because registry errors are adapter-specific
//!   (permission denied, entry already removed, backing file unreadable).
//! - Each create/delete may fail independently. Callers applying a batch
//!   of reconciliation actions must treat a failure as per-entry:
//!   log it and continue with the remaining entries.
//! - Registry calls may be slow (the real registry can be backed by IPC),
//!   so callers must not hold any lock across them.

use crate::domain::{Email, RegistryAccount};

/// Notification emitted when the registry contents change
///
/// Carries the current registry snapshot at the time of the change. Many
/// such events may arrive in rapid succession with no ordering guarantee
/// beyond delivery order on a single channel.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// The set of registry accounts changed; payload is the new snapshot
    AccountsChanged(Vec<RegistryAccount>),
}

/// Port trait for the platform account registry
#[async_trait::async_trait]
pub trait IAccountRegistry: Send + Sync {
    /// Lists all registry entries carrying the given type tag
    async fn list_accounts(&self, type_tag: &str) -> anyhow::Result<Vec<RegistryAccount>>;

    /// Creates a registry entry for the given name and type tag
    async fn create_account(&self, name: &Email, type_tag: &str) -> anyhow::Result<()>;

    /// Deletes the registry entry with the given name and type tag
    async fn delete_account(&self, name: &Email, type_tag: &str) -> anyhow::Result<()>;
}
