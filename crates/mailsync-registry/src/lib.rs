//! MailSync Registry - Platform account registry adapter
//!
//! File-backed implementation of the `IAccountRegistry` port from
//! `mailsync-core`, plus a change watcher that turns edits to the backing
//! file into [`RegistryEvent`](mailsync_core::ports::RegistryEvent)
//! notifications.
//!
//! The registry file is shared with other applications: every entry
//! carries a type tag, and this adapter only ever touches entries of the
//! caller's tag. Rewrites go through a temp file and an atomic rename so
//! concurrent readers never observe a torn file.
//!
//! ## Key Components
//!
//! - [`FileRegistry`] - YAML-file-backed `IAccountRegistry` implementation
//! - [`RegistryWatcher`] - notify-based watcher emitting registry events
//! - [`RegistryError`] - Error types for registry operations

pub mod registry;
pub mod watcher;

pub use registry::FileRegistry;
pub use watcher::RegistryWatcher;

/// Errors that can occur during registry operations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The backing file could not be read or written
    #[error("Registry I/O failed: {0}")]
    Io(String),

    /// The backing file contents could not be parsed
    #[error("Registry file malformed: {0}")]
    Malformed(String),

    /// An entry with this name and type tag already exists
    #[error("Registry entry {0} already exists")]
    AlreadyExists(String),

    /// No entry with this name and type tag exists
    #[error("No registry entry named {0}")]
    NotFound(String),
}
