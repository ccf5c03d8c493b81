//! Registry file watching and debounced change notification
//!
//! Wraps the `notify` crate to monitor the registry's backing file for
//! external edits, coalescing rapid-fire OS events into a single
//! [`RegistryEvent`] carrying a fresh snapshot of the caller's entries.
//!
//! ## Architecture
//!
//! ```text
//! inotify on registry dir
//!       │
//!       ▼
//!  RegistryWatcher  ──→  debounce  ──→  mpsc<RegistryEvent>  ──→  AccountsUpdatedListener
//! ```
//!
//! External tools tend to rewrite the file several times in a burst
//! (temp-file writes, renames, metadata updates). The watcher waits for
//! the file to be quiet for the debounce delay before reading it, so
//! downstream consumers see one event per logical change.

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use mailsync_core::ports::{IAccountRegistry, RegistryEvent};

use crate::FileRegistry;

/// Channel capacity for raw change pings from the notify callback
const PING_CAPACITY: usize = 64;

/// Watches the registry backing file and emits snapshot events
///
/// Holds the underlying OS watcher; dropping the `RegistryWatcher` stops
/// the watch. The forwarding task exits when the event receiver is
/// dropped.
pub struct RegistryWatcher {
    // Held only to keep the OS watch alive for the watcher's lifetime
    _watcher: RecommendedWatcher,
}

impl RegistryWatcher {
    /// Starts watching the registry file for external changes
    ///
    /// Returns the watcher and a receiver yielding one
    /// [`RegistryEvent::AccountsChanged`] per settled burst of edits, each
    /// carrying the registry entries for `type_tag` at read time.
    ///
    /// Must be called from within a tokio runtime: the debounce-and-read
    /// task is spawned on the current runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS watcher cannot be created or the
    /// registry's parent directory cannot be watched.
    pub fn spawn(
        registry: Arc<FileRegistry>,
        type_tag: impl Into<String>,
        debounce_delay: Duration,
    ) -> Result<(Self, mpsc::Receiver<RegistryEvent>)> {
        let type_tag = type_tag.into();
        let (ping_tx, ping_rx) = mpsc::channel::<()>(PING_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<RegistryEvent>(PING_CAPACITY);

        let file_name: OsString = registry
            .path()
            .file_name()
            .context("Registry path has no file name")?
            .to_os_string();

        info!(
            path = %registry.path().display(),
            debounce_ms = debounce_delay.as_millis() as u64,
            "Initializing registry watcher"
        );

        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    if !touches_registry_file(&event, &file_name) {
                        return;
                    }
                    // Coalescing happens downstream; a full channel just
                    // means a ping is already pending
                    if let Err(e) = ping_tx.try_send(()) {
                        debug!(error = %e, "Dropped registry change ping");
                    }
                }
                Err(err) => {
                    warn!(error = %err, "Registry watcher error");
                }
            },
            notify::Config::default(),
        )
        .context("Failed to create registry watcher")?;

        // The file is replaced by rename on every rewrite, so watch the
        // directory rather than the file itself
        let watch_dir = registry
            .path()
            .parent()
            .context("Registry path has no parent directory")?;
        std::fs::create_dir_all(watch_dir).with_context(|| {
            format!(
                "Failed to create registry directory {}",
                watch_dir.display()
            )
        })?;
        watcher
            .watch(watch_dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory {}", watch_dir.display()))?;

        tokio::spawn(forward_changes(
            registry,
            type_tag,
            debounce_delay,
            ping_rx,
            event_tx,
        ));

        Ok((Self { _watcher: watcher }, event_rx))
    }
}

/// Returns true if the event involves the registry's backing file
fn touches_registry_file(event: &notify::Event, file_name: &OsString) -> bool {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str())),
        _ => false,
    }
}

/// Debounces change pings and forwards snapshot events
///
/// Waits until the file has been quiet for the debounce delay, then reads
/// the registry and sends the snapshot. A read failure is logged and the
/// burst is dropped; the next change will trigger another read.
async fn forward_changes(
    registry: Arc<FileRegistry>,
    type_tag: String,
    debounce_delay: Duration,
    mut pings: mpsc::Receiver<()>,
    events: mpsc::Sender<RegistryEvent>,
) {
    while pings.recv().await.is_some() {
        // Absorb the rest of the burst
        loop {
            match tokio::time::timeout(debounce_delay, pings.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => return,
                Err(_) => break,
            }
        }

        let snapshot = match registry.list_accounts(&type_tag).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Failed to read registry after change");
                continue;
            }
        };

        debug!(count = snapshot.len(), "Registry changed, emitting snapshot");
        if events
            .send(RegistryEvent::AccountsChanged(snapshot))
            .await
            .is_err()
        {
            debug!("Registry event receiver dropped, watcher task exiting");
            return;
        }
    }
}
