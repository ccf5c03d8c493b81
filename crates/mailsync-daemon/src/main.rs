//! MailSync Daemon - Background account reconciliation service
//!
//! This binary runs as a systemd user service and handles:
//! - Reconciling provider accounts against the platform registry
//! - Rebuilding the sync report table after account changes
//! - Watching the registry file for external edits
//! - Periodic dispatch of due account polls
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon runs a startup reconciliation, starts the registry watcher,
//! then enters a tick loop that dispatches polls for accounts whose
//! interval has elapsed. Registry change events are handled concurrently
//! by the accounts-updated listener. Both loops are controlled by a
//! `CancellationToken` that is triggered on receipt of SIGTERM or SIGINT.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use mailsync_core::config::Config;
use mailsync_core::ports::{IAccountRegistry, IProviderStore};
use mailsync_registry::{FileRegistry, RegistryWatcher};
use mailsync_store::{DatabasePool, SqliteProviderStore};
use mailsync_sync::{AccountsUpdatedListener, Reconciler, SyncReportScheduler};

// ============================================================================
// DaemonService struct
// ============================================================================

/// Main daemon service that orchestrates reconciliation and scheduling
///
/// Holds the configuration, the wired-up adapter stack, and a cancellation
/// token for graceful shutdown.
struct DaemonService {
    /// Application configuration loaded from YAML
    config: Config,
    /// File-backed platform account registry
    registry: Arc<FileRegistry>,
    /// Lock-protected sync report table
    scheduler: Arc<SyncReportScheduler>,
    /// Serializes registry notifications into reconcile + rebuild
    listener: Arc<AccountsUpdatedListener>,
    /// Token for signalling graceful shutdown to all async tasks
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Creates a new DaemonService
    ///
    /// Opens the database and wires the store, registry, reconciler,
    /// scheduler, and listener together.
    async fn new(config: Config, shutdown: CancellationToken) -> Result<Self> {
        let db_pool = DatabasePool::new(&config.store.db_path)
            .await
            .context("Failed to open account database")?;
        let store: Arc<dyn IProviderStore> =
            Arc::new(SqliteProviderStore::new(db_pool.pool().clone()));

        let registry = Arc::new(FileRegistry::new(config.registry.path.clone()));

        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&store),
            Arc::clone(&registry) as Arc<dyn IAccountRegistry>,
            config.registry.type_tag.as_str(),
        ));
        let scheduler = Arc::new(SyncReportScheduler::new());
        let listener = Arc::new(AccountsUpdatedListener::new(
            Arc::clone(&store),
            reconciler,
            Arc::clone(&scheduler),
        ));

        Ok(Self {
            config,
            registry,
            scheduler,
            listener,
            shutdown,
        })
    }

    /// Runs the daemon's main loop
    ///
    /// 1. Runs a startup reconciliation and report rebuild (if configured)
    /// 2. Starts the registry file watcher
    /// 3. Spawns the accounts-updated listener
    /// 4. Enters the tick loop with graceful shutdown support
    async fn run(&self) -> Result<()> {
        if self.config.scheduling.reconcile_on_start {
            info!("Running startup reconciliation");
            if let Err(e) = self.listener.on_accounts_updated().await {
                // Non-fatal: the first registry event or tick will retry
                warn!(error = %format!("{e:#}"), "Startup reconciliation failed");
            }
        }

        let debounce = Duration::from_secs(self.config.registry.debounce_delay);
        let (_watcher, events) = RegistryWatcher::spawn(
            Arc::clone(&self.registry),
            self.config.registry.type_tag.clone(),
            debounce,
        )
        .context("Failed to start registry watcher")?;

        let listener = Arc::clone(&self.listener);
        let listener_shutdown = self.shutdown.clone();
        let listener_task = tokio::spawn(async move {
            listener.run(events, listener_shutdown).await;
        });

        let result = self.tick_loop().await;

        if let Err(e) = listener_task.await {
            error!(error = %e, "Listener task panicked");
        }

        result
    }

    // ========================================================================
    // Periodic poll dispatch
    // ========================================================================

    /// Main scheduling loop with periodic ticks
    ///
    /// Uses `tokio::time::interval` based on `config.scheduling.tick_interval`.
    /// Each tick dispatches polls for every account whose interval has
    /// elapsed.
    async fn tick_loop(&self) -> Result<()> {
        let tick_secs = self.config.scheduling.tick_interval;
        info!(tick_interval_secs = tick_secs, "Starting scheduling loop");

        let mut interval = tokio::time::interval(Duration::from_secs(tick_secs));
        // The first tick fires immediately; dispatch right away
        interval.tick().await;

        loop {
            self.dispatch_due_polls();

            tokio::select! {
                _ = interval.tick() => {}
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        info!("Scheduling loop terminated");
        Ok(())
    }

    /// Dispatches a poll for every account whose deadline has passed
    ///
    /// Push and never-poll accounts never become due. Dispatch here means
    /// marking the account polled; actual mailbox traffic is owned by the
    /// per-protocol transport services.
    fn dispatch_due_polls(&self) {
        let now = Utc::now();
        let table_size = self.scheduler.len();
        let mut dispatched = 0usize;

        while let Some((id, due)) = self.scheduler.next_poll_due(now) {
            if due > now || dispatched >= table_size {
                break;
            }
            info!(account_id = %id, "Account due for sync, dispatching poll");
            self.scheduler.record_poll(id, true, now);
            dispatched += 1;
        }

        if dispatched > 0 {
            debug!(count = dispatched, "Dispatched due polls");
        }
    }
}

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = Config::default_path();
    let config = Config::load_or_default(&config_path);

    // RUST_LOG wins over the configured level
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    info!(config_path = %config_path.display(), "MailSync daemon starting (mailsyncd)");

    // Create cancellation token for propagation to all tasks
    let shutdown_token = CancellationToken::new();

    // Spawn signal handler task
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    // Create and run the daemon service
    let service = DaemonService::new(config, shutdown_token.clone()).await?;

    let result = service.run().await;

    match &result {
        Ok(()) => info!("MailSync daemon shut down gracefully"),
        Err(e) => error!(error = %e, "MailSync daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_token_creation() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancellation_token_cancel() {
        let token = CancellationToken::new();
        let child = token.child_token();
        token.cancel();
        assert!(token.is_cancelled());
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_cancellation_token_child_propagation() {
        let parent = CancellationToken::new();
        let child1 = parent.child_token();
        let child2 = parent.child_token();

        assert!(!child1.is_cancelled());
        assert!(!child2.is_cancelled());

        parent.cancel();

        assert!(child1.is_cancelled());
        assert!(child2.is_cancelled());
    }

    #[test]
    fn test_config_default_tick_interval() {
        let config = Config::default();
        assert!(config.scheduling.tick_interval > 0);
    }

    #[test]
    fn test_config_default_path_non_empty() {
        let path = Config::default_path();
        assert!(!path.as_os_str().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_with_empty_table_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.store.db_path = dir.path().join("mailsync.db");
        config.registry.path = dir.path().join("registry.yaml");

        let service = DaemonService::new(config, CancellationToken::new())
            .await
            .unwrap();
        service.dispatch_due_polls();
        assert!(service.scheduler.is_empty());
    }
}
