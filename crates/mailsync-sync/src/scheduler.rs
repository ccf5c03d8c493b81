//! Sync report scheduler
//!
//! Maintains the per-account sync report table: a mapping from provider
//! account ID to the effective sync cadence actually used by the polling
//! loop, plus in-flight poll bookkeeping.
//!
//! ## Flow
//!
//! ```text
//! RegistryWatcher ──→ mpsc::Receiver ──→ AccountsUpdatedListener
//!                                              │
//!                                    Reconciler → SyncReportScheduler
//! ```
//!
//! The report table is guarded by a single mutex held for the duration of
//! every traversal, so a concurrent rebuild can never observe a torn map.
//! A full rebuild clears the table and loses in-flight poll counters; a
//! single-account refresh replaces only that entry and preserves every
//! other entry untouched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use mailsync_core::domain::{AccountId, ProviderAccount, SyncInterval};
use mailsync_core::ports::account_registry::RegistryEvent;
use mailsync_core::ports::IProviderStore;

use crate::reconciler::Reconciler;

// ============================================================================
// SyncReport
// ============================================================================

/// Derived scheduling record for one provider account
///
/// The effective interval may differ from the account's stored interval:
/// push-capable protocols manage their own delivery out-of-band, so their
/// reports always carry [`SyncInterval::Never`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// The provider account this report schedules
    account_id: AccountId,
    /// Effective sync cadence used by the polling loop
    sync_interval: SyncInterval,
    /// When this account was last polled, if ever
    last_poll: Option<DateTime<Utc>>,
    /// Consecutive failed polls since the last success
    failed_poll_count: u32,
}

impl SyncReport {
    /// Builds a fresh report for an account, applying protocol overrides
    fn for_account(account: &ProviderAccount) -> Self {
        Self {
            account_id: account.id(),
            sync_interval: effective_interval(account),
            last_poll: None,
            failed_poll_count: 0,
        }
    }

    /// Returns the account this report schedules
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// Returns the effective sync cadence
    pub fn sync_interval(&self) -> SyncInterval {
        self.sync_interval
    }

    /// Returns the last poll time, if any
    pub fn last_poll(&self) -> Option<DateTime<Utc>> {
        self.last_poll
    }

    /// Returns the consecutive failed poll count
    pub fn failed_poll_count(&self) -> u32 {
        self.failed_poll_count
    }

    /// Next time this account is due for a periodic poll
    ///
    /// Push and never-poll accounts are not timer-scheduled and return
    /// `None`. A never-polled periodic account is due immediately.
    pub fn next_poll_due(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.sync_interval {
            SyncInterval::Minutes(minutes) => match self.last_poll {
                Some(last) => Some(last + Duration::minutes(i64::from(minutes))),
                None => Some(now),
            },
            SyncInterval::Never | SyncInterval::Push => None,
        }
    }
}

/// Computes the effective sync cadence for an account
///
/// Push-capable protocols never participate in interval-based polling,
/// regardless of the stored interval. Everything else uses the stored
/// value verbatim, including the PUSH and NEVER sentinels. An
/// unrecognized protocol is expected never to occur by construction
/// upstream; it degrades to interval-based scheduling with a warning.
fn effective_interval(account: &ProviderAccount) -> SyncInterval {
    let protocol = account.receive_protocol();
    if protocol.is_push_capable() {
        return SyncInterval::Never;
    }
    if protocol.is_unrecognized() {
        warn!(
            account_id = %account.id(),
            protocol = %protocol,
            "Account has unrecognized receive protocol, defaulting to stored interval"
        );
    }
    account.sync_interval()
}

// ============================================================================
// SyncReportScheduler
// ============================================================================

/// Scope of a report table rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportScope {
    /// Clear the whole table and repopulate it from the given accounts.
    /// Loses in-flight poll counters for every account.
    All,
    /// Replace only the entry for this account, leaving all other entries
    /// (and their in-flight counters) untouched.
    Account(AccountId),
}

/// Owns the lock-protected sync report table
///
/// Explicitly constructed at service start and dropped at service stop;
/// there is no ambient static table. All reads and writes take the single
/// internal mutex for the duration of their traversal.
#[derive(Debug, Default)]
pub struct SyncReportScheduler {
    reports: Mutex<HashMap<AccountId, SyncReport>>,
}

impl SyncReportScheduler {
    /// Creates a scheduler with an empty report table
    pub fn new() -> Self {
        Self::default()
    }

    /// Locked access to the table, recovering from a poisoned lock
    ///
    /// A panic mid-rebuild leaves the map structurally valid (entries are
    /// inserted whole), so continuing with the inner value is safe.
    fn table(&self) -> MutexGuard<'_, HashMap<AccountId, SyncReport>> {
        self.reports.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rebuilds report entries from the given provider accounts
    ///
    /// With [`ReportScope::All`] the entire table is cleared before
    /// repopulating. With [`ReportScope::Account`] only that account's
    /// entry is replaced; if the account is absent from `accounts`, its
    /// entry is removed instead (the account no longer exists).
    pub fn setup_reports(&self, scope: ReportScope, accounts: &[ProviderAccount]) {
        let mut table = self.table();
        match scope {
            ReportScope::All => {
                table.clear();
                for account in accounts {
                    table.insert(account.id(), SyncReport::for_account(account));
                }
                debug!(count = table.len(), "Rebuilt full sync report table");
            }
            ReportScope::Account(id) => {
                match accounts.iter().find(|account| account.id() == id) {
                    Some(account) => {
                        table.insert(id, SyncReport::for_account(account));
                        debug!(account_id = %id, "Refreshed sync report");
                    }
                    None => {
                        table.remove(&id);
                        debug!(account_id = %id, "Dropped sync report for missing account");
                    }
                }
            }
        }
    }

    /// Removes the report entry for a deleted account
    pub fn remove_report(&self, id: AccountId) {
        self.table().remove(&id);
    }

    /// Returns a copy of one account's report
    pub fn get_report(&self, id: AccountId) -> Option<SyncReport> {
        self.table().get(&id).cloned()
    }

    /// Returns a copy of the whole report table
    pub fn snapshot(&self) -> HashMap<AccountId, SyncReport> {
        self.table().clone()
    }

    /// Number of report entries
    pub fn len(&self) -> usize {
        self.table().len()
    }

    /// Returns true if the table has no entries
    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    /// Records the outcome of a poll attempt for an account
    ///
    /// A success resets the consecutive failure counter; a failure
    /// increments it. Unknown accounts are ignored (the report may have
    /// been dropped by a concurrent rebuild).
    pub fn record_poll(&self, id: AccountId, success: bool, now: DateTime<Utc>) {
        let mut table = self.table();
        if let Some(report) = table.get_mut(&id) {
            report.last_poll = Some(now);
            if success {
                report.failed_poll_count = 0;
            } else {
                report.failed_poll_count += 1;
            }
        }
    }

    /// Earliest periodic poll deadline across all accounts
    ///
    /// Push and never-poll accounts never contribute. Returns `None` when
    /// no account is timer-scheduled.
    pub fn next_poll_due(&self, now: DateTime<Utc>) -> Option<(AccountId, DateTime<Utc>)> {
        self.table()
            .values()
            .filter_map(|report| {
                report
                    .next_poll_due(now)
                    .map(|due| (report.account_id(), due))
            })
            .min_by_key(|(_, due)| *due)
    }
}

// ============================================================================
// AccountsUpdatedListener
// ============================================================================

/// Serializes accounts-changed notifications into reconcile + rebuild
///
/// A single-threaded actor owning the rebuild path: bursts of registry
/// notifications arrive on one channel and are processed one at a time,
/// so rapid-fire events serialize naturally without relying on the report
/// table's lock alone.
pub struct AccountsUpdatedListener {
    store: Arc<dyn IProviderStore>,
    reconciler: Arc<Reconciler>,
    scheduler: Arc<SyncReportScheduler>,
}

impl AccountsUpdatedListener {
    /// Creates a listener wired to the given store, reconciler, and scheduler
    pub fn new(
        store: Arc<dyn IProviderStore>,
        reconciler: Arc<Reconciler>,
        scheduler: Arc<SyncReportScheduler>,
    ) -> Self {
        Self {
            store,
            reconciler,
            scheduler,
        }
    }

    /// Handles one accounts-changed notification
    ///
    /// Reconciles the two inventories (registry calls happen outside the
    /// report lock), then rebuilds the full report table from the
    /// normalized provider inventory. Safe to invoke repeatedly in rapid
    /// succession.
    pub async fn on_accounts_updated(&self) -> Result<()> {
        let summary = self
            .reconciler
            .reconcile()
            .await
            .context("Reconciliation pass failed")?;

        if !summary.errors.is_empty() {
            warn!(
                failed = summary.errors.len(),
                "Reconciliation completed with per-account failures"
            );
        }

        let accounts = self
            .store
            .list_accounts()
            .await
            .context("Failed to list provider accounts for report rebuild")?;
        self.scheduler.setup_reports(ReportScope::All, &accounts);

        Ok(())
    }

    /// Handles a notification that already carries the registry snapshot
    pub async fn on_registry_event(&self, event: RegistryEvent) -> Result<()> {
        match event {
            RegistryEvent::AccountsChanged(snapshot) => {
                let summary = self
                    .reconciler
                    .reconcile_with_registry(&snapshot)
                    .await
                    .context("Reconciliation pass failed")?;

                if !summary.errors.is_empty() {
                    warn!(
                        failed = summary.errors.len(),
                        "Reconciliation completed with per-account failures"
                    );
                }

                let accounts = self
                    .store
                    .list_accounts()
                    .await
                    .context("Failed to list provider accounts for report rebuild")?;
                self.scheduler.setup_reports(ReportScope::All, &accounts);
            }
        }
        Ok(())
    }

    /// Main event loop for the listener
    ///
    /// Consumes registry events until the channel closes or the
    /// cancellation token fires. A failed pass is logged and the loop
    /// continues; no notification error is fatal to the host process.
    pub async fn run(&self, mut events: mpsc::Receiver<RegistryEvent>, shutdown: CancellationToken) {
        info!("Accounts-updated listener starting");

        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => {
                            if let Err(e) = self.on_registry_event(event).await {
                                error!(error = %format!("{e:#}"), "Failed to process registry event");
                            }
                        }
                        None => {
                            info!("Registry event channel closed, listener shutting down");
                            break;
                        }
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received, listener stopping");
                    break;
                }
            }
        }
    }
}

// ============================================================================
// Unit tests
// ============================================================================
