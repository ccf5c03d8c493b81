//! Account reconciler
//!
//! Makes the provider store and the platform account registry consistent:
//! every live provider account has a registry entry of our sync type, and
//! every registry entry of our sync type has a live provider account.
//!
//! ## Decision vs. application
//!
//! [`diff_inventories`] is a pure function over two immutable snapshots
//! that returns an explicit action list. [`Reconciler`] fetches the
//! snapshots, diffs them, and applies the actions against the two stores.
//! Application is best-effort: each create/delete is attempted
//! independently, and a failure on one account is logged and skipped so it
//! never aborts reconciliation of the others.
//!
//! ## Direction
//!
//! The registry is authoritative for existence: a provider account whose
//! registry entry has been removed is abandoned and deleted from the
//! provider store (cascading to its host rows), not recreated in the
//! registry. The opposite direction exists as
//! [`ReconcilePolicy::ProviderAuthoritative`] and is used by the
//! account-setup flow when registering a newly created provider account.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use mailsync_core::domain::{Email, ProviderAccount, RegistryAccount};
use mailsync_core::ports::{IAccountRegistry, IProviderStore};

// ============================================================================
// Decision types
// ============================================================================

/// Which inventory is ground truth for account existence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcilePolicy {
    /// The registry is ground truth: a provider account with no registry
    /// counterpart is deleted from the provider store.
    #[default]
    RegistryAuthoritative,
    /// The provider store is ground truth: a provider account with no
    /// registry counterpart gets a registry entry created for it.
    ProviderAuthoritative,
}

/// Explicit action list produced by [`diff_inventories`]
///
/// Side-effect free; applying these actions is the [`Reconciler`]'s job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileActions {
    /// Registry entries to create (provider accounts lacking a counterpart,
    /// under [`ReconcilePolicy::ProviderAuthoritative`])
    pub registry_creates: Vec<RegistryAccount>,
    /// Registry entries to delete (entries lacking a provider counterpart)
    pub registry_deletes: Vec<RegistryAccount>,
    /// Provider accounts to delete (accounts lacking a registry counterpart,
    /// under [`ReconcilePolicy::RegistryAuthoritative`])
    pub provider_deletes: Vec<ProviderAccount>,
}

impl ReconcileActions {
    /// Returns true if the two inventories already match
    pub fn is_empty(&self) -> bool {
        self.registry_creates.is_empty()
            && self.registry_deletes.is_empty()
            && self.provider_deletes.is_empty()
    }

    /// Total number of pending actions
    pub fn len(&self) -> usize {
        self.registry_creates.len() + self.registry_deletes.len() + self.provider_deletes.len()
    }
}

/// Computes the minimal action set making the two inventories match
///
/// Registry entries whose type tag differs from `type_tag` belong to other
/// applications and are ignored entirely. Duplicate emails are not expected
/// in either inventory; if present, indexing is last-write-wins with no
/// ordering guarantee.
pub fn diff_inventories(
    provider_accounts: &[ProviderAccount],
    registry_accounts: &[RegistryAccount],
    type_tag: &str,
    policy: ReconcilePolicy,
) -> ReconcileActions {
    let registry_by_name: HashMap<&Email, &RegistryAccount> = registry_accounts
        .iter()
        .filter(|entry| entry.type_tag() == type_tag)
        .map(|entry| (entry.name(), entry))
        .collect();

    let provider_by_email: HashMap<&Email, &ProviderAccount> = provider_accounts
        .iter()
        .map(|account| (account.email(), account))
        .collect();

    let mut actions = ReconcileActions::default();

    for account in provider_accounts {
        if !registry_by_name.contains_key(account.email()) {
            match policy {
                ReconcilePolicy::RegistryAuthoritative => {
                    debug!(
                        account_id = %account.id(),
                        email = %account.email(),
                        "Provider account has no registry entry, scheduling provider delete"
                    );
                    actions.provider_deletes.push(account.clone());
                }
                ReconcilePolicy::ProviderAuthoritative => {
                    debug!(
                        account_id = %account.id(),
                        email = %account.email(),
                        "Provider account has no registry entry, scheduling registry create"
                    );
                    actions.registry_creates.push(account.registry_account(type_tag));
                }
            }
        }
    }

    for entry in registry_accounts {
        if entry.type_tag() != type_tag {
            continue;
        }
        if !provider_by_email.contains_key(entry.name()) {
            debug!(
                name = %entry.name(),
                "Registry entry has no provider account, scheduling registry delete"
            );
            actions.registry_deletes.push(entry.clone());
        }
    }

    actions
}

// ============================================================================
// Application
// ============================================================================

/// Summary of a completed reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct ReconcileSummary {
    /// Number of registry entries created
    pub registry_created: u32,
    /// Number of registry entries deleted
    pub registry_deleted: u32,
    /// Number of provider accounts deleted
    pub provider_deleted: u32,
    /// Per-account failures encountered during the pass (non-fatal)
    pub errors: Vec<String>,
}

/// Applies reconciliation actions against the two stores
///
/// Holds no lock of its own; registry calls may be slow and are issued
/// directly. The provider store's cascading delete keeps each removal
/// atomic.
pub struct Reconciler {
    store: Arc<dyn IProviderStore>,
    registry: Arc<dyn IAccountRegistry>,
    type_tag: String,
    policy: ReconcilePolicy,
}

impl Reconciler {
    /// Creates a reconciler with the default registry-authoritative policy
    pub fn new(
        store: Arc<dyn IProviderStore>,
        registry: Arc<dyn IAccountRegistry>,
        type_tag: impl Into<String>,
    ) -> Self {
        Self {
            store,
            registry,
            type_tag: type_tag.into(),
            policy: ReconcilePolicy::default(),
        }
    }

    /// Overrides the reconciliation policy
    pub fn with_policy(mut self, policy: ReconcilePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the sync type tag this reconciler operates on
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    /// Runs a full reconciliation pass, fetching both snapshots
    ///
    /// # Errors
    ///
    /// Returns an error only if a snapshot cannot be fetched at all.
    /// Individual create/delete failures are reported in the summary.
    pub async fn reconcile(&self) -> Result<ReconcileSummary> {
        let registry_accounts = self
            .registry
            .list_accounts(&self.type_tag)
            .await
            .context("Failed to list registry accounts")?;
        self.reconcile_with_registry(&registry_accounts).await
    }

    /// Runs a reconciliation pass against a caller-supplied registry snapshot
    ///
    /// Used by the accounts-changed notification path, which already
    /// carries the current registry snapshot.
    pub async fn reconcile_with_registry(
        &self,
        registry_accounts: &[RegistryAccount],
    ) -> Result<ReconcileSummary> {
        let provider_accounts = self
            .store
            .list_accounts()
            .await
            .context("Failed to list provider accounts")?;

        let actions = diff_inventories(
            &provider_accounts,
            registry_accounts,
            &self.type_tag,
            self.policy,
        );

        if actions.is_empty() {
            debug!("Inventories already consistent, nothing to reconcile");
            return Ok(ReconcileSummary::default());
        }

        info!(
            creates = actions.registry_creates.len(),
            registry_deletes = actions.registry_deletes.len(),
            provider_deletes = actions.provider_deletes.len(),
            "Applying reconciliation actions"
        );

        Ok(self.apply(actions).await)
    }

    /// Applies an action list, best-effort per entry
    async fn apply(&self, actions: ReconcileActions) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();

        for entry in &actions.registry_creates {
            match self
                .registry
                .create_account(entry.name(), entry.type_tag())
                .await
            {
                Ok(()) => {
                    info!(name = %entry.name(), "Created registry entry");
                    summary.registry_created += 1;
                }
                Err(e) => {
                    warn!(name = %entry.name(), error = %format!("{e:#}"), "Failed to create registry entry, skipping");
                    summary
                        .errors
                        .push(format!("create {}: {e:#}", entry.name()));
                }
            }
        }

        for entry in &actions.registry_deletes {
            match self
                .registry
                .delete_account(entry.name(), entry.type_tag())
                .await
            {
                Ok(()) => {
                    info!(name = %entry.name(), "Deleted registry entry");
                    summary.registry_deleted += 1;
                }
                Err(e) => {
                    warn!(name = %entry.name(), error = %format!("{e:#}"), "Failed to delete registry entry, skipping");
                    summary
                        .errors
                        .push(format!("delete {}: {e:#}", entry.name()));
                }
            }
        }

        for account in &actions.provider_deletes {
            // Cascades to host rows; deleting an already-removed account
            // is a no-op in the store.
            match self.store.delete_account(account.id()).await {
                Ok(()) => {
                    info!(
                        account_id = %account.id(),
                        email = %account.email(),
                        "Deleted abandoned provider account"
                    );
                    summary.provider_deleted += 1;
                }
                Err(e) => {
                    warn!(
                        account_id = %account.id(),
                        error = %format!("{e:#}"),
                        "Failed to delete provider account, skipping"
                    );
                    summary
                        .errors
                        .push(format!("provider delete {}: {e:#}", account.id()));
                }
            }
        }

        summary
    }
}

// ============================================================================
// Unit tests (pure decision logic)
// ============================================================================
