//! Provider store port (driven/secondary port)
//!
//! Interface to the application's authoritative local database of mail
//! accounts and their settings.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite, in-memory fakes, etc.) and don't need domain-level
//!   classification.
//! - `delete_account` must cascade to dependent records (host
//!   configuration rows) in a single atomic operation so no orphaned rows
//!   persist after reconciliation removes an account.
//! - Deleting an account that no longer exists is a no-op, not an error:
//!   reconciliation may race with explicit user deletion, and the desired
//!   end state is already achieved.

use crate::domain::{AccountDraft, AccountId, ProviderAccount, SyncInterval};

/// Port trait for the provider account store
#[async_trait::async_trait]
pub trait IProviderStore: Send + Sync {
    /// Lists all live provider accounts
    async fn list_accounts(&self) -> anyhow::Result<Vec<ProviderAccount>>;

    /// Retrieves an account by its store-assigned ID
    async fn get_account(&self, id: AccountId) -> anyhow::Result<Option<ProviderAccount>>;

    /// Inserts a new account and returns it with its assigned ID
    async fn insert_account(&self, draft: &AccountDraft) -> anyhow::Result<ProviderAccount>;

    /// Updates the stored sync interval of an existing account
    async fn update_sync_interval(
        &self,
        id: AccountId,
        interval: SyncInterval,
    ) -> anyhow::Result<()>;

    /// Deletes an account and all of its dependent host rows atomically
    ///
    /// Deleting a missing account is a no-op.
    async fn delete_account(&self, id: AccountId) -> anyhow::Result<()>;
}
