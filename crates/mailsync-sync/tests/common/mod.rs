//! In-memory port fakes shared by the integration tests
//!
//! `InMemoryStore` assigns IDs the way the real store does (monotonic
//! rowids) and treats deletion of a missing account as a no-op.
//! `InMemoryRegistry` supports per-name failure injection to exercise the
//! reconciler's best-effort application path.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{bail, Result};
use chrono::Utc;

use mailsync_core::domain::{
    AccountDraft, AccountId, Email, ProviderAccount, RegistryAccount, SyncInterval,
};
use mailsync_core::ports::{IAccountRegistry, IProviderStore};

// ============================================================================
// InMemoryStore
// ============================================================================

#[derive(Default)]
struct StoreInner {
    next_id: i64,
    accounts: HashMap<AccountId, ProviderAccount>,
}

/// In-memory provider store fake
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<StoreInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live accounts
    pub fn count(&self) -> usize {
        self.inner.lock().unwrap().accounts.len()
    }

    /// Emails of live accounts, sorted
    pub fn emails(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        let mut emails: Vec<String> = inner
            .accounts
            .values()
            .map(|a| a.email().as_str().to_string())
            .collect();
        emails.sort();
        emails
    }
}

#[async_trait::async_trait]
impl IProviderStore for InMemoryStore {
    async fn list_accounts(&self) -> Result<Vec<ProviderAccount>> {
        let inner = self.inner.lock().unwrap();
        let mut accounts: Vec<ProviderAccount> = inner.accounts.values().cloned().collect();
        accounts.sort_by_key(|a| a.id());
        Ok(accounts)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<ProviderAccount>> {
        Ok(self.inner.lock().unwrap().accounts.get(&id).cloned())
    }

    async fn insert_account(&self, draft: &AccountDraft) -> Result<ProviderAccount> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let account = ProviderAccount::with_id(
            AccountId::new(inner.next_id),
            draft.email.clone(),
            draft.display_name.clone(),
            draft.receive_protocol.clone(),
            draft.sync_interval,
            Utc::now(),
        );
        inner.accounts.insert(account.id(), account.clone());
        Ok(account)
    }

    async fn update_sync_interval(&self, id: AccountId, interval: SyncInterval) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        match inner.accounts.get_mut(&id) {
            Some(account) => {
                account.set_sync_interval(interval);
                Ok(())
            }
            None => bail!("No account with id {id}"),
        }
    }

    async fn delete_account(&self, id: AccountId) -> Result<()> {
        // Missing account is a no-op, matching the real store
        self.inner.lock().unwrap().accounts.remove(&id);
        Ok(())
    }
}

// ============================================================================
// InMemoryRegistry
// ============================================================================

/// In-memory account registry fake with failure injection
#[derive(Default)]
pub struct InMemoryRegistry {
    entries: Mutex<Vec<RegistryAccount>>,
    fail_deletes: Mutex<HashSet<String>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry directly, bypassing the port (external mutation)
    pub fn add(&self, name: &str, type_tag: &str) {
        let email = Email::new(name.to_string()).unwrap();
        self.entries
            .lock()
            .unwrap()
            .push(RegistryAccount::new(email, type_tag));
    }

    /// Removes an entry directly, bypassing the port (external mutation)
    pub fn remove(&self, name: &str) {
        self.entries
            .lock()
            .unwrap()
            .retain(|e| e.name().as_str() != name);
    }

    /// Makes subsequent deletes of `name` fail
    pub fn fail_delete_of(&self, name: &str) {
        self.fail_deletes.lock().unwrap().insert(name.to_string());
    }

    /// Entry names for a type tag, sorted
    pub fn names(&self, type_tag: &str) -> Vec<String> {
        let entries = self.entries.lock().unwrap();
        let mut names: Vec<String> = entries
            .iter()
            .filter(|e| e.type_tag() == type_tag)
            .map(|e| e.name().as_str().to_string())
            .collect();
        names.sort();
        names
    }
}

#[async_trait::async_trait]
impl IAccountRegistry for InMemoryRegistry {
    async fn list_accounts(&self, type_tag: &str) -> Result<Vec<RegistryAccount>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.type_tag() == type_tag)
            .cloned()
            .collect())
    }

    async fn create_account(&self, name: &Email, type_tag: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        if entries
            .iter()
            .any(|e| e.name() == name && e.type_tag() == type_tag)
        {
            bail!("Registry entry {name} already exists");
        }
        entries.push(RegistryAccount::new(name.clone(), type_tag));
        Ok(())
    }

    async fn delete_account(&self, name: &Email, type_tag: &str) -> Result<()> {
        if self.fail_deletes.lock().unwrap().contains(name.as_str()) {
            bail!("Permission denied deleting {name}");
        }
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| !(e.name() == name && e.type_tag() == type_tag));
        if entries.len() == before {
            bail!("No registry entry named {name}");
        }
        Ok(())
    }
}
