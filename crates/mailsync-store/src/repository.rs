//! SQLite implementation of IProviderStore
//!
//! This module provides the concrete SQLite-based implementation of the
//! provider store port defined in mailsync-core. It handles all domain
//! type serialization/deserialization and SQL query construction.
//!
//! ## Type Mapping
//!
//! | Domain Type    | SQL Type | Strategy                                    |
//! |----------------|----------|---------------------------------------------|
//! | AccountId      | INTEGER  | rowid via `as_i64()` / `AccountId::new()`   |
//! | Email          | TEXT     | String via `.as_str()` / `Email::new()`     |
//! | Protocol       | TEXT     | Tag via `as_tag()` / `Protocol::from_tag()` |
//! | SyncInterval   | INTEGER  | Raw encoding via `as_raw()` / `from_raw()`  |
//! | DateTime<Utc>  | TEXT     | ISO 8601 via `to_rfc3339()` / `parse_from_rfc3339()` |
//!
//! The receive protocol lives on the account's `recv` host row, joined in
//! on every read. Accounts are always written together with their host
//! rows inside one transaction.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use mailsync_core::domain::{
    AccountDraft, AccountId, Email, Protocol, ProviderAccount, SyncInterval,
};
use mailsync_core::ports::IProviderStore;

use crate::StoreError;

/// Default send transport recorded for every new account
const SEND_PROTOCOL: &str = "smtp";

/// SQLite-based implementation of the provider store port
///
/// Provides persistent storage for provider accounts and their host
/// configuration rows. All operations go through a connection pool.
pub struct SqliteProviderStore {
    pool: SqlitePool,
}

impl SqliteProviderStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

/// Parse a DateTime<Utc> from an ISO 8601 string
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            StoreError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

/// Reconstruct a ProviderAccount from an accounts row joined with its
/// receive host row
fn account_from_row(row: &SqliteRow) -> Result<ProviderAccount, StoreError> {
    let id: i64 = row.get("id");
    let email_str: String = row.get("email");
    let display_name: String = row.get("display_name");
    let sync_interval_raw: i32 = row.get("sync_interval");
    let created_at_str: String = row.get("created_at");
    let protocol_tag: String = row.get("protocol");

    let email = Email::new(email_str.clone()).map_err(|e| {
        StoreError::SerializationError(format!("Invalid Email '{}': {}", email_str, e))
    })?;

    let sync_interval = SyncInterval::from_raw(sync_interval_raw).map_err(|e| {
        StoreError::SerializationError(format!(
            "Invalid sync interval {}: {}",
            sync_interval_raw, e
        ))
    })?;

    let created_at = parse_datetime(&created_at_str)?;
    let protocol = Protocol::from_tag(&protocol_tag);

    Ok(ProviderAccount::with_id(
        AccountId::new(id),
        email,
        display_name,
        protocol,
        sync_interval,
        created_at,
    ))
}

/// Accounts joined with their receive host row
const SELECT_ACCOUNTS: &str = "SELECT a.id, a.email, a.display_name, a.sync_interval, \
     a.created_at, h.protocol \
     FROM accounts a \
     JOIN host_auth h ON h.account_id = a.id AND h.role = 'recv'";

// ============================================================================
// IProviderStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IProviderStore for SqliteProviderStore {
    async fn list_accounts(&self) -> anyhow::Result<Vec<ProviderAccount>> {
        let sql = format!("{SELECT_ACCOUNTS} ORDER BY a.id ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut accounts = Vec::with_capacity(rows.len());
        for row in &rows {
            accounts.push(account_from_row(row)?);
        }

        Ok(accounts)
    }

    async fn get_account(&self, id: AccountId) -> anyhow::Result<Option<ProviderAccount>> {
        let sql = format!("{SELECT_ACCOUNTS} WHERE a.id = ?");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(account_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn insert_account(&self, draft: &AccountDraft) -> anyhow::Result<ProviderAccount> {
        let created_at = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO accounts (email, display_name, sync_interval, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(draft.email.as_str())
        .bind(&draft.display_name)
        .bind(draft.sync_interval.as_raw())
        .bind(created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        let id = result.last_insert_rowid();

        sqlx::query("INSERT INTO host_auth (account_id, role, protocol) VALUES (?, 'recv', ?)")
            .bind(id)
            .bind(draft.receive_protocol.as_tag())
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO host_auth (account_id, role, protocol) VALUES (?, 'send', ?)")
            .bind(id)
            .bind(SEND_PROTOCOL)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(account_id = id, email = %draft.email, "Inserted account");

        Ok(ProviderAccount::with_id(
            AccountId::new(id),
            draft.email.clone(),
            draft.display_name.clone(),
            draft.receive_protocol.clone(),
            draft.sync_interval,
            created_at,
        ))
    }

    async fn update_sync_interval(
        &self,
        id: AccountId,
        interval: SyncInterval,
    ) -> anyhow::Result<()> {
        let result = sqlx::query("UPDATE accounts SET sync_interval = ? WHERE id = ?")
            .bind(interval.as_raw())
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("No account with id {id}");
        }

        tracing::debug!(account_id = %id, interval = %interval, "Updated sync interval");
        Ok(())
    }

    async fn delete_account(&self, id: AccountId) -> anyhow::Result<()> {
        // Host rows cascade with the account; missing accounts are a no-op
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(account_id = %id, "Deleted account");
        } else {
            tracing::trace!(account_id = %id, "Delete of missing account ignored");
        }

        Ok(())
    }
}
