//! Account domain entities
//!
//! This module defines the two account inventories the reconciler operates
//! on: `ProviderAccount` (the mail application's own database of accounts
//! and their sync settings) and `RegistryAccount` (the platform identity
//! registry's view, which carries no sync settings). It also defines the
//! `Protocol` and `SyncInterval` value types the scheduler derives its
//! report entries from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    errors::DomainError,
    newtypes::{AccountId, Email},
};

// ============================================================================
// Protocol
// ============================================================================

/// Receive-host protocol family of a provider account
///
/// `Eas` is the push-capable, interval-blind family: the server initiates
/// delivery, so interval-based polling must never run concurrently with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Exchange ActiveSync - push-capable, scheduled out-of-band
    Eas,
    /// IMAP - interval-based polling
    Imap,
    /// POP3 - interval-based polling
    Pop3,
    /// Unrecognized protocol tag, treated as interval-based
    Other(String),
}

impl Protocol {
    /// Parses a protocol tag as stored on a receive host
    ///
    /// Never fails: an unrecognized tag maps to [`Protocol::Other`] so a
    /// misconfigured account degrades to interval-based scheduling instead
    /// of being rejected.
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "eas" => Protocol::Eas,
            "imap" => Protocol::Imap,
            "pop3" => Protocol::Pop3,
            _ => Protocol::Other(tag.to_string()),
        }
    }

    /// Returns the canonical protocol tag
    pub fn as_tag(&self) -> &str {
        match self {
            Protocol::Eas => "eas",
            Protocol::Imap => "imap",
            Protocol::Pop3 => "pop3",
            Protocol::Other(tag) => tag,
        }
    }

    /// Returns true if this protocol receives server-initiated delivery
    /// and must be excluded from interval-based polling
    pub fn is_push_capable(&self) -> bool {
        matches!(self, Protocol::Eas)
    }

    /// Returns true if the tag was not recognized
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, Protocol::Other(_))
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_tag())
    }
}

// ============================================================================
// SyncInterval
// ============================================================================

/// Raw stored value meaning "never poll"
const INTERVAL_NEVER_RAW: i32 = -1;

/// Raw stored value meaning "push delivery"
const INTERVAL_PUSH_RAW: i32 = -2;

/// Sync cadence of a provider account
///
/// Stored as a single signed integer: `-1` is NEVER, `-2` is PUSH, and any
/// non-negative value is a poll interval in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncInterval {
    /// Never poll this account
    Never,
    /// Server pushes; no timer-based polling
    Push,
    /// Poll every `n` minutes
    Minutes(u32),
}

impl SyncInterval {
    /// Decodes a raw stored interval value
    ///
    /// # Errors
    /// Returns `DomainError::InvalidInterval` for negative values that are
    /// not one of the two sentinels.
    pub fn from_raw(raw: i32) -> Result<Self, DomainError> {
        match raw {
            INTERVAL_NEVER_RAW => Ok(SyncInterval::Never),
            INTERVAL_PUSH_RAW => Ok(SyncInterval::Push),
            n if n >= 0 => Ok(SyncInterval::Minutes(n as u32)),
            other => Err(DomainError::InvalidInterval(other)),
        }
    }

    /// Encodes the interval for storage
    pub fn as_raw(&self) -> i32 {
        match self {
            SyncInterval::Never => INTERVAL_NEVER_RAW,
            SyncInterval::Push => INTERVAL_PUSH_RAW,
            SyncInterval::Minutes(n) => *n as i32,
        }
    }

    /// Returns true if this interval triggers timer-based polling
    pub fn is_periodic(&self) -> bool {
        matches!(self, SyncInterval::Minutes(_))
    }
}

impl std::fmt::Display for SyncInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncInterval::Never => write!(f, "never"),
            SyncInterval::Push => write!(f, "push"),
            SyncInterval::Minutes(n) => write!(f, "{n}m"),
        }
    }
}

// ============================================================================
// ProviderAccount
// ============================================================================

/// A mail account as known to the provider store
///
/// The email address is the reconciliation join key and must be unique
/// among live accounts. The identifier is assigned by the store at insert
/// time; domain code never fabricates one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAccount {
    /// Store-assigned unique identifier
    id: AccountId,
    /// Email address, unique among live accounts
    email: Email,
    /// Display name shown in account settings
    display_name: String,
    /// Protocol of the receive-host configuration
    receive_protocol: Protocol,
    /// Stored sync cadence
    sync_interval: SyncInterval,
    /// When this account was created
    created_at: DateTime<Utc>,
}

impl ProviderAccount {
    /// Reconstitutes an account with a store-assigned ID
    pub fn with_id(
        id: AccountId,
        email: Email,
        display_name: impl Into<String>,
        receive_protocol: Protocol,
        sync_interval: SyncInterval,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            display_name: display_name.into(),
            receive_protocol,
            sync_interval,
            created_at,
        }
    }

    // --- Getters ---

    /// Returns the account's store-assigned identifier
    pub fn id(&self) -> AccountId {
        self.id
    }

    /// Returns the account's email address
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Returns the account's display name
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the receive-host protocol
    pub fn receive_protocol(&self) -> &Protocol {
        &self.receive_protocol
    }

    /// Returns the stored sync interval
    pub fn sync_interval(&self) -> SyncInterval {
        self.sync_interval
    }

    /// Returns when the account was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // --- Mutations (settings edits) ---

    /// Updates the stored sync interval
    pub fn set_sync_interval(&mut self, interval: SyncInterval) {
        self.sync_interval = interval;
    }

    /// Updates the receive-host protocol
    pub fn set_receive_protocol(&mut self, protocol: Protocol) {
        self.receive_protocol = protocol;
    }

    /// Updates the display name
    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.display_name = name.into();
    }

    /// Builds the registry counterpart for this account
    pub fn registry_account(&self, type_tag: impl Into<String>) -> RegistryAccount {
        RegistryAccount::new(self.email.clone(), type_tag)
    }
}

/// Fields for a not-yet-inserted provider account
///
/// The store assigns the `AccountId` and returns the full entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDraft {
    /// Email address for the new account
    pub email: Email,
    /// Display name for the new account
    pub display_name: String,
    /// Protocol of the receive-host configuration
    pub receive_protocol: Protocol,
    /// Initial sync cadence
    pub sync_interval: SyncInterval,
}

impl AccountDraft {
    /// Creates a draft for insertion into the provider store
    pub fn new(
        email: Email,
        display_name: impl Into<String>,
        receive_protocol: Protocol,
        sync_interval: SyncInterval,
    ) -> Self {
        Self {
            email,
            display_name: display_name.into(),
            receive_protocol,
            sync_interval,
        }
    }
}

// ============================================================================
// RegistryAccount
// ============================================================================

/// An identity entry in the platform account registry
///
/// Identified by its name (the email address) plus the type tag marking it
/// as belonging to this application's sync type. Carries no sync settings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistryAccount {
    /// Registry entry name; equals the provider account's email address
    name: Email,
    /// Sync type tag identifying entries owned by this application
    type_tag: String,
}

impl RegistryAccount {
    /// Creates a registry entry reference
    pub fn new(name: Email, type_tag: impl Into<String>) -> Self {
        Self {
            name,
            type_tag: type_tag.into(),
        }
    }

    /// Returns the entry name (email address)
    pub fn name(&self) -> &Email {
        &self.name
    }

    /// Returns the sync type tag
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }
}

impl std::fmt::Display for RegistryAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.type_tag)
    }
}

// ============================================================================
// Tests
// ============================================================================
