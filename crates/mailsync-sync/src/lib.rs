//! Mailsync Sync - Account reconciliation and sync scheduling
//!
//! Two cooperating components, both operating on externally supplied
//! snapshots:
//!
//! - [`reconciler`] - diffs the provider store against the account
//!   registry and applies the minimal create/delete set so the two
//!   inventories match, using the email address as the join key.
//! - [`scheduler`] - maintains the per-account sync report table stating
//!   how often (or whether) each account should be polled for mail.
//!
//! Data flows one direction: the reconciler normalizes the account
//! inventory, then the scheduler consumes the normalized inventory to
//! rebuild its report table. They share no mutable state beyond the
//! account store itself.

pub mod reconciler;
pub mod scheduler;

pub use reconciler::{
    diff_inventories, ReconcileActions, ReconcilePolicy, ReconcileSummary, Reconciler,
};
pub use scheduler::{
    AccountsUpdatedListener, ReportScope, SyncReport, SyncReportScheduler,
};
