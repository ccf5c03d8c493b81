//! Domain module - entities, value types, and domain errors

pub mod account;
pub mod errors;
pub mod newtypes;

pub use account::{AccountDraft, Protocol, ProviderAccount, RegistryAccount, SyncInterval};
pub use errors::DomainError;
pub use newtypes::{AccountId, Email};
