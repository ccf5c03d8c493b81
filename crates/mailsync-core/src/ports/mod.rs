//! Port definitions - trait interfaces implemented by adapter crates

pub mod account_registry;
pub mod provider_store;

pub use account_registry::{IAccountRegistry, RegistryEvent};
pub use provider_store::IProviderStore;
