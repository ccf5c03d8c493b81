//! Mailsync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `ProviderAccount`, `RegistryAccount`, `Protocol`, `SyncInterval`
//! - **Port definitions** - Traits for adapters: `IProviderStore`, `IAccountRegistry`
//! - **Configuration** - Typed config loaded from YAML
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external dependencies.
//! Ports define trait interfaces that adapter crates implement. The reconciler
//! and scheduler in `mailsync-sync` orchestrate domain entities through the
//! port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
