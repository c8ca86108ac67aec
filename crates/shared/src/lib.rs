//! Shared types and configuration for Tally.
//!
//! This crate holds the small vocabulary both the ledger engine and the
//! persistence layer speak: typed IDs, host references, pagination, and
//! application configuration. No business logic lives here.

pub mod config;
pub mod types;

pub use config::{AppConfig, CacheConfig, DatabaseConfig};
pub use types::{HostRef, PageRequest, PageResponse, TransactionId, TransferId, WalletId};
