//! Wallet ledger logic.
//!
//! This module implements the core ledger functionality:
//! - Amount validation
//! - Per-wallet balance caching
//! - Pluggable transfer fees
//! - Transaction recording (deposits, withdrawals, confirmation)
//! - Atomic transfer composition
//! - The wallet host facade exposed to owning entities
//! - The storage trait boundary and an in-memory reference store

pub mod amount;
pub mod cache;
pub mod composer;
pub mod error;
pub mod facade;
pub mod fee;
pub mod memory;
pub mod recorder;
pub mod store;
pub mod types;

#[cfg(test)]
mod recorder_props;

pub use amount::check_amount;
pub use cache::{BalanceCache, WriteStamp};
pub use composer::{ComposedTransfer, TransferComposer, TransferIntent};
pub use error::LedgerError;
pub use facade::{Ledger, TransferOutcome, TransferParams};
pub use fee::{FeePolicy, FlatFee, NoFee, PercentFee};
pub use memory::MemoryStore;
pub use recorder::{BatchOutcome, TransactionRecorder};
pub use store::{LedgerStore, LedgerUnit, NewTransaction, NewTransfer, StoreError};
pub use types::{
    DEFAULT_WALLET_SLUG, HasWallet, Operation, TransactionKind, TransactionRecord, TransferRecord,
    TransferStatus, WalletLocator, WalletRecord,
};
