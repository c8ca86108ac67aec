//! Core ledger engine for Tally.
//!
//! This crate contains the wallet ledger logic with ZERO web or database
//! dependencies. Persistence is consumed through the [`ledger::store`]
//! traits; a database-backed implementation lives in `tally-db`, and an
//! in-memory reference implementation ships here for tests and light
//! embedders.
//!
//! # Modules
//!
//! - `ledger` - balance computation, transaction recording, transfer
//!   composition, and the wallet host facade

pub mod ledger;

pub use ledger::{
    BalanceCache, FeePolicy, HasWallet, Ledger, LedgerError, LedgerStore, LedgerUnit, MemoryStore,
    Operation, TransactionKind, TransactionRecord, TransferOutcome, TransferParams, TransferRecord,
    TransferStatus, WalletLocator, WalletRecord,
};
