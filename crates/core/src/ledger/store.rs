//! Storage trait boundary.
//!
//! The ledger core does not implement storage; it orchestrates it through
//! these traits. A [`LedgerUnit`] is one atomic unit of work: every write
//! made through it becomes visible together on `commit`, or not at all.
//! Nested composition (a transfer wrapping two recorder calls plus a link
//! row) is expressed structurally: inner steps borrow the outer unit, so
//! there is exactly one commit.
//!
//! Implementations must hold an exclusive lock (or equivalent optimistic
//! re-check) on each wallet touched, for the duration of its
//! read-modify-write: a concurrent reader must never observe half a
//! transfer, and two concurrent withdrawals must not both pass the
//! non-negative check.

use async_trait::async_trait;
use serde_json::Value;
use tally_shared::{HostRef, PageRequest, PageResponse, TransactionId, WalletId};
use thiserror::Error;

use super::types::{
    TransactionKind, TransactionRecord, TransferRecord, TransferStatus, WalletLocator,
    WalletRecord,
};

/// Errors raised by the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Wallet row does not exist.
    #[error("Wallet not found: {0}")]
    WalletNotFound(WalletId),

    /// Transaction row does not exist.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Lock contention or commit conflict; the unit was rolled back.
    #[error("Write conflict, please retry: {0}")]
    Conflict(String),

    /// Any other backend failure.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns true if retrying the enclosing unit may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Input for persisting one transaction row.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    /// Owning wallet.
    pub wallet_id: WalletId,
    /// Deposit or withdrawal.
    pub kind: TransactionKind,
    /// Signed amount.
    pub amount: i64,
    /// Whether the amount counts toward the balance.
    pub confirmed: bool,
    /// Opaque metadata payload.
    pub meta: Option<Value>,
}

/// Input for persisting one transfer row.
#[derive(Debug, Clone)]
pub struct NewTransfer {
    /// Source wallet.
    pub from_wallet: WalletId,
    /// Destination wallet.
    pub to_wallet: WalletId,
    /// The withdraw-side transaction.
    pub withdraw_id: TransactionId,
    /// The deposit-side transaction.
    pub deposit_id: TransactionId,
    /// Status tag.
    pub status: TransferStatus,
    /// Fee charged to the sender.
    pub fee: i64,
}

/// The persistence collaborator consumed by the ledger core.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// The unit-of-work handle this store produces.
    type Unit: LedgerUnit;

    /// Opens a new atomic unit of work.
    async fn begin(&self) -> Result<Self::Unit, StoreError>;

    /// Read-only wallet lookup; `None` if no wallet exists yet.
    async fn find_wallet(&self, locator: &WalletLocator)
    -> Result<Option<WalletRecord>, StoreError>;

    /// Lists a wallet's transactions, newest first.
    async fn list_transactions(
        &self,
        wallet: WalletId,
        page: &PageRequest,
    ) -> Result<PageResponse<TransactionRecord>, StoreError>;

    /// Lists the transfers a wallet participated in, newest first.
    async fn list_transfers(
        &self,
        wallet: WalletId,
        page: &PageRequest,
    ) -> Result<PageResponse<TransferRecord>, StoreError>;
}

/// One atomic unit of work.
///
/// Dropping a unit without committing discards every write made through it.
#[async_trait]
pub trait LedgerUnit: Send {
    /// Resolves a host's wallet under this unit's lock, creating it with a
    /// zero balance and default name if absent.
    async fn find_or_create_wallet(
        &mut self,
        host: &HostRef,
        slug: &str,
    ) -> Result<WalletRecord, StoreError>;

    /// Re-reads a wallet row under this unit's lock.
    async fn fetch_wallet(&mut self, id: WalletId) -> Result<WalletRecord, StoreError>;

    /// Re-reads a transaction row under this unit's lock.
    async fn fetch_transaction(
        &mut self,
        id: TransactionId,
    ) -> Result<TransactionRecord, StoreError>;

    /// Persists one transaction row.
    async fn persist_transaction(
        &mut self,
        new: NewTransaction,
    ) -> Result<TransactionRecord, StoreError>;

    /// Persists one transfer row linking two existing transactions.
    async fn persist_transfer(&mut self, new: NewTransfer) -> Result<TransferRecord, StoreError>;

    /// Writes a wallet's new materialized balance.
    async fn update_wallet_balance(
        &mut self,
        id: WalletId,
        balance: i64,
    ) -> Result<(), StoreError>;

    /// Flips a transaction's confirmed flag to true.
    async fn set_confirmed(&mut self, id: TransactionId)
    -> Result<TransactionRecord, StoreError>;

    /// Makes every write in this unit visible atomically.
    async fn commit(self) -> Result<(), StoreError>;

    /// Discards every write in this unit explicitly.
    async fn rollback(self) -> Result<(), StoreError>;
}
