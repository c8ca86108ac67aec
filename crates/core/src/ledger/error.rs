//! Ledger error types for validation and balance errors.

use thiserror::Error;

use super::store::StoreError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Amount is not a valid non-negative magnitude.
    #[error("Amount must be a non-negative integer")]
    InvalidAmount,

    /// Applying the amount would overflow the ledger's integer range.
    #[error("Amount overflows the ledger's integer range")]
    AmountOverflow,

    // ========== Balance Errors ==========
    /// Wallet balance is zero where a positive balance is required.
    #[error("Wallet balance is empty")]
    BalanceIsEmpty,

    /// Requested debit exceeds the available balance.
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Balance available at the time of the check.
        available: i64,
        /// Debit magnitude that was requested.
        requested: i64,
    },

    // ========== Transfer Errors ==========
    /// A failure inside a transfer unit, surfaced after rollback.
    #[error("Transfer failed: {source}")]
    TransferFailed {
        /// The failure that aborted the transfer.
        #[source]
        source: Box<LedgerError>,
    },

    // ========== Lookup Errors ==========
    /// No wallet exists for the requested host.
    #[error("Wallet not found")]
    WalletNotFound,

    // ========== Storage Errors ==========
    /// Failure raised by the persistence collaborator.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Wraps a failure that aborted a transfer unit.
    #[must_use]
    pub fn transfer_failed(source: LedgerError) -> Self {
        Self::TransferFailed {
            source: Box::new(source),
        }
    }

    /// Returns the stable error code for this error.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::BalanceIsEmpty => "BALANCE_IS_EMPTY",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::TransferFailed { .. } => "TRANSFER_FAILED",
            Self::WalletNotFound => "WALLET_NOT_FOUND",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Returns true if retrying the operation may succeed.
    ///
    /// Retry policy belongs to the caller; the ledger never retries on its
    /// own.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(err) => err.is_retryable(),
            Self::TransferFailed { source } => source.is_retryable(),
            _ => false,
        }
    }
}
