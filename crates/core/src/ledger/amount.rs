//! Amount validation.
//!
//! Public ledger operations take non-negative integer magnitudes; the sign
//! is applied internally for withdrawals. Zero is allowed: a zero-amount
//! transaction is a valid, inert ledger entry.

use super::error::LedgerError;

/// Validates a caller-supplied amount magnitude.
///
/// # Errors
///
/// Returns `LedgerError::InvalidAmount` if the magnitude is negative.
pub const fn check_amount(magnitude: i64) -> Result<(), LedgerError> {
    if magnitude < 0 {
        return Err(LedgerError::InvalidAmount);
    }
    Ok(())
}
