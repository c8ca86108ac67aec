//! Pluggable transfer fees.
//!
//! The fee is charged to the *sender* by increasing the amount withdrawn;
//! the receiver always gets exactly the nominal amount. Policies are pure:
//! same inputs, same fee, no side effects.

use super::types::WalletRecord;

/// Maps a destination wallet and nominal amount to a non-negative fee.
pub trait FeePolicy: Send + Sync {
    /// Returns the fee in minor units for transferring `amount` into
    /// `destination`.
    fn fee(&self, destination: &WalletRecord, amount: i64) -> i64;
}

/// The default policy: transfers are free.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFee;

impl FeePolicy for NoFee {
    fn fee(&self, _destination: &WalletRecord, _amount: i64) -> i64 {
        0
    }
}

/// Charges a fixed fee per transfer, regardless of amount.
#[derive(Debug, Clone, Copy)]
pub struct FlatFee {
    fee: i64,
}

impl FlatFee {
    /// Creates a flat-fee policy. Negative fees are clamped to zero.
    #[must_use]
    pub const fn new(fee: i64) -> Self {
        Self {
            fee: if fee < 0 { 0 } else { fee },
        }
    }
}

impl FeePolicy for FlatFee {
    fn fee(&self, _destination: &WalletRecord, amount: i64) -> i64 {
        // Zero-amount transfers stay free even under a flat fee.
        if amount == 0 { 0 } else { self.fee }
    }
}

/// Charges a proportional fee expressed in basis points (1/100th of a
/// percent), rounded down.
#[derive(Debug, Clone, Copy)]
pub struct PercentFee {
    basis_points: u32,
}

impl PercentFee {
    /// Creates a proportional fee policy of `basis_points` / 10000.
    #[must_use]
    pub const fn new(basis_points: u32) -> Self {
        Self { basis_points }
    }
}

impl FeePolicy for PercentFee {
    fn fee(&self, _destination: &WalletRecord, amount: i64) -> i64 {
        if amount <= 0 {
            return 0;
        }
        // i128 keeps the intermediate product from overflowing.
        let fee = i128::from(amount) * i128::from(self.basis_points) / 10_000;
        i64::try_from(fee).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::DEFAULT_WALLET_SLUG;
    use rstest::rstest;
    use tally_shared::{HostRef, WalletId};
    use uuid::Uuid;

    fn wallet() -> WalletRecord {
        WalletRecord {
            id: WalletId::new(),
            host: HostRef::new("user", Uuid::now_v7()),
            name: "Default Wallet".to_string(),
            slug: DEFAULT_WALLET_SLUG.to_string(),
            balance: 0,
        }
    }

    #[test]
    fn test_no_fee() {
        assert_eq!(NoFee.fee(&wallet(), 1_000_000), 0);
    }

    #[test]
    fn test_flat_fee() {
        let policy = FlatFee::new(5);
        assert_eq!(policy.fee(&wallet(), 50), 5);
        assert_eq!(policy.fee(&wallet(), 1), 5);
        assert_eq!(policy.fee(&wallet(), 0), 0);
    }

    #[test]
    fn test_flat_fee_clamps_negative() {
        let policy = FlatFee::new(-10);
        assert_eq!(policy.fee(&wallet(), 100), 0);
    }

    #[rstest]
    #[case(250, 1000, 25)] // 2.5%
    #[case(250, 39, 0)]
    #[case(250, 40, 1)]
    #[case(10_000, 0, 0)]
    #[case(0, 1000, 0)]
    fn test_percent_fee_rounds_down(
        #[case] basis_points: u32,
        #[case] amount: i64,
        #[case] expected: i64,
    ) {
        let policy = PercentFee::new(basis_points);
        assert_eq!(policy.fee(&wallet(), amount), expected);
    }

    #[test]
    fn test_percent_fee_large_amount_no_overflow() {
        let policy = PercentFee::new(10_000); // 100%
        assert_eq!(policy.fee(&wallet(), i64::MAX), i64::MAX);
    }
}
