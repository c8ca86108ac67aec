//! Property-based tests for balance arithmetic.

use proptest::prelude::*;

use super::error::LedgerError;
use super::fee::{FeePolicy, NoFee, PercentFee};
use super::recorder::apply_amount;
use super::types::{Operation, TransactionKind, WalletRecord, DEFAULT_WALLET_SLUG};
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

proptest! {
    /// A successful application is exact addition with a non-negative result.
    #[test]
    fn prop_apply_amount_is_checked_addition(
        balance in 0_i64..=i64::MAX,
        amount in -(i64::MAX)..=i64::MAX,
    ) {
        match apply_amount(balance, amount) {
            Ok(next) => {
                prop_assert_eq!(next, balance + amount);
                prop_assert!(next >= 0);
            }
            Err(LedgerError::AmountOverflow) => {
                prop_assert!(balance.checked_add(amount).is_none());
            }
            Err(LedgerError::BalanceIsEmpty) => {
                prop_assert_eq!(balance, 0);
                prop_assert!(amount < 0);
            }
            Err(LedgerError::InsufficientFunds { available, requested }) => {
                prop_assert_eq!(available, balance);
                prop_assert_eq!(requested, -amount);
                prop_assert!(balance > 0 && balance + amount < 0);
            }
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    /// Folding a sequence of signed amounts never yields a negative balance,
    /// and a fully successful fold equals the plain sum.
    #[test]
    fn prop_fold_never_goes_negative(
        amounts in prop::collection::vec(-1_000_000_i64..=1_000_000, 0..64),
    ) {
        let mut balance = 0_i64;
        let mut applied_sum = 0_i64;
        for amount in &amounts {
            if let Ok(next) = apply_amount(balance, *amount) {
                balance = next;
                applied_sum += amount;
            }
            prop_assert!(balance >= 0);
        }
        prop_assert_eq!(balance, applied_sum);
    }

    /// Operation builders apply the sign convention.
    #[test]
    fn prop_operation_signs(magnitude in 0_i64..=i64::MAX) {
        let deposit = Operation::deposit(magnitude);
        prop_assert_eq!(deposit.kind, TransactionKind::Deposit);
        prop_assert_eq!(deposit.amount, magnitude);

        let withdraw = Operation::withdraw(magnitude);
        prop_assert_eq!(withdraw.kind, TransactionKind::Withdraw);
        prop_assert_eq!(withdraw.amount, -magnitude);
    }

    /// Fee policies are non-negative and the default is free.
    #[test]
    fn prop_fees_non_negative(
        amount in 0_i64..=i64::MAX,
        basis_points in 0_u32..=20_000,
    ) {
        let destination = wallet();
        prop_assert_eq!(NoFee.fee(&destination, amount), 0);

        let fee = PercentFee::new(basis_points).fee(&destination, amount);
        prop_assert!(fee >= 0);
        // At most the proportional share, rounded down.
        if basis_points <= 10_000 {
            prop_assert!(fee <= amount);
        }
    }
}
