//! Transaction recording.
//!
//! The recorder is the only writer of transaction rows and materialized
//! balances. It enforces the ledger's two balance invariants while applying
//! a batch of operations under one unit of work:
//!
//! - the running balance never overflows `i64`, and
//! - the running balance never goes negative, checked after each operation
//!   in order, so the batch `[withdraw 100, deposit 100]` fails on a zero
//!   balance even though its net effect is zero.
//!
//! Unconfirmed operations are persisted but do not move the balance until
//! [`TransactionRecorder::confirm`] folds them in.

use super::error::LedgerError;
use super::store::{LedgerUnit, NewTransaction};
use super::types::{Operation, TransactionRecord, WalletRecord};
use tally_shared::TransactionId;

/// Result of applying a batch of operations to one wallet.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Persisted transaction rows, in operation order.
    pub transactions: Vec<TransactionRecord>,
    /// Wallet balance after the batch.
    pub balance: i64,
}

/// Applies one signed amount to a balance, enforcing both invariants.
///
/// # Errors
///
/// Returns `LedgerError::AmountOverflow` if the addition leaves the `i64`
/// range, `LedgerError::BalanceIsEmpty` for a debit from a zero balance,
/// and `LedgerError::InsufficientFunds` for a debit exceeding a positive
/// balance.
pub const fn apply_amount(balance: i64, amount: i64) -> Result<i64, LedgerError> {
    let Some(next) = balance.checked_add(amount) else {
        return Err(LedgerError::AmountOverflow);
    };
    if next < 0 {
        if balance == 0 {
            return Err(LedgerError::BalanceIsEmpty);
        }
        return Err(LedgerError::InsufficientFunds {
            available: balance,
            requested: -amount,
        });
    }
    Ok(next)
}

/// Writes transaction rows and the materialized balance for one wallet.
pub struct TransactionRecorder;

impl TransactionRecorder {
    /// Applies `operations` to `wallet` in order, persisting one transaction
    /// row per operation and writing the final balance once.
    ///
    /// The caller must have read `wallet` under `unit`'s lock; the running
    /// balance starts from that row, not from any cache. Confirmed
    /// operations move the running balance; unconfirmed ones are recorded
    /// without touching it.
    ///
    /// # Errors
    ///
    /// Fails on the first operation that violates an invariant, leaving the
    /// unit's writes to be rolled back by the caller.
    pub async fn enforce<U: LedgerUnit>(
        unit: &mut U,
        wallet: &WalletRecord,
        operations: Vec<Operation>,
    ) -> Result<BatchOutcome, LedgerError> {
        let mut balance = wallet.balance;
        let mut transactions = Vec::with_capacity(operations.len());

        for op in operations {
            if op.confirmed {
                balance = apply_amount(balance, op.amount)?;
            }
            let record = unit
                .persist_transaction(NewTransaction {
                    wallet_id: wallet.id,
                    kind: op.kind,
                    amount: op.amount,
                    confirmed: op.confirmed,
                    meta: op.meta,
                })
                .await?;
            transactions.push(record);
        }

        if balance != wallet.balance {
            unit.update_wallet_balance(wallet.id, balance).await?;
        }

        Ok(BatchOutcome {
            transactions,
            balance,
        })
    }

    /// Folds a previously unconfirmed transaction into its wallet's balance.
    ///
    /// Idempotent: confirming an already-confirmed transaction returns it
    /// unchanged along with the current balance.
    ///
    /// # Errors
    ///
    /// Fails if the transaction or its wallet is missing, or if folding the
    /// amount in would violate a balance invariant.
    pub async fn confirm<U: LedgerUnit>(
        unit: &mut U,
        transaction: TransactionId,
    ) -> Result<(TransactionRecord, i64), LedgerError> {
        let record = unit.fetch_transaction(transaction).await?;
        let wallet = unit.fetch_wallet(record.wallet_id).await?;
        if record.confirmed {
            return Ok((record, wallet.balance));
        }

        let balance = apply_amount(wallet.balance, record.amount)?;
        let record = unit.set_confirmed(record.id).await?;
        unit.update_wallet_balance(wallet.id, balance).await?;
        Ok((record, balance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::memory::MemoryStore;
    use crate::ledger::store::LedgerStore;
    use crate::ledger::types::DEFAULT_WALLET_SLUG;
    use tally_shared::HostRef;
    use uuid::Uuid;

    async fn wallet_with_balance(
        store: &MemoryStore,
        balance: i64,
    ) -> (<MemoryStore as LedgerStore>::Unit, WalletRecord) {
        let mut unit = store.begin().await.unwrap();
        let wallet = unit
            .find_or_create_wallet(&HostRef::new("user", Uuid::now_v7()), DEFAULT_WALLET_SLUG)
            .await
            .unwrap();
        if balance != 0 {
            let outcome =
                TransactionRecorder::enforce(&mut unit, &wallet, vec![Operation::deposit(balance)])
                    .await
                    .unwrap();
            let mut wallet = wallet;
            wallet.balance = outcome.balance;
            return (unit, wallet);
        }
        (unit, wallet)
    }

    #[test]
    fn test_apply_amount_basic() {
        assert_eq!(apply_amount(0, 100).unwrap(), 100);
        assert_eq!(apply_amount(100, -30).unwrap(), 70);
        assert_eq!(apply_amount(70, -70).unwrap(), 0);
    }

    #[test]
    fn test_apply_amount_empty_balance() {
        assert!(matches!(
            apply_amount(0, -1),
            Err(LedgerError::BalanceIsEmpty)
        ));
    }

    #[test]
    fn test_apply_amount_insufficient() {
        assert!(matches!(
            apply_amount(70, -100),
            Err(LedgerError::InsufficientFunds {
                available: 70,
                requested: 100,
            })
        ));
    }

    #[test]
    fn test_apply_amount_overflow() {
        assert!(matches!(
            apply_amount(i64::MAX, 1),
            Err(LedgerError::AmountOverflow)
        ));
    }

    #[tokio::test]
    async fn test_enforce_orders_matter() {
        let store = MemoryStore::new();
        let (mut unit, wallet) = wallet_with_balance(&store, 0).await;

        // Net-zero batch, but the withdrawal comes first.
        let result = TransactionRecorder::enforce(
            &mut unit,
            &wallet,
            vec![Operation::withdraw(100), Operation::deposit(100)],
        )
        .await;
        assert!(matches!(result, Err(LedgerError::BalanceIsEmpty)));
    }

    #[tokio::test]
    async fn test_enforce_batch_running_balance() {
        let store = MemoryStore::new();
        let (mut unit, wallet) = wallet_with_balance(&store, 0).await;

        let outcome = TransactionRecorder::enforce(
            &mut unit,
            &wallet,
            vec![
                Operation::deposit(100),
                Operation::withdraw(30),
                Operation::withdraw(70),
            ],
        )
        .await
        .unwrap();
        assert_eq!(outcome.balance, 0);
        assert_eq!(outcome.transactions.len(), 3);
        assert_eq!(
            outcome
                .transactions
                .iter()
                .map(|t| t.amount)
                .collect::<Vec<_>>(),
            vec![100, -30, -70]
        );
    }

    #[tokio::test]
    async fn test_unconfirmed_does_not_move_balance() {
        let store = MemoryStore::new();
        let (mut unit, wallet) = wallet_with_balance(&store, 50).await;

        let outcome = TransactionRecorder::enforce(
            &mut unit,
            &wallet,
            vec![Operation::deposit(100).unconfirmed()],
        )
        .await
        .unwrap();
        assert_eq!(outcome.balance, 50);
        assert!(!outcome.transactions[0].confirmed);
    }

    #[tokio::test]
    async fn test_confirm_folds_amount_in() {
        let store = MemoryStore::new();
        let (mut unit, wallet) = wallet_with_balance(&store, 50).await;

        let outcome = TransactionRecorder::enforce(
            &mut unit,
            &wallet,
            vec![Operation::deposit(100).unconfirmed()],
        )
        .await
        .unwrap();
        let pending = outcome.transactions[0].id;

        let (record, balance) = TransactionRecorder::confirm(&mut unit, pending)
            .await
            .unwrap();
        assert!(record.confirmed);
        assert_eq!(balance, 150);

        // Confirming again is a no-op.
        let (record, balance) = TransactionRecorder::confirm(&mut unit, pending)
            .await
            .unwrap();
        assert!(record.confirmed);
        assert_eq!(balance, 150);
    }

    #[tokio::test]
    async fn test_confirm_unconfirmed_withdrawal_checks_funds() {
        let store = MemoryStore::new();
        let (mut unit, wallet) = wallet_with_balance(&store, 50).await;

        let outcome = TransactionRecorder::enforce(
            &mut unit,
            &wallet,
            vec![Operation::withdraw(80).unconfirmed()],
        )
        .await
        .unwrap();
        let pending = outcome.transactions[0].id;

        let result = TransactionRecorder::confirm(&mut unit, pending).await;
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientFunds {
                available: 50,
                requested: 80,
            })
        ));
    }

    #[tokio::test]
    async fn test_zero_amount_operation_is_inert() {
        let store = MemoryStore::new();
        let (mut unit, wallet) = wallet_with_balance(&store, 50).await;

        let outcome =
            TransactionRecorder::enforce(&mut unit, &wallet, vec![Operation::withdraw(0)])
                .await
                .unwrap();
        assert_eq!(outcome.balance, 50);
        assert_eq!(outcome.transactions[0].amount, 0);
    }
}
