//! Atomic transfer composition.
//!
//! A transfer is exactly two transactions plus one link row: a withdrawal
//! of `amount + fee` from the source wallet and a deposit of `amount` into
//! the destination, assembled inside the caller's unit of work. The fee
//! falls on the sender; the receiver is always credited the nominal amount.

use serde_json::Value;

use super::error::LedgerError;
use super::recorder::{BatchOutcome, TransactionRecorder};
use super::store::{LedgerUnit, NewTransfer};
use super::types::{Operation, TransferRecord, TransferStatus, WalletRecord};

/// Everything needed to assemble one transfer, amounts already resolved.
#[derive(Debug, Clone)]
pub struct TransferIntent {
    /// Nominal amount credited to the destination.
    pub amount: i64,
    /// Fee charged to the sender on top of the nominal amount.
    pub fee: i64,
    /// Status tag for the transfer row.
    pub status: TransferStatus,
    /// Metadata payload attached to both legs.
    pub meta: Option<Value>,
    /// Whether both legs count toward their balances immediately.
    pub confirmed: bool,
}

/// The two legs and the link row produced by one assembled transfer.
#[derive(Debug, Clone)]
pub struct ComposedTransfer {
    /// The persisted link row.
    pub transfer: TransferRecord,
    /// Outcome of the withdraw leg, including the source's new balance.
    pub withdraw: BatchOutcome,
    /// Outcome of the deposit leg, including the destination's new balance.
    pub deposit: BatchOutcome,
}

/// Assembles withdraw/deposit transaction pairs into transfer records.
pub struct TransferComposer;

impl TransferComposer {
    /// Assembles a transfer from `from` to `to` inside `unit`.
    ///
    /// Both wallet records must have been read under `unit`'s lock. The
    /// withdraw leg runs first, so the balance invariant is checked against
    /// `amount + fee`; a failure there leaves the unit for the caller to
    /// roll back.
    ///
    /// # Errors
    ///
    /// Fails if `amount + fee` overflows or if either leg violates a
    /// balance invariant.
    pub async fn assemble<U: LedgerUnit>(
        unit: &mut U,
        from: &WalletRecord,
        to: &WalletRecord,
        intent: TransferIntent,
    ) -> Result<ComposedTransfer, LedgerError> {
        let total = intent
            .amount
            .checked_add(intent.fee)
            .ok_or(LedgerError::AmountOverflow)?;

        let withdraw = TransactionRecorder::enforce(
            unit,
            from,
            vec![
                Operation::withdraw(total)
                    .confirmed(intent.confirmed)
                    .with_meta(intent.meta.clone()),
            ],
        )
        .await?;

        // A self-transfer's deposit leg must start from the balance the
        // withdraw leg just wrote, not from the stale caller read.
        let to = if to.id == from.id {
            unit.fetch_wallet(to.id).await?
        } else {
            to.clone()
        };
        let deposit = TransactionRecorder::enforce(
            unit,
            &to,
            vec![
                Operation::deposit(intent.amount)
                    .confirmed(intent.confirmed)
                    .with_meta(intent.meta),
            ],
        )
        .await?;

        let transfer = unit
            .persist_transfer(NewTransfer {
                from_wallet: from.id,
                to_wallet: to.id,
                withdraw_id: withdraw.transactions[0].id,
                deposit_id: deposit.transactions[0].id,
                status: intent.status,
                fee: intent.fee,
            })
            .await?;

        Ok(ComposedTransfer {
            transfer,
            withdraw,
            deposit,
        })
    }
}
