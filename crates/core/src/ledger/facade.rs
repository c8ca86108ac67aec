//! The wallet host facade.
//!
//! [`Ledger`] is the public surface a host entity talks to: deposit,
//! withdraw, transfer and their forced/safe variants, plus balance reads
//! and history accessors. It orchestrates wallet resolution, amount
//! validation, the recorder, the composer, the fee policy and the balance
//! cache over any [`LedgerStore`] implementation.
//!
//! "Forced" skips the caller-side eligibility pre-check only; the
//! recorder's non-negative invariant stays authoritative, so a forced
//! withdrawal can still fail with `InsufficientFunds`.

use std::sync::Arc;

use serde_json::Value;
use tally_shared::{PageRequest, PageResponse, TransactionId};

use super::amount::check_amount;
use super::cache::BalanceCache;
use super::composer::{ComposedTransfer, TransferComposer, TransferIntent};
use super::error::LedgerError;
use super::fee::{FeePolicy, NoFee};
use super::recorder::TransactionRecorder;
use super::store::{LedgerStore, LedgerUnit, StoreError};
use super::types::{
    HasWallet, Operation, TransactionRecord, TransferRecord, TransferStatus, WalletLocator,
    WalletRecord,
};

/// Optional knobs on a transfer: status tag, metadata, confirmation.
#[derive(Debug, Clone)]
pub struct TransferParams {
    /// Status tag stored on the transfer row.
    pub status: TransferStatus,
    /// Metadata attached to both legs.
    pub meta: Option<Value>,
    /// Whether both legs count toward their balances immediately.
    pub confirmed: bool,
}

impl Default for TransferParams {
    fn default() -> Self {
        Self {
            status: TransferStatus::Transfer,
            meta: None,
            confirmed: true,
        }
    }
}

impl TransferParams {
    /// Sets the status tag.
    #[must_use]
    pub fn with_status(mut self, status: TransferStatus) -> Self {
        self.status = status;
        self
    }

    /// Attaches a metadata payload.
    #[must_use]
    pub fn with_meta(mut self, meta: Option<Value>) -> Self {
        self.meta = meta;
        self
    }

    /// Records both legs as pending rather than confirmed.
    #[must_use]
    pub fn unconfirmed(mut self) -> Self {
        self.confirmed = false;
        self
    }
}

/// Everything a completed transfer produced.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    /// The link row.
    pub transfer: TransferRecord,
    /// The withdraw-side transaction.
    pub withdraw: TransactionRecord,
    /// The deposit-side transaction.
    pub deposit: TransactionRecord,
    /// Source balance after commit.
    pub from_balance: i64,
    /// Destination balance after commit.
    pub to_balance: i64,
}

/// The ledger engine: one instance per store, shared across hosts.
pub struct Ledger<S: LedgerStore> {
    store: S,
    cache: BalanceCache,
    fees: Arc<dyn FeePolicy>,
}

impl<S: LedgerStore + Clone> Clone for Ledger<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
            fees: Arc::clone(&self.fees),
        }
    }
}

impl<S: LedgerStore> Ledger<S> {
    /// Creates a ledger over `store` with free transfers and a default-sized
    /// balance cache.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: BalanceCache::new(),
            fees: Arc::new(NoFee),
        }
    }

    /// Replaces the fee policy.
    #[must_use]
    pub fn with_fee_policy(mut self, fees: impl FeePolicy + 'static) -> Self {
        self.fees = Arc::new(fees);
        self
    }

    /// Replaces the balance cache.
    #[must_use]
    pub fn with_cache(mut self, cache: BalanceCache) -> Self {
        self.cache = cache;
        self
    }

    /// Records a deposit into the host's wallet, creating the wallet if
    /// absent.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidAmount` on a negative amount, or with a storage
    /// error.
    pub async fn deposit(
        &self,
        host: &impl HasWallet,
        amount: i64,
        meta: Option<Value>,
        confirmed: bool,
    ) -> Result<TransactionRecord, LedgerError> {
        check_amount(amount)?;
        self.record_one(
            &host.locator(),
            Operation::deposit(amount).confirmed(confirmed).with_meta(meta),
        )
        .await
    }

    /// Records a withdrawal after a pre-flight eligibility check.
    ///
    /// # Errors
    ///
    /// Fails with `BalanceIsEmpty` or `InsufficientFunds` before any write
    /// if the balance does not cover the amount.
    pub async fn withdraw(
        &self,
        host: &impl HasWallet,
        amount: i64,
        meta: Option<Value>,
        confirmed: bool,
    ) -> Result<TransactionRecord, LedgerError> {
        check_amount(amount)?;
        self.ensure_withdrawable(host, amount).await?;
        self.force_withdraw(host, amount, meta, confirmed).await
    }

    /// Records a withdrawal without the pre-flight check.
    ///
    /// The recorder's invariant still applies: a confirmed withdrawal that
    /// would drive the balance negative fails and writes nothing.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidAmount`, `BalanceIsEmpty`, `InsufficientFunds`,
    /// or a storage error.
    pub async fn force_withdraw(
        &self,
        host: &impl HasWallet,
        amount: i64,
        meta: Option<Value>,
        confirmed: bool,
    ) -> Result<TransactionRecord, LedgerError> {
        check_amount(amount)?;
        self.record_one(
            &host.locator(),
            Operation::withdraw(amount).confirmed(confirmed).with_meta(meta),
        )
        .await
    }

    /// Returns whether the host's balance covers `amount`. No side effects;
    /// a host without a wallet has balance zero.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidAmount` on a negative amount, or with a storage
    /// error.
    pub async fn can_withdraw(
        &self,
        host: &impl HasWallet,
        amount: i64,
    ) -> Result<bool, LedgerError> {
        check_amount(amount)?;
        Ok(self.balance(host).await? >= amount)
    }

    /// Returns the host's balance, served from the cache once seeded.
    ///
    /// A host without a wallet has balance zero.
    ///
    /// # Errors
    ///
    /// Fails only on a storage error.
    pub async fn balance(&self, host: &impl HasWallet) -> Result<i64, LedgerError> {
        let Some(wallet) = self.store.find_wallet(&host.locator()).await? else {
            return Ok(0);
        };
        Ok(self.cache.get_or_seed(wallet.id, wallet.balance))
    }

    /// Moves `amount` from `from` to `to` after a pre-flight eligibility
    /// check on the source.
    ///
    /// # Errors
    ///
    /// Fails with `BalanceIsEmpty` or `InsufficientFunds` before any write
    /// if the source balance does not cover the nominal amount; failures
    /// inside the transfer unit surface as `TransferFailed` after rollback.
    pub async fn transfer(
        &self,
        from: &impl HasWallet,
        to: &impl HasWallet,
        amount: i64,
        params: TransferParams,
    ) -> Result<TransferOutcome, LedgerError> {
        check_amount(amount)?;
        self.ensure_withdrawable(from, amount).await?;
        self.force_transfer(from, to, amount, params).await
    }

    /// Moves `amount` from `from` to `to` without the pre-flight check.
    ///
    /// One atomic unit of work: compute the fee against the destination,
    /// withdraw `amount + fee` from the source, deposit `amount` into the
    /// destination, persist the link row. All of it commits together or
    /// none of it does.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidAmount` before the unit opens; any failure inside
    /// the unit rolls everything back and surfaces as `TransferFailed`.
    pub async fn force_transfer(
        &self,
        from: &impl HasWallet,
        to: &impl HasWallet,
        amount: i64,
        params: TransferParams,
    ) -> Result<TransferOutcome, LedgerError> {
        check_amount(amount)?;
        let mut unit = self.store.begin().await?;
        let composed = match self
            .compose_in(&mut unit, &from.locator(), &to.locator(), amount, params)
            .await
        {
            Ok(composed) => composed,
            // Dropping the unit rolls its writes back.
            Err(err) => return Err(LedgerError::transfer_failed(err)),
        };
        let stamp = self.cache.stamp();
        if let Err(err) = unit.commit().await {
            return Err(LedgerError::transfer_failed(err.into()));
        }

        let from_balance = composed.withdraw.balance;
        let to_balance = composed.deposit.balance;
        // Deposit side last: on a self-transfer both updates share the
        // stamp and the later write carries the final balance.
        self.cache.update(stamp, composed.transfer.from_wallet, from_balance);
        self.cache.update(stamp, composed.transfer.to_wallet, to_balance);

        let withdraw = take_single(composed.withdraw.transactions)?;
        let deposit = take_single(composed.deposit.transactions)?;
        Ok(TransferOutcome {
            transfer: composed.transfer,
            withdraw,
            deposit,
            from_balance,
            to_balance,
        })
    }

    /// Best-effort transfer: any failure is discarded and reported as
    /// `None`.
    ///
    /// No error detail survives this boundary; callers that need the cause
    /// should use [`Ledger::transfer`] instead.
    pub async fn safe_transfer(
        &self,
        from: &impl HasWallet,
        to: &impl HasWallet,
        amount: i64,
        params: TransferParams,
    ) -> Option<TransferOutcome> {
        self.transfer(from, to, amount, params).await.ok()
    }

    /// Confirms a pending transaction, folding its amount into the wallet
    /// balance. Idempotent for already-confirmed transactions.
    ///
    /// # Errors
    ///
    /// Fails if the transaction is missing or confirming it would violate
    /// a balance invariant.
    pub async fn confirm(
        &self,
        transaction: TransactionId,
    ) -> Result<TransactionRecord, LedgerError> {
        let mut unit = self.store.begin().await?;
        let (record, balance) = TransactionRecorder::confirm(&mut unit, transaction).await?;
        let stamp = self.cache.stamp();
        unit.commit().await?;
        self.cache.update(stamp, record.wallet_id, balance);
        Ok(record)
    }

    /// Returns the host's wallet record, if it exists.
    ///
    /// # Errors
    ///
    /// Fails only on a storage error.
    pub async fn wallet(
        &self,
        host: &impl HasWallet,
    ) -> Result<Option<WalletRecord>, LedgerError> {
        Ok(self.store.find_wallet(&host.locator()).await?)
    }

    /// Lists the host's transactions, newest first.
    ///
    /// # Errors
    ///
    /// Fails with `WalletNotFound` if the host has no wallet yet.
    pub async fn transactions(
        &self,
        host: &impl HasWallet,
        page: &PageRequest,
    ) -> Result<PageResponse<TransactionRecord>, LedgerError> {
        let wallet = self
            .store
            .find_wallet(&host.locator())
            .await?
            .ok_or(LedgerError::WalletNotFound)?;
        Ok(self.store.list_transactions(wallet.id, page).await?)
    }

    /// Lists the transfers the host's wallet participated in, newest first.
    ///
    /// # Errors
    ///
    /// Fails with `WalletNotFound` if the host has no wallet yet.
    pub async fn transfers(
        &self,
        host: &impl HasWallet,
        page: &PageRequest,
    ) -> Result<PageResponse<TransferRecord>, LedgerError> {
        let wallet = self
            .store
            .find_wallet(&host.locator())
            .await?
            .ok_or(LedgerError::WalletNotFound)?;
        Ok(self.store.list_transfers(wallet.id, page).await?)
    }

    /// Runs one operation against the host's wallet in its own unit.
    async fn record_one(
        &self,
        locator: &WalletLocator,
        operation: Operation,
    ) -> Result<TransactionRecord, LedgerError> {
        let mut unit = self.store.begin().await?;
        let wallet = Self::resolve(&mut unit, locator).await?;
        let outcome = TransactionRecorder::enforce(&mut unit, &wallet, vec![operation]).await?;
        // Stamped while the unit still holds the wallet lock, so the cache
        // write below cannot be reordered against a later committer's.
        let stamp = self.cache.stamp();
        unit.commit().await?;
        self.cache.update(stamp, wallet.id, outcome.balance);
        take_single(outcome.transactions)
    }

    /// Resolves the two wallets, consults the fee policy, and assembles the
    /// transfer, all inside `unit`.
    async fn compose_in(
        &self,
        unit: &mut S::Unit,
        from: &WalletLocator,
        to: &WalletLocator,
        amount: i64,
        params: TransferParams,
    ) -> Result<ComposedTransfer, LedgerError> {
        let from_wallet = Self::resolve(unit, from).await?;
        let to_wallet = Self::resolve(unit, to).await?;
        let fee = self.fees.fee(&to_wallet, amount);
        TransferComposer::assemble(
            unit,
            &from_wallet,
            &to_wallet,
            TransferIntent {
                amount,
                fee,
                status: params.status,
                meta: params.meta,
                confirmed: params.confirmed,
            },
        )
        .await
    }

    /// Resolves a locator under `unit`'s lock. Host locators get-or-create;
    /// wallet-ID locators must already exist.
    async fn resolve(
        unit: &mut S::Unit,
        locator: &WalletLocator,
    ) -> Result<WalletRecord, LedgerError> {
        match locator {
            WalletLocator::Id(id) => match unit.fetch_wallet(*id).await {
                Ok(wallet) => Ok(wallet),
                Err(StoreError::WalletNotFound(_)) => Err(LedgerError::WalletNotFound),
                Err(err) => Err(err.into()),
            },
            WalletLocator::Host { host, slug } => {
                Ok(unit.find_or_create_wallet(host, slug).await?)
            }
        }
    }

    /// Read-only pre-flight check used by `withdraw` and `transfer`.
    async fn ensure_withdrawable(
        &self,
        host: &impl HasWallet,
        amount: i64,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self.balance(host).await?;
        if balance == 0 {
            return Err(LedgerError::BalanceIsEmpty);
        }
        if balance < amount {
            return Err(LedgerError::InsufficientFunds {
                available: balance,
                requested: amount,
            });
        }
        Ok(())
    }
}

fn take_single(transactions: Vec<TransactionRecord>) -> Result<TransactionRecord, LedgerError> {
    transactions
        .into_iter()
        .next()
        .ok_or_else(|| StoreError::Backend("recorder returned an empty batch".to_string()).into())
}
