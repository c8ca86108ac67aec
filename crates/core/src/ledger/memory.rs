//! In-memory reference store.
//!
//! Backs the engine's test suite and light embedders that do not need
//! durable storage. Isolation is the blunt kind: a unit holds an exclusive
//! lock over the whole ledger state, so units execute one at a time. Writes
//! land in a working copy and are published on commit; dropping the unit
//! discards them.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use tally_shared::{HostRef, PageRequest, PageResponse, TransactionId, TransferId, WalletId};

use super::store::{LedgerStore, LedgerUnit, NewTransaction, NewTransfer, StoreError};
use super::types::{TransactionRecord, TransferRecord, WalletLocator, WalletRecord};

#[derive(Debug, Clone, Default)]
struct State {
    wallets: HashMap<WalletId, WalletRecord>,
    wallets_by_host: HashMap<(String, Uuid, String), WalletId>,
    transactions: HashMap<TransactionId, TransactionRecord>,
    transaction_order: Vec<TransactionId>,
    transfers: HashMap<TransferId, TransferRecord>,
    transfer_order: Vec<TransferId>,
}

impl State {
    fn host_key(host: &HostRef, slug: &str) -> (String, Uuid, String) {
        (host.kind.clone(), host.id, slug.to_string())
    }

    fn find_wallet(&self, locator: &WalletLocator) -> Option<&WalletRecord> {
        match locator {
            WalletLocator::Id(id) => self.wallets.get(id),
            WalletLocator::Host { host, slug } => self
                .wallets_by_host
                .get(&Self::host_key(host, slug))
                .and_then(|id| self.wallets.get(id)),
        }
    }
}

/// In-memory implementation of [`LedgerStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    type Unit = MemoryUnit;

    async fn begin(&self) -> Result<Self::Unit, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let work = guard.clone();
        Ok(MemoryUnit { guard, work })
    }

    async fn find_wallet(
        &self,
        locator: &WalletLocator,
    ) -> Result<Option<WalletRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.find_wallet(locator).cloned())
    }

    async fn list_transactions(
        &self,
        wallet: WalletId,
        page: &PageRequest,
    ) -> Result<PageResponse<TransactionRecord>, StoreError> {
        let state = self.state.lock().await;
        let matching: Vec<TransactionRecord> = state
            .transaction_order
            .iter()
            .rev()
            .filter_map(|id| state.transactions.get(id))
            .filter(|txn| txn.wallet_id == wallet)
            .cloned()
            .collect();
        Ok(paginate(matching, page))
    }

    async fn list_transfers(
        &self,
        wallet: WalletId,
        page: &PageRequest,
    ) -> Result<PageResponse<TransferRecord>, StoreError> {
        let state = self.state.lock().await;
        let matching: Vec<TransferRecord> = state
            .transfer_order
            .iter()
            .rev()
            .filter_map(|id| state.transfers.get(id))
            .filter(|t| t.from_wallet == wallet || t.to_wallet == wallet)
            .cloned()
            .collect();
        Ok(paginate(matching, page))
    }
}

fn paginate<T>(items: Vec<T>, page: &PageRequest) -> PageResponse<T> {
    let total = items.len() as u64;
    let data: Vec<T> = items
        .into_iter()
        .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
        .take(usize::try_from(page.limit()).unwrap_or(usize::MAX))
        .collect();
    PageResponse::new(data, page.page, page.per_page, total)
}

/// Unit of work over the in-memory store.
///
/// Holds the store's exclusive lock; all reads and writes go through the
/// working copy, published on commit.
pub struct MemoryUnit {
    guard: OwnedMutexGuard<State>,
    work: State,
}

#[async_trait]
impl LedgerUnit for MemoryUnit {
    async fn find_or_create_wallet(
        &mut self,
        host: &HostRef,
        slug: &str,
    ) -> Result<WalletRecord, StoreError> {
        let key = State::host_key(host, slug);
        if let Some(id) = self.work.wallets_by_host.get(&key) {
            return self
                .work
                .wallets
                .get(id)
                .cloned()
                .ok_or(StoreError::WalletNotFound(*id));
        }

        let wallet = WalletRecord {
            id: WalletId::new(),
            host: host.clone(),
            name: format!("{slug} wallet"),
            slug: slug.to_string(),
            balance: 0,
        };
        self.work.wallets_by_host.insert(key, wallet.id);
        self.work.wallets.insert(wallet.id, wallet.clone());
        Ok(wallet)
    }

    async fn fetch_wallet(&mut self, id: WalletId) -> Result<WalletRecord, StoreError> {
        self.work
            .wallets
            .get(&id)
            .cloned()
            .ok_or(StoreError::WalletNotFound(id))
    }

    async fn fetch_transaction(
        &mut self,
        id: TransactionId,
    ) -> Result<TransactionRecord, StoreError> {
        self.work
            .transactions
            .get(&id)
            .cloned()
            .ok_or(StoreError::TransactionNotFound(id))
    }

    async fn persist_transaction(
        &mut self,
        new: NewTransaction,
    ) -> Result<TransactionRecord, StoreError> {
        if !self.work.wallets.contains_key(&new.wallet_id) {
            return Err(StoreError::WalletNotFound(new.wallet_id));
        }
        let record = TransactionRecord {
            id: TransactionId::new(),
            wallet_id: new.wallet_id,
            kind: new.kind,
            amount: new.amount,
            confirmed: new.confirmed,
            meta: new.meta,
            created_at: Utc::now(),
        };
        self.work.transaction_order.push(record.id);
        self.work.transactions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn persist_transfer(&mut self, new: NewTransfer) -> Result<TransferRecord, StoreError> {
        for txn in [new.withdraw_id, new.deposit_id] {
            if !self.work.transactions.contains_key(&txn) {
                return Err(StoreError::TransactionNotFound(txn));
            }
        }
        let record = TransferRecord {
            id: TransferId::new(),
            from_wallet: new.from_wallet,
            to_wallet: new.to_wallet,
            withdraw_id: new.withdraw_id,
            deposit_id: new.deposit_id,
            status: new.status,
            fee: new.fee,
            created_at: Utc::now(),
        };
        self.work.transfer_order.push(record.id);
        self.work.transfers.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_wallet_balance(
        &mut self,
        id: WalletId,
        balance: i64,
    ) -> Result<(), StoreError> {
        let wallet = self
            .work
            .wallets
            .get_mut(&id)
            .ok_or(StoreError::WalletNotFound(id))?;
        wallet.balance = balance;
        Ok(())
    }

    async fn set_confirmed(
        &mut self,
        id: TransactionId,
    ) -> Result<TransactionRecord, StoreError> {
        let txn = self
            .work
            .transactions
            .get_mut(&id)
            .ok_or(StoreError::TransactionNotFound(id))?;
        txn.confirmed = true;
        Ok(txn.clone())
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        *self.guard = self.work;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        // Dropping the working copy is the rollback.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::{DEFAULT_WALLET_SLUG, HasWallet, TransactionKind};

    fn host() -> HostRef {
        HostRef::new("user", Uuid::now_v7())
    }

    #[tokio::test]
    async fn test_find_or_create_is_idempotent() {
        let store = MemoryStore::new();
        let host = host();

        let mut unit = store.begin().await.unwrap();
        let first = unit
            .find_or_create_wallet(&host, DEFAULT_WALLET_SLUG)
            .await
            .unwrap();
        let second = unit
            .find_or_create_wallet(&host, DEFAULT_WALLET_SLUG)
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.balance, 0);
    }

    #[tokio::test]
    async fn test_uncommitted_writes_invisible() {
        let store = MemoryStore::new();
        let host = host();

        {
            let mut unit = store.begin().await.unwrap();
            unit.find_or_create_wallet(&host, DEFAULT_WALLET_SLUG)
                .await
                .unwrap();
            // Dropped without commit.
        }

        let found = store.find_wallet(&host.locator()).await.unwrap();
        assert!(found.is_none(), "dropped unit must leave no trace");
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryStore::new();
        let host = host();

        let mut unit = store.begin().await.unwrap();
        let wallet = unit
            .find_or_create_wallet(&host, DEFAULT_WALLET_SLUG)
            .await
            .unwrap();
        unit.persist_transaction(NewTransaction {
            wallet_id: wallet.id,
            kind: TransactionKind::Deposit,
            amount: 100,
            confirmed: true,
            meta: None,
        })
        .await
        .unwrap();
        unit.update_wallet_balance(wallet.id, 100).await.unwrap();
        unit.commit().await.unwrap();

        let found = store.find_wallet(&host.locator()).await.unwrap().unwrap();
        assert_eq!(found.balance, 100);

        let page = store
            .list_transactions(wallet.id, &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.meta.total, 1);
        assert_eq!(page.data[0].amount, 100);
    }

    #[tokio::test]
    async fn test_transfer_requires_existing_transactions() {
        let store = MemoryStore::new();
        let mut unit = store.begin().await.unwrap();
        let wallet = unit
            .find_or_create_wallet(&host(), DEFAULT_WALLET_SLUG)
            .await
            .unwrap();

        let result = unit
            .persist_transfer(NewTransfer {
                from_wallet: wallet.id,
                to_wallet: wallet.id,
                withdraw_id: TransactionId::new(),
                deposit_id: TransactionId::new(),
                status: crate::ledger::types::TransferStatus::Transfer,
                fee: 0,
            })
            .await;
        assert!(matches!(result, Err(StoreError::TransactionNotFound(_))));
    }

    #[tokio::test]
    async fn test_units_serialize() {
        let store = MemoryStore::new();
        let host = host();

        let mut unit = store.begin().await.unwrap();
        unit.find_or_create_wallet(&host, DEFAULT_WALLET_SLUG)
            .await
            .unwrap();

        // A second unit must wait for the first to finish.
        let store2 = store.clone();
        let pending = tokio::spawn(async move {
            let _unit = store2.begin().await.unwrap();
        });
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        unit.commit().await.unwrap();
        pending.await.unwrap();
    }
}
