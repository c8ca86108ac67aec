//! Postgres implementation of the ledger storage traits.
//!
//! A [`SqlLedgerUnit`] wraps one `SeaORM` transaction. Wallet rows are read
//! with `SELECT ... FOR UPDATE` inside a unit, so concurrent units touching
//! the same wallet serialize on its row lock and the recorder's balance
//! check always runs against the committed value. Serialization failures,
//! deadlocks, and unique-key races surface as retryable conflicts.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RuntimeErr, Set, SqlErr,
    TransactionTrait,
};

use tally_core::ledger::store::{LedgerStore, LedgerUnit, NewTransaction, NewTransfer, StoreError};
use tally_core::ledger::types::{
    TransactionKind, TransactionRecord, TransferRecord, TransferStatus, WalletLocator,
    WalletRecord,
};
use tally_shared::{HostRef, PageRequest, PageResponse, TransactionId, TransferId, WalletId};

use crate::entities::{transactions, transfers, wallets};

/// Ledger store backed by a `SeaORM` connection pool.
#[derive(Clone)]
pub struct SqlLedgerStore {
    db: DatabaseConnection,
}

impl SqlLedgerStore {
    /// Creates a store over an established connection pool.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LedgerStore for SqlLedgerStore {
    type Unit = SqlLedgerUnit;

    async fn begin(&self) -> Result<Self::Unit, StoreError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        Ok(SqlLedgerUnit { txn })
    }

    async fn find_wallet(
        &self,
        locator: &WalletLocator,
    ) -> Result<Option<WalletRecord>, StoreError> {
        let model = wallet_select(locator)
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(model.map(wallet_from_model))
    }

    async fn list_transactions(
        &self,
        wallet: WalletId,
        page: &PageRequest,
    ) -> Result<PageResponse<TransactionRecord>, StoreError> {
        let query = transactions::Entity::find()
            .filter(transactions::Column::WalletId.eq(wallet.into_inner()))
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id);

        let total = query.clone().count(&self.db).await.map_err(map_db_err)?;
        let rows = query
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        let data = rows
            .into_iter()
            .map(transaction_from_model)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    async fn list_transfers(
        &self,
        wallet: WalletId,
        page: &PageRequest,
    ) -> Result<PageResponse<TransferRecord>, StoreError> {
        let wallet_id = wallet.into_inner();
        let query = transfers::Entity::find()
            .filter(
                transfers::Column::FromWalletId
                    .eq(wallet_id)
                    .or(transfers::Column::ToWalletId.eq(wallet_id)),
            )
            .order_by_desc(transfers::Column::CreatedAt)
            .order_by_desc(transfers::Column::Id);

        let total = query.clone().count(&self.db).await.map_err(map_db_err)?;
        let rows = query
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        let data = rows.into_iter().map(transfer_from_model).collect();
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }
}

/// One ledger unit of work over a database transaction.
///
/// Dropping the unit without committing rolls the transaction back.
pub struct SqlLedgerUnit {
    txn: DatabaseTransaction,
}

#[async_trait]
impl LedgerUnit for SqlLedgerUnit {
    async fn find_or_create_wallet(
        &mut self,
        host: &HostRef,
        slug: &str,
    ) -> Result<WalletRecord, StoreError> {
        let existing = wallets::Entity::find()
            .filter(wallets::Column::HostKind.eq(&host.kind))
            .filter(wallets::Column::HostId.eq(host.id))
            .filter(wallets::Column::Slug.eq(slug))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(map_db_err)?;
        if let Some(model) = existing {
            return Ok(wallet_from_model(model));
        }

        let now = Utc::now().into();
        let model = wallets::ActiveModel {
            id: Set(WalletId::new().into_inner()),
            host_kind: Set(host.kind.clone()),
            host_id: Set(host.id),
            name: Set(format!("{slug} wallet")),
            slug: Set(slug.to_string()),
            balance: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };
        tracing::debug!(host = %host, slug, "creating wallet");
        // A concurrent unit may win the insert race; the unique key turns
        // that into a retryable conflict.
        let model = model.insert(&self.txn).await.map_err(map_db_err)?;
        Ok(wallet_from_model(model))
    }

    async fn fetch_wallet(&mut self, id: WalletId) -> Result<WalletRecord, StoreError> {
        let model = wallets::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(map_db_err)?
            .ok_or(StoreError::WalletNotFound(id))?;
        Ok(wallet_from_model(model))
    }

    async fn fetch_transaction(
        &mut self,
        id: TransactionId,
    ) -> Result<TransactionRecord, StoreError> {
        let model = transactions::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(map_db_err)?
            .ok_or(StoreError::TransactionNotFound(id))?;
        transaction_from_model(model)
    }

    async fn persist_transaction(
        &mut self,
        new: NewTransaction,
    ) -> Result<TransactionRecord, StoreError> {
        let model = transactions::ActiveModel {
            id: Set(TransactionId::new().into_inner()),
            wallet_id: Set(new.wallet_id.into_inner()),
            kind: Set(new.kind.as_str().to_string()),
            amount: Set(new.amount),
            confirmed: Set(new.confirmed),
            meta: Set(new.meta),
            created_at: Set(Utc::now().into()),
        };
        match model.insert(&self.txn).await {
            Ok(model) => transaction_from_model(model),
            Err(err) => {
                if matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_))) {
                    return Err(StoreError::WalletNotFound(new.wallet_id));
                }
                Err(map_db_err(err))
            }
        }
    }

    async fn persist_transfer(&mut self, new: NewTransfer) -> Result<TransferRecord, StoreError> {
        let model = transfers::ActiveModel {
            id: Set(TransferId::new().into_inner()),
            from_wallet_id: Set(new.from_wallet.into_inner()),
            to_wallet_id: Set(new.to_wallet.into_inner()),
            withdraw_id: Set(new.withdraw_id.into_inner()),
            deposit_id: Set(new.deposit_id.into_inner()),
            status: Set(new.status.as_str().to_string()),
            fee: Set(new.fee),
            created_at: Set(Utc::now().into()),
        };
        match model.insert(&self.txn).await {
            Ok(model) => {
                tracing::debug!(
                    transfer = %model.id,
                    from = %model.from_wallet_id,
                    to = %model.to_wallet_id,
                    "transfer persisted"
                );
                Ok(transfer_from_model(model))
            }
            Err(err) => {
                if matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_))) {
                    return Err(StoreError::TransactionNotFound(new.withdraw_id));
                }
                Err(map_db_err(err))
            }
        }
    }

    async fn update_wallet_balance(
        &mut self,
        id: WalletId,
        balance: i64,
    ) -> Result<(), StoreError> {
        let model = wallets::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(map_db_err)?
            .ok_or(StoreError::WalletNotFound(id))?;
        let mut active: wallets::ActiveModel = model.into();
        active.balance = Set(balance);
        active.updated_at = Set(Utc::now().into());
        active.update(&self.txn).await.map_err(map_db_err)?;
        Ok(())
    }

    async fn set_confirmed(
        &mut self,
        id: TransactionId,
    ) -> Result<TransactionRecord, StoreError> {
        let model = transactions::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(map_db_err)?
            .ok_or(StoreError::TransactionNotFound(id))?;
        let mut active: transactions::ActiveModel = model.into();
        active.confirmed = Set(true);
        let model = active.update(&self.txn).await.map_err(map_db_err)?;
        transaction_from_model(model)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().await.map_err(map_db_err)
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.txn.rollback().await.map_err(map_db_err)
    }
}

fn wallet_select(locator: &WalletLocator) -> sea_orm::Select<wallets::Entity> {
    match locator {
        WalletLocator::Id(id) => wallets::Entity::find_by_id(id.into_inner()),
        WalletLocator::Host { host, slug } => wallets::Entity::find()
            .filter(wallets::Column::HostKind.eq(&host.kind))
            .filter(wallets::Column::HostId.eq(host.id))
            .filter(wallets::Column::Slug.eq(slug)),
    }
}

fn wallet_from_model(model: wallets::Model) -> WalletRecord {
    WalletRecord {
        id: WalletId::from_uuid(model.id),
        host: HostRef::new(model.host_kind, model.host_id),
        name: model.name,
        slug: model.slug,
        balance: model.balance,
    }
}

fn transaction_from_model(model: transactions::Model) -> Result<TransactionRecord, StoreError> {
    let kind = model
        .kind
        .parse::<TransactionKind>()
        .map_err(StoreError::Backend)?;
    Ok(TransactionRecord {
        id: TransactionId::from_uuid(model.id),
        wallet_id: WalletId::from_uuid(model.wallet_id),
        kind,
        amount: model.amount,
        confirmed: model.confirmed,
        meta: model.meta,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

fn transfer_from_model(model: transfers::Model) -> TransferRecord {
    TransferRecord {
        id: TransferId::from_uuid(model.id),
        from_wallet: WalletId::from_uuid(model.from_wallet_id),
        to_wallet: WalletId::from_uuid(model.to_wallet_id),
        withdraw_id: TransactionId::from_uuid(model.withdraw_id),
        deposit_id: TransactionId::from_uuid(model.deposit_id),
        status: TransferStatus::from(model.status),
        fee: model.fee,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

/// Classifies database failures; row-lock serialization failures, deadlocks,
/// and unique-key races are retryable conflicts.
fn map_db_err(err: DbErr) -> StoreError {
    if is_conflict(&err) {
        StoreError::Conflict(err.to_string())
    } else {
        StoreError::Backend(err.to_string())
    }
}

fn is_conflict(err: &DbErr) -> bool {
    let (DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
    | DbErr::Exec(RuntimeErr::SqlxError(sqlx_err))
    | DbErr::Conn(RuntimeErr::SqlxError(sqlx_err))) = err
    else {
        return false;
    };
    sqlx_err
        .as_database_error()
        .and_then(sqlx::error::DatabaseError::code)
        // serialization_failure, deadlock_detected, unique_violation
        .is_some_and(|code| matches!(code.as_ref(), "40001" | "40P01" | "23505"))
}
