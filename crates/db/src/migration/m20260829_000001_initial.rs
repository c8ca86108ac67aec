//! Initial database migration.
//!
//! Creates the wallets, transactions, and transfers tables with the
//! constraints the ledger engine relies on: one wallet per
//! `(host_kind, host_id, slug)`, non-negative materialized balances, and
//! restrict-only foreign keys so a transfer can never cascade away the
//! transactions it links.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(WALLETS_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;
        db.execute_unprepared(TRANSFERS_SQL).await?;
        db.execute_unprepared(INDEXES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared("DROP TABLE IF EXISTS transfers").await?;
        db.execute_unprepared("DROP TABLE IF EXISTS transactions")
            .await?;
        db.execute_unprepared("DROP TABLE IF EXISTS wallets").await?;

        Ok(())
    }
}

const WALLETS_SQL: &str = r"
CREATE TABLE wallets (
    id UUID PRIMARY KEY,
    host_kind VARCHAR(64) NOT NULL,
    host_id UUID NOT NULL,
    name VARCHAR(255) NOT NULL,
    slug VARCHAR(64) NOT NULL,
    balance BIGINT NOT NULL DEFAULT 0 CHECK (balance >= 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_wallets_host_slug UNIQUE (host_kind, host_id, slug)
);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    wallet_id UUID NOT NULL REFERENCES wallets(id) ON DELETE RESTRICT,
    kind VARCHAR(16) NOT NULL CHECK (kind IN ('deposit', 'withdraw')),
    amount BIGINT NOT NULL,
    confirmed BOOLEAN NOT NULL DEFAULT TRUE,
    meta JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const TRANSFERS_SQL: &str = r"
CREATE TABLE transfers (
    id UUID PRIMARY KEY,
    from_wallet_id UUID NOT NULL REFERENCES wallets(id) ON DELETE RESTRICT,
    to_wallet_id UUID NOT NULL REFERENCES wallets(id) ON DELETE RESTRICT,
    withdraw_id UUID NOT NULL REFERENCES transactions(id) ON DELETE RESTRICT,
    deposit_id UUID NOT NULL REFERENCES transactions(id) ON DELETE RESTRICT,
    status VARCHAR(64) NOT NULL DEFAULT 'transfer',
    fee BIGINT NOT NULL DEFAULT 0 CHECK (fee >= 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const INDEXES_SQL: &str = r"
CREATE INDEX idx_transactions_wallet_created
    ON transactions (wallet_id, created_at DESC);
CREATE INDEX idx_transfers_from_wallet ON transfers (from_wallet_id);
CREATE INDEX idx_transfers_to_wallet ON transfers (to_wallet_id);
";
