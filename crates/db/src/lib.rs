//! Database layer with `SeaORM` entities and the SQL-backed ledger store.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for wallets, transactions, and transfers
//! - [`SqlLedgerStore`], the Postgres implementation of the ledger's
//!   storage traits
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod store;

pub use store::{SqlLedgerStore, SqlLedgerUnit};

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tally_shared::DatabaseConfig;

/// Establishes a pooled connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(&config.url);
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections);
    Database::connect(options).await
}
