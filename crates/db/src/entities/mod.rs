//! `SeaORM` entity definitions.

pub mod transactions;
pub mod transfers;
pub mod wallets;
