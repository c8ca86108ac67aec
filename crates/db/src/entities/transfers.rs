//! `SeaORM` Entity for transfers table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transfers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub from_wallet_id: Uuid,
    pub to_wallet_id: Uuid,
    pub withdraw_id: Uuid,
    pub deposit_id: Uuid,
    pub status: String,
    pub fee: i64,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::FromWalletId",
        to = "super::wallets::Column::Id"
    )]
    FromWallet,
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::ToWalletId",
        to = "super::wallets::Column::Id"
    )]
    ToWallet,
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::WithdrawId",
        to = "super::transactions::Column::Id"
    )]
    WithdrawTransaction,
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::DepositId",
        to = "super::transactions::Column::Id"
    )]
    DepositTransaction,
}

impl ActiveModelBehavior for ActiveModel {}
