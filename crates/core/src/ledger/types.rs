//! Ledger domain types: wallets, transactions, transfers, and operation
//! batches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tally_shared::{HostRef, TransactionId, TransferId, WalletId};

/// Slug of the wallet a host gets when it does not ask for a named one.
pub const DEFAULT_WALLET_SLUG: &str = "default";

/// Transaction kind: either a deposit (credit) or a withdrawal (debit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Credit entry, positive amount.
    Deposit,
    /// Debit entry, negative amount.
    Withdraw,
}

impl TransactionKind {
    /// Returns the stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "withdraw" => Ok(Self::Withdraw),
            other => Err(format!("Unknown transaction kind: {other}")),
        }
    }
}

/// Status tag on a transfer record.
///
/// Common tags are typed; anything else the caller supplies rides along as
/// `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransferStatus {
    /// Plain value movement between two wallets.
    Transfer,
    /// Value returned to its sender.
    Refund,
    /// Value given without consideration.
    Gift,
    /// Caller-supplied status tag.
    Custom(String),
}

impl TransferStatus {
    /// Returns the string form stored on the transfer row.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Transfer => "transfer",
            Self::Refund => "refund",
            Self::Gift => "gift",
            Self::Custom(tag) => tag,
        }
    }
}

impl Default for TransferStatus {
    fn default() -> Self {
        Self::Transfer
    }
}

impl From<String> for TransferStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "transfer" => Self::Transfer,
            "refund" => Self::Refund,
            "gift" => Self::Gift,
            _ => Self::Custom(s),
        }
    }
}

impl From<TransferStatus> for String {
    fn from(status: TransferStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A wallet: one integer balance owned by one host entity.
///
/// `balance` is the materialized sum of all confirmed transaction amounts
/// belonging to this wallet; the persistence layer is its source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRecord {
    /// The wallet ID.
    pub id: WalletId,
    /// The owning host entity.
    pub host: HostRef,
    /// Display name.
    pub name: String,
    /// Slug, unique per host.
    pub slug: String,
    /// Materialized balance in integer minor units.
    pub balance: i64,
}

/// Immutable record of a single balance-affecting event.
///
/// Never mutated after creation, except the one-way unconfirmed → confirmed
/// transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// The transaction ID.
    pub id: TransactionId,
    /// The wallet this transaction belongs to.
    pub wallet_id: WalletId,
    /// Deposit or withdrawal.
    pub kind: TransactionKind,
    /// Signed amount: positive credits, negative debits.
    pub amount: i64,
    /// Whether the amount counts toward the wallet balance.
    pub confirmed: bool,
    /// Opaque metadata payload.
    pub meta: Option<Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Immutable record linking a withdraw/deposit transaction pair.
///
/// Holds weak references to its two transactions: deleting a transfer must
/// never delete them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// The transfer ID.
    pub id: TransferId,
    /// Source wallet.
    pub from_wallet: WalletId,
    /// Destination wallet.
    pub to_wallet: WalletId,
    /// The withdraw-side transaction.
    pub withdraw_id: TransactionId,
    /// The deposit-side transaction.
    pub deposit_id: TransactionId,
    /// Status tag.
    pub status: TransferStatus,
    /// Fee charged to the sender, in minor units.
    pub fee: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// One proposed operation in a recorder batch.
///
/// Operations carry signed amounts; the facade applies the sign when it
/// builds them from caller-facing magnitudes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Deposit or withdrawal.
    pub kind: TransactionKind,
    /// Signed amount: positive for deposits, negative for withdrawals.
    pub amount: i64,
    /// Whether the amount folds into the balance immediately.
    pub confirmed: bool,
    /// Opaque metadata payload.
    pub meta: Option<Value>,
}

impl Operation {
    /// Builds a confirmed deposit of the given magnitude.
    ///
    /// The magnitude must be non-negative; the recorder rejects negative
    /// amounts regardless.
    #[must_use]
    pub const fn deposit(magnitude: i64) -> Self {
        debug_assert!(magnitude >= 0, "deposit magnitude must be non-negative");
        Self {
            kind: TransactionKind::Deposit,
            amount: magnitude,
            confirmed: true,
            meta: None,
        }
    }

    /// Builds a confirmed withdrawal of the given magnitude.
    ///
    /// The magnitude must be non-negative. Negation saturates so no input
    /// can overflow; an out-of-range magnitude still fails amount
    /// validation downstream.
    #[must_use]
    pub const fn withdraw(magnitude: i64) -> Self {
        debug_assert!(magnitude >= 0, "withdrawal magnitude must be non-negative");
        Self {
            kind: TransactionKind::Withdraw,
            amount: magnitude.saturating_neg(),
            confirmed: true,
            meta: None,
        }
    }

    /// Marks the operation as not yet confirmed.
    #[must_use]
    pub fn unconfirmed(mut self) -> Self {
        self.confirmed = false;
        self
    }

    /// Sets the confirmation flag explicitly.
    #[must_use]
    pub fn confirmed(mut self, confirmed: bool) -> Self {
        self.confirmed = confirmed;
        self
    }

    /// Attaches a metadata payload.
    #[must_use]
    pub fn with_meta(mut self, meta: Option<Value>) -> Self {
        self.meta = meta;
        self
    }
}

/// How to reach a wallet: directly by ID, or through its owning host.
///
/// A wallet entity and an owning entity take distinct, compile-time code
/// paths here; there is no "am I already a wallet" runtime check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletLocator {
    /// The wallet itself.
    Id(WalletId),
    /// A host entity's wallet, resolved (and lazily created) by
    /// `(host, slug)`.
    Host {
        /// The owning host entity.
        host: HostRef,
        /// Wallet slug under that host.
        slug: String,
    },
}

/// Capability of owning (or being) a wallet.
///
/// Implemented by `WalletRecord` itself and by any host-entity reference, so
/// ledger operations accept either interchangeably.
pub trait HasWallet {
    /// Returns the locator for this entity's wallet.
    fn locator(&self) -> WalletLocator;
}

impl HasWallet for WalletRecord {
    fn locator(&self) -> WalletLocator {
        WalletLocator::Id(self.id)
    }
}

impl HasWallet for HostRef {
    fn locator(&self) -> WalletLocator {
        WalletLocator::Host {
            host: self.clone(),
            slug: DEFAULT_WALLET_SLUG.to_string(),
        }
    }
}

impl HasWallet for WalletLocator {
    fn locator(&self) -> WalletLocator {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_operation_signs() {
        assert_eq!(Operation::deposit(100).amount, 100);
        assert_eq!(Operation::withdraw(30).amount, -30);
        assert_eq!(Operation::withdraw(30).kind, TransactionKind::Withdraw);
    }

    #[test]
    fn test_withdraw_extreme_magnitude_saturates() {
        assert_eq!(Operation::withdraw(i64::MAX).amount, -i64::MAX);
        assert_eq!(Operation::withdraw(0).amount, 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "must be non-negative")]
    fn test_withdraw_rejects_negative_magnitude() {
        let _ = Operation::withdraw(i64::MIN);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "must be non-negative")]
    fn test_deposit_rejects_negative_magnitude() {
        let _ = Operation::deposit(-1);
    }

    #[test]
    fn test_operation_builders() {
        let op = Operation::deposit(5).unconfirmed();
        assert!(!op.confirmed);

        let meta = serde_json::json!({"order": 42});
        let op = Operation::deposit(5).with_meta(Some(meta.clone()));
        assert_eq!(op.meta, Some(meta));
    }

    #[test]
    fn test_transaction_kind_roundtrip() {
        assert_eq!(
            "deposit".parse::<TransactionKind>().unwrap(),
            TransactionKind::Deposit
        );
        assert_eq!(
            "withdraw".parse::<TransactionKind>().unwrap(),
            TransactionKind::Withdraw
        );
        assert!("journal".parse::<TransactionKind>().is_err());
    }

    #[test]
    fn test_transfer_status_strings() {
        assert_eq!(TransferStatus::Transfer.as_str(), "transfer");
        assert_eq!(TransferStatus::from(String::from("gift")), TransferStatus::Gift);
        assert_eq!(
            TransferStatus::from(String::from("escrow-release")),
            TransferStatus::Custom("escrow-release".to_string())
        );
        assert_eq!(TransferStatus::default(), TransferStatus::Transfer);
    }

    #[test]
    fn test_host_locator_uses_default_slug() {
        let host = HostRef::new("user", Uuid::now_v7());
        match host.locator() {
            WalletLocator::Host { slug, .. } => assert_eq!(slug, DEFAULT_WALLET_SLUG),
            WalletLocator::Id(_) => panic!("host should locate by (host, slug)"),
        }
    }

    #[test]
    fn test_wallet_locates_by_id() {
        let wallet = WalletRecord {
            id: WalletId::new(),
            host: HostRef::new("user", Uuid::now_v7()),
            name: "Default Wallet".to_string(),
            slug: DEFAULT_WALLET_SLUG.to_string(),
            balance: 0,
        };
        assert_eq!(wallet.locator(), WalletLocator::Id(wallet.id));
    }
}
