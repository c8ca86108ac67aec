//! Shared domain vocabulary.

pub mod host;
pub mod id;
pub mod pagination;

pub use host::HostRef;
pub use id::{TransactionId, TransferId, WalletId};
pub use pagination::{PageMeta, PageRequest, PageResponse};
