//! Opaque references to wallet-owning host entities.
//!
//! The ledger never looks inside a host entity; it only needs a stable key
//! to associate wallets with their owner. Any domain object (a user, an
//! organization, a bot) becomes a host by producing a `HostRef`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference to the entity that owns a wallet.
///
/// The `kind` discriminates host types sharing an ID space (e.g. `"user"`
/// and `"organization"`), so two different entities with the same UUID never
/// collide on wallet ownership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostRef {
    /// Host type discriminator (e.g. "user").
    pub kind: String,
    /// The host entity's ID.
    pub id: Uuid,
}

impl HostRef {
    /// Creates a new host reference.
    pub fn new(kind: impl Into<String>, id: Uuid) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }
}

impl std::fmt::Display for HostRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
