//! Per-wallet balance caching using Moka.
//!
//! The cache avoids redundant storage reads when the same in-memory host
//! object is consulted repeatedly within one process. It is an explicit
//! object with an injected lifetime, not a global: the persisted balance
//! remains the sole source of truth, and a deployment running several
//! processes must never trust another process's cached value.
//!
//! Publication after commit is ordered. A writer takes a [`WriteStamp`]
//! while its unit of work still holds the wallet's lock, so stamps on one
//! wallet are issued in commit order even when the post-commit cache writes
//! race each other; an update carrying an older stamp than the cached entry
//! is dropped instead of clobbering the newer balance.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use moka::ops::compute::Op;
use moka::sync::Cache;
use tally_shared::WalletId;

/// Default maximum number of wallet balances kept in memory.
const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Ordering token for one mutation about to commit.
///
/// Must be taken before `commit`, while the unit still holds the locks on
/// the wallets it touched; two units that conflict on a wallet then carry
/// stamps in their commit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WriteStamp(u64);

#[derive(Debug, Clone, Copy)]
struct Versioned {
    stamp: u64,
    balance: i64,
}

/// In-process, write-through cache of wallet balances.
///
/// Entries never expire; they are evicted by capacity or invalidated when a
/// unit of work fails after touching storage out of band.
#[derive(Clone)]
pub struct BalanceCache {
    cache: Cache<WalletId, Versioned>,
    seq: Arc<AtomicU64>,
}

impl BalanceCache {
    /// Creates a cache with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Creates a cache bounded to `capacity` wallets.
    #[must_use]
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(capacity).build(),
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Issues the ordering stamp for a mutation about to commit.
    #[must_use]
    pub fn stamp(&self) -> WriteStamp {
        WriteStamp(self.seq.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Returns the cached balance, seeding from `persisted` on first access.
    ///
    /// Seeds never overwrite an existing entry, so a stale persisted read
    /// cannot clobber a balance a writer has already published.
    #[must_use]
    pub fn get_or_seed(&self, wallet: WalletId, persisted: i64) -> i64 {
        self.cache
            .entry(wallet)
            .or_insert_with(|| Versioned {
                stamp: 0,
                balance: persisted,
            })
            .into_value()
            .balance
    }

    /// Returns the cached balance without seeding.
    #[must_use]
    pub fn get(&self, wallet: WalletId) -> Option<i64> {
        self.cache.get(&wallet).map(|entry| entry.balance)
    }

    /// Write-through update after a committed mutation.
    ///
    /// Ignored when the cached entry carries a newer stamp: a slow writer
    /// that committed earlier must not overwrite a later committed balance.
    /// Within one unit (equal stamps) the last write wins, so a
    /// self-transfer ends on its deposit-side balance.
    pub fn update(&self, stamp: WriteStamp, wallet: WalletId, balance: i64) {
        let _ = self
            .cache
            .entry(wallet)
            .and_compute_with(|current| match current {
                Some(entry) if entry.value().stamp > stamp.0 => Op::Nop,
                _ => Op::Put(Versioned {
                    stamp: stamp.0,
                    balance,
                }),
            });
    }

    /// Drops the cached balance for one wallet.
    pub fn invalidate(&self, wallet: WalletId) {
        self.cache.invalidate(&wallet);
    }

    /// Drops every cached balance.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Returns the number of wallets currently cached.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl Default for BalanceCache {
    fn default() -> Self {
        Self::new()
    }
}
