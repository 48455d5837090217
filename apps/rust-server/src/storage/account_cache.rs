// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for token account existence checks.
//!
//! Only positive results are stored: once an account exists on the ledger it
//! is not expected to disappear within the TTL, whereas a missing account may
//! be created at any moment by another transaction.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use solana_sdk::pubkey::Pubkey;

/// In-process LRU set of accounts known to exist.
pub struct AccountCache {
    cache: Mutex<LruCache<Pubkey, Instant>>,
    ttl: Duration,
}

impl AccountCache {
    /// Create a new cache with the given capacity and TTL.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
        }
    }

    /// Whether `address` was recently observed to exist.
    pub fn is_known(&self, address: &Pubkey) -> bool {
        let Ok(mut cache) = self.cache.lock() else {
            return false;
        };
        match cache.get(address) {
            Some(inserted_at) if inserted_at.elapsed() < self.ttl => true,
            Some(_) => {
                cache.pop(address);
                false
            }
            None => false,
        }
    }

    /// Record that `address` exists.
    pub fn mark_existing(&self, address: Pubkey) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(address, Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remembers_existing_accounts() {
        let cache = AccountCache::new(10, Duration::from_secs(300));
        let address = Pubkey::new_unique();

        assert!(!cache.is_known(&address));
        cache.mark_existing(address);
        assert!(cache.is_known(&address));
    }

    #[test]
    fn entries_expire() {
        let cache = AccountCache::new(10, Duration::from_millis(1));
        let address = Pubkey::new_unique();
        cache.mark_existing(address);

        std::thread::sleep(Duration::from_millis(5));

        assert!(!cache.is_known(&address));
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = AccountCache::new(1, Duration::from_secs(300));
        let first = Pubkey::new_unique();
        let second = Pubkey::new_unique();

        cache.mark_existing(first);
        cache.mark_existing(second);

        assert!(!cache.is_known(&first));
        assert!(cache.is_known(&second));
    }
}
