// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Associated token account resolution.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;

use super::client::{LedgerClient, LedgerError};
use super::retry::RetryPolicy;
use crate::storage::AccountCache;

const CACHE_CAPACITY: usize = 10_000;
const CACHE_TTL: Duration = Duration::from_secs(600);

/// Maps (mint, owner) pairs to token accounts and checks whether they exist.
#[async_trait]
pub trait AccountResolver: Send + Sync {
    fn resolve(&self, mint: &Pubkey, owner: &Pubkey) -> Pubkey;

    async fn account_exists(&self, address: &Pubkey) -> Result<bool, LedgerError>;
}

/// Resolves associated token accounts and checks them against the ledger.
pub struct AssociatedTokenResolver {
    ledger: Arc<dyn LedgerClient>,
    retry: RetryPolicy,
    cache: AccountCache,
}

impl AssociatedTokenResolver {
    pub fn new(ledger: Arc<dyn LedgerClient>, retry: RetryPolicy) -> Self {
        Self {
            ledger,
            retry,
            cache: AccountCache::new(CACHE_CAPACITY, CACHE_TTL),
        }
    }
}

#[async_trait]
impl AccountResolver for AssociatedTokenResolver {
    fn resolve(&self, mint: &Pubkey, owner: &Pubkey) -> Pubkey {
        get_associated_token_address(owner, mint)
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool, LedgerError> {
        if self.cache.is_known(address) {
            return Ok(true);
        }

        let account = self
            .retry
            .run("get_account_info", || self.ledger.get_account_info(address))
            .await?;

        let exists = account.is_some();
        if exists {
            self.cache.mark_existing(*address);
        }
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::mock::MockLedger;

    fn resolver(ledger: Arc<MockLedger>) -> AssociatedTokenResolver {
        AssociatedTokenResolver::new(
            ledger,
            RetryPolicy {
                max_attempts: 2,
                attempt_timeout: Duration::from_millis(100),
                base_backoff: Duration::from_millis(1),
                max_backoff: Duration::from_millis(1),
            },
        )
    }

    #[test]
    fn resolves_associated_address() {
        let ledger = Arc::new(MockLedger::new());
        let resolver = resolver(ledger);
        let mint = Pubkey::new_unique();
        let owner = Pubkey::new_unique();

        assert_eq!(
            resolver.resolve(&mint, &owner),
            get_associated_token_address(&owner, &mint)
        );
        assert_ne!(resolver.resolve(&mint, &owner), resolver.resolve(&mint, &Pubkey::new_unique()));
    }

    #[tokio::test]
    async fn caches_only_existing_accounts() {
        let ledger = Arc::new(MockLedger::new());
        let resolver = resolver(ledger.clone());
        let present = Pubkey::new_unique();
        let missing = Pubkey::new_unique();
        ledger.add_account(present);

        assert!(resolver.account_exists(&present).await.unwrap());
        assert!(resolver.account_exists(&present).await.unwrap());
        assert_eq!(ledger.account_lookups(), 1);

        assert!(!resolver.account_exists(&missing).await.unwrap());
        assert!(!resolver.account_exists(&missing).await.unwrap());
        assert_eq!(ledger.account_lookups(), 3);

        // A missing account that appears later is picked up
        ledger.add_account(missing);
        assert!(resolver.account_exists(&missing).await.unwrap());
    }

    #[tokio::test]
    async fn retries_transient_lookups() {
        let ledger = Arc::new(MockLedger::new());
        let resolver = resolver(ledger.clone());
        let address = Pubkey::new_unique();
        ledger.add_account(address);
        ledger.fail_next(1);

        assert!(resolver.account_exists(&address).await.unwrap());
        assert_eq!(ledger.account_lookups(), 2);
    }

    #[tokio::test]
    async fn surfaces_outages() {
        let ledger = Arc::new(MockLedger::new());
        let resolver = resolver(ledger.clone());
        ledger.set_offline(true);

        let err = resolver.account_exists(&Pubkey::new_unique()).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
