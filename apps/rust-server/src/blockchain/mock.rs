// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process ledger for tests, with fault injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use solana_sdk::account::Account;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use spl_token::solana_program::program_option::COption;
use spl_token::solana_program::program_pack::Pack;

use super::client::{LedgerClient, LedgerError};
use super::types::{LatestBlockhash, LedgerSignatureStatus};

pub struct MockLedger {
    blockhash: Hash,
    last_valid_block_height: u64,
    accounts: Mutex<HashMap<Pubkey, Account>>,
    statuses: Mutex<HashMap<Signature, LedgerSignatureStatus>>,
    /// Statuses only visible to history searches.
    archived: Mutex<HashMap<Signature, LedgerSignatureStatus>>,
    sent: Mutex<Vec<Vec<u8>>>,
    /// Fail every call while set.
    offline: AtomicBool,
    /// Fail this many upcoming calls, then recover.
    failures_left: AtomicU32,
    delay: Mutex<Option<Duration>>,
    reject_sends: Mutex<Option<String>>,
    account_lookups: AtomicUsize,
    status_lookups: AtomicUsize,
    history_lookups: AtomicUsize,
    status_in_flight: AtomicUsize,
    max_status_in_flight: AtomicUsize,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            blockhash: Hash::new_unique(),
            last_valid_block_height: 150,
            accounts: Mutex::new(HashMap::new()),
            statuses: Mutex::new(HashMap::new()),
            archived: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            offline: AtomicBool::new(false),
            failures_left: AtomicU32::new(0),
            delay: Mutex::new(None),
            reject_sends: Mutex::new(None),
            account_lookups: AtomicUsize::new(0),
            status_lookups: AtomicUsize::new(0),
            history_lookups: AtomicUsize::new(0),
            status_in_flight: AtomicUsize::new(0),
            max_status_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn blockhash(&self) -> Hash {
        self.blockhash
    }

    pub fn last_valid_block_height(&self) -> u64 {
        self.last_valid_block_height
    }

    pub fn add_mint(&self, mint: Pubkey, decimals: u8) {
        let state = spl_token::state::Mint {
            mint_authority: COption::None,
            supply: 0,
            decimals,
            is_initialized: true,
            freeze_authority: COption::None,
        };
        let mut data = vec![0u8; spl_token::state::Mint::LEN];
        spl_token::state::Mint::pack(state, &mut data).expect("pack mint");
        self.accounts.lock().unwrap().insert(
            mint,
            Account {
                lamports: 1_461_600,
                data,
                owner: spl_token::id(),
                executable: false,
                rent_epoch: 0,
            },
        );
    }

    pub fn add_account(&self, address: Pubkey) {
        self.accounts.lock().unwrap().insert(
            address,
            Account {
                lamports: 2_039_280,
                data: vec![0u8; spl_token::state::Account::LEN],
                owner: spl_token::id(),
                executable: false,
                rent_epoch: 0,
            },
        );
    }

    pub fn set_signature_status(&self, signature: Signature, status: LedgerSignatureStatus) {
        self.statuses.lock().unwrap().insert(signature, status);
    }

    /// Move a signature out of the recent status cache.
    pub fn archive_signature_status(&self, signature: Signature, status: LedgerSignatureStatus) {
        self.statuses.lock().unwrap().remove(&signature);
        self.archived.lock().unwrap().insert(signature, status);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn fail_next(&self, calls: u32) {
        self.failures_left.store(calls, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn reject_sends(&self, reason: Option<&str>) {
        *self.reject_sends.lock().unwrap() = reason.map(str::to_string);
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    pub fn account_lookups(&self) -> usize {
        self.account_lookups.load(Ordering::SeqCst)
    }

    pub fn status_lookups(&self) -> usize {
        self.status_lookups.load(Ordering::SeqCst)
    }

    pub fn history_lookups(&self) -> usize {
        self.history_lookups.load(Ordering::SeqCst)
    }

    /// Highest number of status lookups seen running at once.
    pub fn max_status_in_flight(&self) -> usize {
        self.max_status_in_flight.load(Ordering::SeqCst)
    }

    async fn gate(&self) -> Result<(), LedgerError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("mock ledger offline".into()));
        }
        let injected = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(LedgerError::Unavailable("injected failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn get_latest_blockhash(&self) -> Result<LatestBlockhash, LedgerError> {
        self.gate().await?;
        Ok(LatestBlockhash {
            blockhash: self.blockhash,
            last_valid_block_height: self.last_valid_block_height,
        })
    }

    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<Account>, LedgerError> {
        self.account_lookups.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
        search_history: bool,
    ) -> Result<Option<LedgerSignatureStatus>, LedgerError> {
        self.status_lookups.fetch_add(1, Ordering::SeqCst);
        if search_history {
            self.history_lookups.fetch_add(1, Ordering::SeqCst);
        }
        let running = self.status_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_status_in_flight.fetch_max(running, Ordering::SeqCst);
        let gated = self.gate().await;
        self.status_in_flight.fetch_sub(1, Ordering::SeqCst);
        gated?;

        if let Some(status) = self.statuses.lock().unwrap().get(signature).cloned() {
            return Ok(Some(status));
        }
        if search_history {
            return Ok(self.archived.lock().unwrap().get(signature).cloned());
        }
        Ok(None)
    }

    async fn send_raw_transaction(&self, wire: &[u8]) -> Result<Signature, LedgerError> {
        self.gate().await?;
        let transaction: VersionedTransaction = bincode::deserialize(wire)
            .map_err(|e| LedgerError::InvalidData(format!("undecodable transaction: {e}")))?;
        if let Some(reason) = self.reject_sends.lock().unwrap().clone() {
            return Err(LedgerError::Rejected(reason));
        }
        self.sent.lock().unwrap().push(wire.to_vec());
        transaction
            .signatures
            .first()
            .copied()
            .ok_or_else(|| LedgerError::Rejected("transaction has no signatures".into()))
    }
}
