// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded sale database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `phase_supply`: phase_id → serialized [`SupplyRow`]
//! - `reservations`: reservation_id → serialized [`StoredReservation`]
//! - `confirmations`: signature → serialized [`ConfirmationRecord`]
//! - `campaigns`: campaign_id → serialized [`Campaign`]
//!
//! redb serializes write transactions, so every read-modify-write below is
//! atomic with respect to concurrent callers.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::confirmation::ConfirmationRecord;
use crate::crowdfunding::Campaign;
use crate::sale::amount::Amount;

// =============================================================================
// Table Definitions
// =============================================================================

const PHASE_SUPPLY: TableDefinition<&str, &[u8]> = TableDefinition::new("phase_supply");

const RESERVATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("reservations");

const CONFIRMATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("confirmations");

const CAMPAIGNS: TableDefinition<&str, &[u8]> = TableDefinition::new("campaigns");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SaleDbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("supply counter missing for phase {0}")]
    MissingSupply(String),
}

pub type SaleDbResult<T> = Result<T, SaleDbError>;

// =============================================================================
// Stored Records
// =============================================================================

/// Persisted supply counter of a single phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyRow {
    pub total: Amount,
    pub remaining: Amount,
}

/// Supply held for a purchase whose transaction is still being built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredReservation {
    pub id: Uuid,
    pub phase_id: String,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

/// Result of an atomic check-and-decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    Reserved,
    Insufficient { remaining: Amount },
    UnknownPhase,
}

// =============================================================================
// SaleDatabase
// =============================================================================

/// Embedded ACID store for supply counters, reservations, confirmation
/// records and crowdfunding campaigns.
pub struct SaleDatabase {
    db: Database,
}

impl SaleDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> SaleDbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PHASE_SUPPLY)?;
            let _ = write_txn.open_table(RESERVATIONS)?;
            let _ = write_txn.open_table(CONFIRMATIONS)?;
            let _ = write_txn.open_table(CAMPAIGNS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Cheap liveness probe: a read transaction can be opened.
    pub fn check(&self) -> SaleDbResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(PHASE_SUPPLY)?;
        Ok(())
    }

    // =========================================================================
    // Phase supply
    // =========================================================================

    /// Make sure a supply counter exists for `phase_id`.
    ///
    /// New phases start fully available. Existing counters are kept, with
    /// `remaining` clamped to the configured total.
    pub fn seed_phase(&self, phase_id: &str, total: Amount) -> SaleDbResult<SupplyRow> {
        let write_txn = self.db.begin_write()?;
        let row = {
            let mut table = write_txn.open_table(PHASE_SUPPLY)?;
            let existing = table
                .get(phase_id)?
                .map(|value| value.value().to_vec());

            let row = match existing {
                Some(bytes) => {
                    let current: SupplyRow = serde_json::from_slice(&bytes)?;
                    SupplyRow {
                        total,
                        remaining: current.remaining.min(total),
                    }
                }
                None => SupplyRow {
                    total,
                    remaining: total,
                },
            };

            let json = serde_json::to_vec(&row)?;
            table.insert(phase_id, json.as_slice())?;
            row
        };
        write_txn.commit()?;
        Ok(row)
    }

    pub fn supply(&self, phase_id: &str) -> SaleDbResult<Option<SupplyRow>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PHASE_SUPPLY)?;
        match table.get(phase_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Atomically check remaining supply and, if sufficient, decrement it and
    /// persist the reservation in the same write transaction.
    pub fn reserve(&self, reservation: &StoredReservation) -> SaleDbResult<ReserveOutcome> {
        let write_txn = self.db.begin_write()?;
        {
            let mut supply = write_txn.open_table(PHASE_SUPPLY)?;
            let existing = supply
                .get(reservation.phase_id.as_str())?
                .map(|value| value.value().to_vec());

            let Some(bytes) = existing else {
                return Ok(ReserveOutcome::UnknownPhase);
            };
            let mut row: SupplyRow = serde_json::from_slice(&bytes)?;

            let Some(remaining) = row.remaining.checked_sub(reservation.amount) else {
                return Ok(ReserveOutcome::Insufficient {
                    remaining: row.remaining,
                });
            };
            row.remaining = remaining;

            let json = serde_json::to_vec(&row)?;
            supply.insert(reservation.phase_id.as_str(), json.as_slice())?;

            let mut reservations = write_txn.open_table(RESERVATIONS)?;
            let id = reservation.id.to_string();
            let json = serde_json::to_vec(reservation)?;
            reservations.insert(id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(ReserveOutcome::Reserved)
    }

    /// Drop the reservation record, leaving the supply decremented.
    ///
    /// Returns `false` if the reservation no longer exists.
    pub fn commit_reservation(&self, id: Uuid) -> SaleDbResult<bool> {
        let key = id.to_string();
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(RESERVATIONS)?;
            let removed = table.remove(key.as_str())?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Drop the reservation record and give its amount back to the phase,
    /// never exceeding the phase total.
    ///
    /// Returns `false` (and changes nothing) if the reservation no longer
    /// exists, so releasing twice is harmless.
    pub fn release_reservation(&self, id: Uuid) -> SaleDbResult<bool> {
        let key = id.to_string();
        let write_txn = self.db.begin_write()?;
        {
            let mut reservations = write_txn.open_table(RESERVATIONS)?;
            let removed = reservations
                .remove(key.as_str())?
                .map(|value| value.value().to_vec());

            let Some(bytes) = removed else {
                return Ok(false);
            };
            let reservation: StoredReservation = serde_json::from_slice(&bytes)?;

            let mut supply = write_txn.open_table(PHASE_SUPPLY)?;
            let existing = supply
                .get(reservation.phase_id.as_str())?
                .map(|value| value.value().to_vec())
                .ok_or_else(|| SaleDbError::MissingSupply(reservation.phase_id.clone()))?;
            let mut row: SupplyRow = serde_json::from_slice(&existing)?;

            row.remaining = row
                .remaining
                .checked_add(reservation.amount)
                .unwrap_or(row.total)
                .min(row.total);

            let json = serde_json::to_vec(&row)?;
            supply.insert(reservation.phase_id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(true)
    }

    pub fn list_reservations(&self) -> SaleDbResult<Vec<StoredReservation>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RESERVATIONS)?;
        let mut out = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            out.push(serde_json::from_slice(value.value())?);
        }
        Ok(out)
    }

    // =========================================================================
    // Confirmation records
    // =========================================================================

    /// Insert `record` unless one already exists for its signature.
    ///
    /// Returns whichever record is stored after the call.
    pub fn insert_confirmation_if_absent(
        &self,
        record: &ConfirmationRecord,
    ) -> SaleDbResult<ConfirmationRecord> {
        let write_txn = self.db.begin_write()?;
        let stored = {
            let mut table = write_txn.open_table(CONFIRMATIONS)?;
            let existing = table
                .get(record.signature.as_str())?
                .map(|value| value.value().to_vec());

            match existing {
                Some(bytes) => serde_json::from_slice(&bytes)?,
                None => {
                    let json = serde_json::to_vec(record)?;
                    table.insert(record.signature.as_str(), json.as_slice())?;
                    record.clone()
                }
            }
        };
        write_txn.commit()?;
        Ok(stored)
    }

    pub fn get_confirmation(&self, signature: &str) -> SaleDbResult<Option<ConfirmationRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CONFIRMATIONS)?;
        match table.get(signature)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Read-modify-write a confirmation record in one write transaction.
    ///
    /// `apply` mutates the record and returns whether it changed; unchanged
    /// records are not rewritten. Returns `None` for unknown signatures.
    pub fn update_confirmation<F>(
        &self,
        signature: &str,
        apply: F,
    ) -> SaleDbResult<Option<ConfirmationRecord>>
    where
        F: FnOnce(&mut ConfirmationRecord) -> bool,
    {
        let write_txn = self.db.begin_write()?;
        let record = {
            let mut table = write_txn.open_table(CONFIRMATIONS)?;
            let existing = table.get(signature)?.map(|value| value.value().to_vec());

            let Some(bytes) = existing else {
                return Ok(None);
            };
            let mut record: ConfirmationRecord = serde_json::from_slice(&bytes)?;

            if apply(&mut record) {
                let json = serde_json::to_vec(&record)?;
                table.insert(signature, json.as_slice())?;
            }
            record
        };
        write_txn.commit()?;
        Ok(Some(record))
    }

    pub fn list_confirmations(&self) -> SaleDbResult<Vec<ConfirmationRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CONFIRMATIONS)?;
        let mut out = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            out.push(serde_json::from_slice(value.value())?);
        }
        Ok(out)
    }

    /// Delete terminal records last updated before `cutoff`.
    pub fn purge_confirmations(&self, cutoff: DateTime<Utc>) -> SaleDbResult<usize> {
        let write_txn = self.db.begin_write()?;
        let purged = {
            let mut table = write_txn.open_table(CONFIRMATIONS)?;
            let mut expired = Vec::new();
            for entry in table.iter()? {
                let (key, value) = entry?;
                let record: ConfirmationRecord = serde_json::from_slice(value.value())?;
                if record.status.is_terminal() && record.updated_at < cutoff {
                    expired.push(key.value().to_string());
                }
            }
            for signature in &expired {
                table.remove(signature.as_str())?;
            }
            expired.len()
        };
        write_txn.commit()?;
        Ok(purged)
    }

    // =========================================================================
    // Campaigns
    // =========================================================================

    pub fn insert_campaign(&self, campaign: &Campaign) -> SaleDbResult<()> {
        let json = serde_json::to_vec(campaign)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CAMPAIGNS)?;
            table.insert(campaign.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_campaign(&self, id: &str) -> SaleDbResult<Option<Campaign>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CAMPAIGNS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All campaigns, oldest first.
    pub fn list_campaigns(&self) -> SaleDbResult<Vec<Campaign>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CAMPAIGNS)?;
        let mut out: Vec<Campaign> = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            out.push(serde_json::from_slice(value.value())?);
        }
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    /// Add `amount` to the campaign's raised total.
    pub fn add_to_raised(&self, id: &str, amount: Amount) -> SaleDbResult<Option<Campaign>> {
        let write_txn = self.db.begin_write()?;
        let campaign = {
            let mut table = write_txn.open_table(CAMPAIGNS)?;
            let existing = table.get(id)?.map(|value| value.value().to_vec());

            let Some(bytes) = existing else {
                return Ok(None);
            };
            let mut campaign: Campaign = serde_json::from_slice(&bytes)?;
            campaign.raised = campaign.raised.checked_add(amount).unwrap_or(campaign.raised);

            let json = serde_json::to_vec(&campaign)?;
            table.insert(id, json.as_slice())?;
            campaign
        };
        write_txn.commit()?;
        Ok(Some(campaign))
    }
}

// =============================================================================
// Tests
// =============================================================================
