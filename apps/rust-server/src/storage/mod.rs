// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Durable state lives in a single redb file under `DATA_DIR`:
//!
//! ```text
//! $DATA_DIR/
//!   sale.redb    # supply counters, reservations, confirmations, campaigns
//! ```
//!
//! Short-lived lookups that only save ledger round-trips are kept in memory
//! ([`AccountCache`]).

pub mod account_cache;
pub mod sale_database;

pub use account_cache::AccountCache;
pub use sale_database::{
    ReserveOutcome, SaleDatabase, SaleDbError, SaleDbResult, StoredReservation, SupplyRow,
};

/// File name of the sale database inside the data directory.
pub const DATABASE_FILE: &str = "sale.redb";
