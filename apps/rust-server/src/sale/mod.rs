// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token sale engine.
//!
//! - `phase` - phase schedule and active-phase resolution
//! - `supply` - remaining supply with reserve / commit / release
//! - `validator` - per-purchase rules
//! - `engine` - purchase orchestration

pub mod amount;
pub mod engine;
pub mod error;
pub mod phase;
pub mod supply;
pub mod validator;

pub use amount::{Amount, AmountError};
pub use engine::{PurchaseReceipt, SaleEngine, SaleOverview};
pub use error::SaleError;
pub use phase::{default_phases, PhaseDefinition, PhaseRegistry, PhaseStatus, SalePhase};
pub use supply::{ReservationGuard, SupplyLedger, SupplySnapshot};
pub use validator::{PurchaseRequest, PurchaseValidator};
