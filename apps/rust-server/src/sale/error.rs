// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy of the sale engine.
//!
//! Business-rule and validation failures carry enough detail for a useful
//! client message. Ledger failures are split into retryable unavailability and
//! everything else; storage failures are internal and never leak to callers.

use crate::blockchain::LedgerError;
use crate::storage::SaleDbError;

use super::amount::{Amount, AmountError};

#[derive(Debug, thiserror::Error)]
pub enum SaleError {
    #[error("{0}")]
    Validation(String),

    #[error("Sale phase not found: {0}")]
    PhaseNotFound(String),

    #[error("Sale phase {phase_id} is not active")]
    PhaseInactive { phase_id: String },

    #[error("Amount is below the minimum purchase of {minimum}")]
    BelowMinimum { minimum: Amount },

    #[error("Amount exceeds the maximum purchase of {maximum}")]
    AboveMaximum { maximum: Amount },

    #[error("Requested amount {requested} exceeds available supply of {remaining}")]
    InsufficientSupply { requested: Amount, remaining: Amount },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Campaign not found: {0}")]
    CampaignNotFound(String),

    #[error("Campaign {0} has ended")]
    CampaignEnded(String),

    #[error("Transaction rejected by the ledger: {0}")]
    TransactionRejected(String),

    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SaleError {
    /// Stable machine-readable code returned to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            SaleError::Validation(_) => "VALIDATION_ERROR",
            SaleError::PhaseNotFound(_) => "PHASE_NOT_FOUND",
            SaleError::PhaseInactive { .. } => "PHASE_INACTIVE",
            SaleError::BelowMinimum { .. } => "BELOW_MINIMUM",
            SaleError::AboveMaximum { .. } => "ABOVE_MAXIMUM",
            SaleError::InsufficientSupply { .. } => "INSUFFICIENT_SUPPLY",
            SaleError::InvalidAddress(_) => "INVALID_ADDRESS",
            SaleError::CampaignNotFound(_) => "CAMPAIGN_NOT_FOUND",
            SaleError::CampaignEnded(_) => "CAMPAIGN_ENDED",
            SaleError::TransactionRejected(_) => "TRANSACTION_REJECTED",
            SaleError::LedgerUnavailable(_) => "LEDGER_UNAVAILABLE",
            SaleError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SaleError::LedgerUnavailable(_))
    }
}

impl From<AmountError> for SaleError {
    fn from(e: AmountError) -> Self {
        SaleError::Validation(format!("Invalid amount: {e}"))
    }
}

impl From<LedgerError> for SaleError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Unavailable(_) | LedgerError::Timeout { .. } => {
                SaleError::LedgerUnavailable(e.to_string())
            }
            LedgerError::InvalidAddress(msg) => SaleError::InvalidAddress(msg),
            LedgerError::Rejected(msg) => SaleError::TransactionRejected(msg),
            LedgerError::InvalidData(_) | LedgerError::InstructionBuild { .. } => {
                SaleError::Internal(e.to_string())
            }
        }
    }
}

impl From<SaleDbError> for SaleError {
    fn from(e: SaleDbError) -> Self {
        SaleError::Internal(format!("storage: {e}"))
    }
}
