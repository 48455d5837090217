// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Confirmation Tracking
//!
//! Submitted transactions are tracked by signature until the ledger reports
//! a terminal outcome.
//!
//! ## Lifecycle
//!
//! ```text
//! pending ──► processing ──► confirmed
//!    │             │
//!    └─────────────┴───────► failed
//! ```
//!
//! `confirmed` and `failed` are terminal. A record never moves backwards,
//! and a record that never shows up on the ledger fails with reason
//! `timeout` once the confirmation timeout has passed since it was created.

pub mod poller;
pub mod tracker;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::sale::amount::Amount;

pub use poller::ConfirmationPoller;
pub use tracker::{ConfirmationTracker, RefreshSummary};

/// Failure reason recorded when a signature never appears on the ledger.
pub const TIMEOUT_REASON: &str = "timeout";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationStatus {
    Pending,
    Processing,
    Confirmed,
    Failed,
}

impl ConfirmationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ConfirmationStatus::Confirmed | ConfirmationStatus::Failed)
    }

    /// Whether moving from `self` to `next` is a forward transition.
    pub fn can_advance_to(self, next: ConfirmationStatus) -> bool {
        use ConfirmationStatus::*;
        matches!(
            (self, next),
            (Pending, Processing) | (Pending, Confirmed) | (Pending, Failed)
                | (Processing, Confirmed)
                | (Processing, Failed)
        )
    }
}

/// What a tracked transaction was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Purchase,
    Contribution,
    Payment,
    Transfer,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackingContext {
    pub kind: TransactionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub amount: Option<Amount>,
}

impl TrackingContext {
    pub fn external() -> Self {
        Self {
            kind: TransactionKind::External,
            phase_id: None,
            amount: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRecord {
    pub signature: String,
    pub status: ConfirmationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<TrackingContext>,
}

impl ConfirmationRecord {
    pub fn pending(signature: String, context: Option<TrackingContext>, now: DateTime<Utc>) -> Self {
        Self {
            signature,
            status: ConfirmationStatus::Pending,
            failure_reason: None,
            created_at: now,
            updated_at: now,
            context,
        }
    }

    /// Apply an observed status if it moves the record forward.
    ///
    /// Returns whether the record changed.
    pub fn advance(
        &mut self,
        next: ConfirmationStatus,
        failure_reason: Option<String>,
        now: DateTime<Utc>,
    ) -> bool {
        if !self.status.can_advance_to(next) {
            return false;
        }
        self.status = next;
        self.failure_reason = failure_reason;
        self.updated_at = now;
        true
    }
}
