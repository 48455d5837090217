// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use solana_sdk::signature::Signature;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::{
    ConfirmationRecord, ConfirmationStatus, TrackingContext, TIMEOUT_REASON,
};
use crate::blockchain::transactions::decode_wire;
use crate::blockchain::{CommitmentLevel, LedgerClient, LedgerSignatureStatus, RetryPolicy};
use crate::sale::error::SaleError;
use crate::storage::SaleDatabase;

/// Counts from one sweep over the non-terminal records.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSummary {
    pub checked: usize,
    pub confirmed: usize,
    pub failed: usize,
    pub errors: usize,
}

/// Ledger lookups a refresh sweep runs at once.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;

/// Tracks submitted signatures through to a terminal status.
#[derive(Clone)]
pub struct ConfirmationTracker {
    db: Arc<SaleDatabase>,
    ledger: Arc<dyn LedgerClient>,
    retry: RetryPolicy,
    timeout: Duration,
    max_in_flight: usize,
}

impl ConfirmationTracker {
    pub fn new(
        db: Arc<SaleDatabase>,
        ledger: Arc<dyn LedgerClient>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            db,
            ledger,
            retry,
            timeout,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// Start tracking `signature`. An existing record is returned unchanged.
    pub fn track(
        &self,
        signature: &str,
        context: Option<TrackingContext>,
    ) -> Result<ConfirmationRecord, SaleError> {
        let signature = parse_signature(signature)?;
        let record = ConfirmationRecord::pending(signature.to_string(), context, Utc::now());
        Ok(self.db.insert_confirmation_if_absent(&record)?)
    }

    /// Current status of `signature`, refreshed from the ledger unless the
    /// record is already terminal.
    ///
    /// Signatures nobody tracks are looked up on the ledger and reported
    /// without being stored.
    pub async fn status(&self, signature: &str) -> Result<ConfirmationRecord, SaleError> {
        let parsed = parse_signature(signature)?;
        let key = parsed.to_string();

        let Some(record) = self.db.get_confirmation(&key)? else {
            let now = Utc::now();
            let mut record = ConfirmationRecord::pending(key, None, now);
            if let Some(observed) = self.observe(&parsed, true).await? {
                let (next, reason) = classify(Some(observed), now, now, self.timeout);
                record.advance(next, reason, now);
            }
            return Ok(record);
        };
        if record.status.is_terminal() {
            return Ok(record);
        }

        // A record past its deadline, or one the ledger already reported, may
        // have aged out of the recent status cache.
        let now = Utc::now();
        let search_history = record.status == ConfirmationStatus::Processing
            || now - record.created_at >= self.timeout;
        let observed = self.observe(&parsed, search_history).await?;

        let now = Utc::now();
        let (next, reason) = classify(observed, record.created_at, now, self.timeout);

        let updated = self
            .db
            .update_confirmation(&key, |r| r.advance(next, reason, now))?
            .unwrap_or(record);

        Ok(updated)
    }

    /// Ask the recent status cache first and fall back to a history search
    /// when allowed.
    async fn observe(
        &self,
        signature: &Signature,
        search_history: bool,
    ) -> Result<Option<LedgerSignatureStatus>, SaleError> {
        let recent = self
            .retry
            .run("get_signature_status", || {
                self.ledger.get_signature_status(signature, false)
            })
            .await?;
        if recent.is_some() || !search_history {
            return Ok(recent);
        }
        Ok(self
            .retry
            .run("get_signature_status_history", || {
                self.ledger.get_signature_status(signature, true)
            })
            .await?)
    }

    /// Relay a client-signed transaction and start tracking it.
    pub async fn submit(
        &self,
        signed_transaction: &str,
        context: Option<TrackingContext>,
    ) -> Result<ConfirmationRecord, SaleError> {
        let wire = decode_wire(signed_transaction)?;
        let signature = self
            .retry
            .run("send_raw_transaction", || self.ledger.send_raw_transaction(&wire))
            .await?;

        info!(%signature, "Transaction relayed to ledger");
        let record = ConfirmationRecord::pending(
            signature.to_string(),
            Some(context.unwrap_or_else(TrackingContext::external)),
            Utc::now(),
        );
        Ok(self.db.insert_confirmation_if_absent(&record)?)
    }

    /// Advance every non-terminal record; signatures are polled concurrently.
    pub async fn refresh_pending(&self) -> Result<RefreshSummary, SaleError> {
        let open: Vec<String> = self
            .db
            .list_confirmations()?
            .into_iter()
            .filter(|r| !r.status.is_terminal())
            .map(|r| r.signature)
            .collect();

        let mut summary = RefreshSummary {
            checked: open.len(),
            ..RefreshSummary::default()
        };
        if open.is_empty() {
            return Ok(summary);
        }

        let permits = Arc::new(Semaphore::new(self.max_in_flight));
        let mut tasks = JoinSet::new();
        for signature in open {
            let permit = permits
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| SaleError::Internal(format!("refresh permits closed: {e}")))?;
            let tracker = self.clone();
            tasks.spawn(async move {
                let result = tracker.status(&signature).await;
                drop(permit);
                (signature, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(record))) => match record.status {
                    ConfirmationStatus::Confirmed => summary.confirmed += 1,
                    ConfirmationStatus::Failed => summary.failed += 1,
                    _ => {}
                },
                Ok((signature, Err(e))) => {
                    summary.errors += 1;
                    warn!(%signature, error = %e, "Confirmation refresh failed");
                }
                Err(e) => {
                    summary.errors += 1;
                    warn!(error = %e, "Confirmation refresh task panicked");
                }
            }
        }

        Ok(summary)
    }

    /// Delete terminal records that have not changed for `older_than`.
    pub fn purge_terminal(&self, older_than: Duration) -> Result<usize, SaleError> {
        Ok(self.db.purge_confirmations(Utc::now() - older_than)?)
    }
}

/// Map a ledger observation onto the status the record should move to.
fn classify(
    observed: Option<LedgerSignatureStatus>,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    timeout: Duration,
) -> (ConfirmationStatus, Option<String>) {
    match observed {
        Some(LedgerSignatureStatus { err: Some(err), .. }) => (ConfirmationStatus::Failed, Some(err)),
        Some(LedgerSignatureStatus {
            level: CommitmentLevel::Finalized,
            ..
        }) => (ConfirmationStatus::Confirmed, None),
        Some(_) => (ConfirmationStatus::Processing, None),
        None if now - created_at >= timeout => {
            (ConfirmationStatus::Failed, Some(TIMEOUT_REASON.to_string()))
        }
        None => (ConfirmationStatus::Pending, None),
    }
}

fn parse_signature(signature: &str) -> Result<Signature, SaleError> {
    Signature::from_str(signature.trim())
        .map_err(|_| SaleError::Validation(format!("Invalid transaction signature: {signature}")))
}
