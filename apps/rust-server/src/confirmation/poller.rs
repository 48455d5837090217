// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Confirmation Poller
//!
//! Background task that advances tracked transactions even when no client
//! is polling `GET /transactions/{signature}`.
//!
//! ## Strategy
//!
//! Every `poll_interval` the poller:
//! 1. Refreshes all non-terminal confirmation records against the ledger
//!    (signatures are checked concurrently).
//! 2. Deletes terminal records older than the retention period.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown; the
//! same token stops the HTTP server.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::tracker::ConfirmationTracker;

pub struct ConfirmationPoller {
    tracker: ConfirmationTracker,
    poll_interval: Duration,
    retention: chrono::Duration,
}

impl ConfirmationPoller {
    pub fn new(
        tracker: ConfirmationTracker,
        poll_interval: Duration,
        retention: chrono::Duration,
    ) -> Self {
        Self {
            tracker,
            poll_interval,
            retention,
        }
    }

    /// Run the poller loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(poller.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            retention_secs = self.retention.num_seconds(),
            "Confirmation poller starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Confirmation poller shutting down");
                return;
            }

            self.poll_step().await;

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Confirmation poller shutting down");
                    return;
                }
            }
        }
    }

    /// One sweep: refresh open records, then purge expired terminal ones.
    async fn poll_step(&self) {
        match self.tracker.refresh_pending().await {
            Ok(summary) if summary.checked > 0 => {
                info!(
                    checked = summary.checked,
                    confirmed = summary.confirmed,
                    failed = summary.failed,
                    errors = summary.errors,
                    "Confirmation poller: refreshed open transactions"
                );
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Confirmation poller: refresh failed"),
        }

        match self.tracker.purge_terminal(self.retention) {
            Ok(0) => {}
            Ok(purged) => debug!(purged, "Confirmation poller: purged settled records"),
            Err(e) => warn!(error = %e, "Confirmation poller: purge failed"),
        }
    }
}
