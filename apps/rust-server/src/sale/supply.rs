// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Remaining-supply accounting per sale phase.
//!
//! [`SupplyLedger`] is the only writer of phase supply. A purchase takes a
//! [`ReservationGuard`] before any ledger I/O and either commits it once the
//! transaction is built or lets it go, which hands the amount back. The
//! reservation is persisted together with the decrement, so a crash between
//! the two leaves a record that [`SupplyLedger::recover_stale_reservations`]
//! compensates on the next start.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::amount::Amount;
use super::error::SaleError;
use super::phase::PhaseDefinition;
use crate::storage::{ReserveOutcome, SaleDatabase, SaleDbResult, StoredReservation};

/// Point-in-time supply of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupplySnapshot {
    pub total: Amount,
    pub remaining: Amount,
}

#[derive(Clone)]
pub struct SupplyLedger {
    db: Arc<SaleDatabase>,
}

impl SupplyLedger {
    pub fn new(db: Arc<SaleDatabase>) -> Self {
        Self { db }
    }

    /// Create counters for new phases and reconcile existing ones with the
    /// configured totals.
    pub fn seed(&self, definitions: &[PhaseDefinition]) -> Result<(), SaleError> {
        for phase in definitions {
            let row = self.db.seed_phase(&phase.id, phase.total_supply)?;
            tracing::info!(
                phase_id = %phase.id,
                total = %row.total,
                remaining = %row.remaining,
                "Sale phase supply ready"
            );
        }
        Ok(())
    }

    pub fn snapshot(&self, phase_id: &str) -> Result<SupplySnapshot, SaleError> {
        let row = self
            .db
            .supply(phase_id)?
            .ok_or_else(|| SaleError::PhaseNotFound(phase_id.to_string()))?;
        Ok(SupplySnapshot {
            total: row.total,
            remaining: row.remaining,
        })
    }

    /// Counters for every configured phase, in schedule order.
    pub fn snapshots(
        &self,
        definitions: &[PhaseDefinition],
    ) -> Result<Vec<(String, SupplySnapshot)>, SaleError> {
        definitions
            .iter()
            .map(|phase| Ok((phase.id.clone(), self.snapshot(&phase.id)?)))
            .collect()
    }

    /// Atomically take `amount` out of the phase's remaining supply.
    pub fn reserve(&self, phase_id: &str, amount: Amount) -> Result<ReservationGuard, SaleError> {
        if amount.is_zero() {
            return Err(SaleError::Validation("Amount must be positive".to_string()));
        }

        let reservation = StoredReservation {
            id: Uuid::new_v4(),
            phase_id: phase_id.to_string(),
            amount,
            created_at: Utc::now(),
        };

        match self.db.reserve(&reservation)? {
            ReserveOutcome::Reserved => {
                tracing::debug!(
                    reservation_id = %reservation.id,
                    phase_id,
                    %amount,
                    "Supply reserved"
                );
                Ok(ReservationGuard {
                    db: self.db.clone(),
                    id: reservation.id,
                    phase_id: reservation.phase_id,
                    amount,
                    settled: false,
                })
            }
            ReserveOutcome::Insufficient { remaining } => Err(SaleError::InsufficientSupply {
                requested: amount,
                remaining,
            }),
            ReserveOutcome::UnknownPhase => Err(SaleError::PhaseNotFound(phase_id.to_string())),
        }
    }

    /// Release every reservation left behind by an interrupted process.
    ///
    /// Must run before requests are accepted; live reservations are never
    /// older than a single request.
    pub fn recover_stale_reservations(&self) -> Result<usize, SaleError> {
        let stale = self.db.list_reservations()?;
        let mut released = 0;
        for reservation in stale {
            if self.db.release_reservation(reservation.id)? {
                released += 1;
                tracing::warn!(
                    reservation_id = %reservation.id,
                    phase_id = %reservation.phase_id,
                    amount = %reservation.amount,
                    created_at = %reservation.created_at,
                    "Released stale supply reservation"
                );
            }
        }
        Ok(released)
    }
}

/// Supply held for one in-flight purchase.
///
/// Dropping the guard without calling [`ReservationGuard::commit`] releases
/// the reservation.
#[must_use = "dropping a reservation releases it"]
pub struct ReservationGuard {
    db: Arc<SaleDatabase>,
    id: Uuid,
    phase_id: String,
    amount: Amount,
    settled: bool,
}

impl ReservationGuard {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase_id(&self) -> &str {
        &self.phase_id
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Keep the supply decremented.
    ///
    /// If the write fails the guard stays unsettled and releases on drop.
    pub fn commit(mut self) -> Result<(), SaleError> {
        let outcome = self.db.commit_reservation(self.id);
        self.settle(outcome)?;
        tracing::debug!(reservation_id = %self.id, "Supply reservation committed");
        Ok(())
    }

    /// Give the reserved amount back to the phase.
    pub fn release(mut self) -> Result<(), SaleError> {
        let outcome = self.db.release_reservation(self.id);
        self.settle(outcome)?;
        tracing::debug!(reservation_id = %self.id, "Supply reservation released");
        Ok(())
    }

    fn settle(&mut self, outcome: SaleDbResult<bool>) -> Result<bool, SaleError> {
        let done = outcome?;
        self.settled = true;
        Ok(done)
    }
}

impl Drop for ReservationGuard {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        match self.db.release_reservation(self.id) {
            Ok(_) => tracing::debug!(
                reservation_id = %self.id,
                phase_id = %self.phase_id,
                "Unsettled supply reservation released"
            ),
            Err(e) => tracing::error!(
                reservation_id = %self.id,
                phase_id = %self.phase_id,
                error = %e,
                "Failed to release supply reservation; it will be recovered on restart"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sale::phase::default_phases;

    fn ledger_with(phase_id: &str, total: u64) -> (SupplyLedger, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(SaleDatabase::open(&dir.path().join("sale.redb")).unwrap());
        db.seed_phase(phase_id, Amount::from_whole(total)).unwrap();
        (SupplyLedger::new(db), dir)
    }

    #[test]
    fn seed_creates_counters_for_every_phase() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(SaleDatabase::open(&dir.path().join("sale.redb")).unwrap());
        let ledger = SupplyLedger::new(db);
        let phases = default_phases();
        ledger.seed(&phases).unwrap();

        for phase in &phases {
            let snapshot = ledger.snapshot(&phase.id).unwrap();
            assert_eq!(snapshot.remaining, phase.total_supply);
        }
        let all = ledger.snapshots(&phases).unwrap();
        assert_eq!(all.len(), phases.len());
        assert_eq!(all[0].0, phases[0].id);
        assert_eq!(all[0].1.total, phases[0].total_supply);
        assert!(matches!(
            ledger.snapshot("unknown"),
            Err(SaleError::PhaseNotFound(_))
        ));
    }

    #[test]
    fn commit_keeps_supply_and_release_restores_it() {
        let (ledger, _dir) = ledger_with("pre-sale", 1000);

        let guard = ledger.reserve("pre-sale", Amount::from_whole(400)).unwrap();
        assert_eq!(ledger.snapshot("pre-sale").unwrap().remaining, Amount::from_whole(600));
        guard.commit().unwrap();
        assert_eq!(ledger.snapshot("pre-sale").unwrap().remaining, Amount::from_whole(600));

        let guard = ledger.reserve("pre-sale", Amount::from_whole(100)).unwrap();
        guard.release().unwrap();
        assert_eq!(ledger.snapshot("pre-sale").unwrap().remaining, Amount::from_whole(600));
    }

    #[test]
    fn dropping_an_unsettled_guard_releases_supply() {
        let (ledger, _dir) = ledger_with("pre-sale", 1000);
        {
            let _guard = ledger.reserve("pre-sale", Amount::from_whole(250)).unwrap();
            assert_eq!(ledger.snapshot("pre-sale").unwrap().remaining, Amount::from_whole(750));
        }
        assert_eq!(ledger.snapshot("pre-sale").unwrap().remaining, Amount::from_whole(1000));
    }

    #[test]
    fn failed_commit_write_still_releases_on_drop() {
        let (ledger, _dir) = ledger_with("pre-sale", 1000);
        {
            let mut guard = ledger.reserve("pre-sale", Amount::from_whole(300)).unwrap();
            let outcome = Err(crate::storage::SaleDbError::MissingSupply("pre-sale".into()));
            assert!(guard.settle(outcome).is_err());
            assert_eq!(ledger.snapshot("pre-sale").unwrap().remaining, Amount::from_whole(700));
        }
        assert_eq!(ledger.snapshot("pre-sale").unwrap().remaining, Amount::from_whole(1000));
        assert!(ledger.db.list_reservations().unwrap().is_empty());
    }

    #[test]
    fn exhausting_supply_then_one_more() {
        let (ledger, _dir) = ledger_with("pre-sale", 1000);

        ledger
            .reserve("pre-sale", Amount::from_whole(1000))
            .unwrap()
            .commit()
            .unwrap();
        assert!(ledger.snapshot("pre-sale").unwrap().remaining.is_zero());

        let err = ledger.reserve("pre-sale", Amount::from_whole(1)).err().unwrap();
        assert!(matches!(
            err,
            SaleError::InsufficientSupply { remaining, .. } if remaining.is_zero()
        ));
    }

    #[test]
    fn rejects_zero_and_unknown_phase() {
        let (ledger, _dir) = ledger_with("pre-sale", 10);
        assert!(matches!(
            ledger.reserve("pre-sale", Amount::ZERO),
            Err(SaleError::Validation(_))
        ));
        assert!(matches!(
            ledger.reserve("other", Amount::from_whole(1)),
            Err(SaleError::PhaseNotFound(_))
        ));
    }

    #[test]
    fn concurrent_reservations_never_oversubscribe() {
        let (ledger, _dir) = ledger_with("p", 1000);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    ledger
                        .reserve("p", Amount::from_whole(300))
                        .and_then(|guard| guard.commit())
                        .is_ok()
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 3);
        assert_eq!(ledger.snapshot("p").unwrap().remaining, Amount::from_whole(100));
    }

    #[test]
    fn stale_reservations_are_recovered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sale.redb");
        {
            // A reservation persisted by a process that died before settling it
            let db = SaleDatabase::open(&path).unwrap();
            db.seed_phase("p", Amount::from_whole(50)).unwrap();
            let outcome = db
                .reserve(&StoredReservation {
                    id: Uuid::new_v4(),
                    phase_id: "p".to_string(),
                    amount: Amount::from_whole(20),
                    created_at: Utc::now(),
                })
                .unwrap();
            assert_eq!(outcome, ReserveOutcome::Reserved);
        }

        let db = Arc::new(SaleDatabase::open(&path).unwrap());
        let ledger = SupplyLedger::new(db);
        assert_eq!(ledger.snapshot("p").unwrap().remaining, Amount::from_whole(30));
        assert_eq!(ledger.recover_stale_reservations().unwrap(), 1);
        assert_eq!(ledger.snapshot("p").unwrap().remaining, Amount::from_whole(50));
        assert_eq!(ledger.recover_stale_reservations().unwrap(), 0);
    }
}
