// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use chrono::{DateTime, Utc};
use solana_sdk::pubkey::Pubkey;

use super::amount::Amount;
use super::error::SaleError;
use super::phase::PhaseDefinition;
use super::supply::SupplySnapshot;
use crate::blockchain::parse_pubkey;

/// A buyer's request to purchase sale tokens in a phase.
#[derive(Debug, Clone)]
pub struct PurchaseRequest {
    pub phase_id: String,
    pub buyer_address: String,
    pub amount: Amount,
}

/// Per-request purchase rules, checked in order; the first failure wins.
///
/// Negative or non-numeric amounts never reach these rules: they fail while
/// the request body is decoded, ahead of the phase window check.
///
/// The supply check here reads a snapshot and only fails fast: the
/// authoritative check happens again inside the reservation.
#[derive(Debug, Default, Clone, Copy)]
pub struct PurchaseValidator;

impl PurchaseValidator {
    /// Returns the parsed buyer key when every rule passes.
    pub fn validate(
        &self,
        request: &PurchaseRequest,
        phase: &PhaseDefinition,
        supply: &SupplySnapshot,
        now: DateTime<Utc>,
    ) -> Result<Pubkey, SaleError> {
        if !phase.contains(now) {
            return Err(SaleError::PhaseInactive {
                phase_id: phase.id.clone(),
            });
        }

        if request.amount.is_zero() {
            return Err(SaleError::Validation("Amount must be positive".to_string()));
        }

        if request.amount < phase.min_purchase {
            return Err(SaleError::BelowMinimum {
                minimum: phase.min_purchase,
            });
        }
        if request.amount > phase.max_purchase {
            return Err(SaleError::AboveMaximum {
                maximum: phase.max_purchase,
            });
        }

        if request.amount > supply.remaining {
            return Err(SaleError::InsufficientSupply {
                requested: request.amount,
                remaining: supply.remaining,
            });
        }

        Ok(parse_pubkey("walletAddress", &request.buyer_address)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const BUYER: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";

    fn phase(now: DateTime<Utc>) -> PhaseDefinition {
        PhaseDefinition {
            id: "pre-sale".to_string(),
            name: "Pre-Sale".to_string(),
            description: String::new(),
            unit_price: Amount::parse("0.00001").unwrap(),
            min_purchase: Amount::from_whole(100),
            max_purchase: Amount::from_whole(900),
            total_supply: Amount::from_whole(1000),
            start_time: now - Duration::days(1),
            end_time: now + Duration::days(1),
        }
    }

    fn request(amount: u64) -> PurchaseRequest {
        PurchaseRequest {
            phase_id: "pre-sale".to_string(),
            buyer_address: BUYER.to_string(),
            amount: Amount::from_whole(amount),
        }
    }

    fn full_supply() -> SupplySnapshot {
        SupplySnapshot {
            total: Amount::from_whole(1000),
            remaining: Amount::from_whole(1000),
        }
    }

    #[test]
    fn accepts_amount_within_bounds() {
        let now = Utc::now();
        let buyer = PurchaseValidator
            .validate(&request(500), &phase(now), &full_supply(), now)
            .unwrap();
        assert_eq!(buyer.to_string(), BUYER);
    }

    #[test]
    fn enforces_bounds() {
        let now = Utc::now();
        let phase = phase(now);

        assert!(matches!(
            PurchaseValidator.validate(&request(950), &phase, &full_supply(), now),
            Err(SaleError::AboveMaximum { maximum }) if maximum == Amount::from_whole(900)
        ));
        assert!(matches!(
            PurchaseValidator.validate(&request(99), &phase, &full_supply(), now),
            Err(SaleError::BelowMinimum { .. })
        ));
        // Bounds are inclusive
        assert!(PurchaseValidator.validate(&request(100), &phase, &full_supply(), now).is_ok());
        assert!(PurchaseValidator.validate(&request(900), &phase, &full_supply(), now).is_ok());
    }

    #[test]
    fn inactive_phase_wins_regardless_of_amount() {
        let now = Utc::now();
        let phase = phase(now);
        let later = phase.end_time + Duration::seconds(1);

        for amount in [0, 1, 500, 5000] {
            assert!(matches!(
                PurchaseValidator.validate(&request(amount), &phase, &full_supply(), later),
                Err(SaleError::PhaseInactive { .. })
            ));
        }
    }

    #[test]
    fn window_edges_are_inclusive() {
        let now = Utc::now();
        let phase = phase(now);
        assert!(PurchaseValidator
            .validate(&request(500), &phase, &full_supply(), phase.start_time)
            .is_ok());
        assert!(PurchaseValidator
            .validate(&request(500), &phase, &full_supply(), phase.end_time)
            .is_ok());
    }

    #[test]
    fn zero_amount_is_a_validation_error() {
        let now = Utc::now();
        assert!(matches!(
            PurchaseValidator.validate(&request(0), &phase(now), &full_supply(), now),
            Err(SaleError::Validation(_))
        ));
    }

    #[test]
    fn snapshot_supply_is_checked() {
        let now = Utc::now();
        let low = SupplySnapshot {
            total: Amount::from_whole(1000),
            remaining: Amount::from_whole(200),
        };
        assert!(matches!(
            PurchaseValidator.validate(&request(300), &phase(now), &low, now),
            Err(SaleError::InsufficientSupply { .. })
        ));
    }

    #[test]
    fn address_is_checked_last() {
        let now = Utc::now();
        let mut bad = request(500);
        bad.buyer_address = "not-base58!".to_string();
        assert!(matches!(
            PurchaseValidator.validate(&bad, &phase(now), &full_supply(), now),
            Err(SaleError::InvalidAddress(_))
        ));

        // An out-of-bounds amount is reported before the bad address
        bad.amount = Amount::from_whole(5000);
        assert!(matches!(
            PurchaseValidator.validate(&bad, &phase(now), &full_supply(), now),
            Err(SaleError::AboveMaximum { .. })
        ));
    }
}
