// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Purchase orchestration: resolve phase, validate, reserve, build, settle.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::amount::Amount;
use super::error::SaleError;
use super::phase::{PhaseDefinition, PhaseRegistry, SalePhase};
use super::supply::SupplyLedger;
use super::validator::{PurchaseRequest, PurchaseValidator};
use crate::blockchain::transactions::within;
use crate::blockchain::{PurchasePlan, TransactionBuilder, UnsignedTransaction};

/// Outcome of a successful purchase request.
#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    pub transaction: UnsignedTransaction,
    pub phase_id: String,
    pub amount: Amount,
    pub unit_price: Amount,
    pub total_cost: Amount,
    pub remaining_supply: Amount,
}

/// All phases with aggregate supply figures.
#[derive(Debug, Clone)]
pub struct SaleOverview {
    pub phases: Vec<SalePhase>,
    pub total_supply: Amount,
    pub remaining_supply: Amount,
    pub sold: Amount,
    pub active_phase_id: Option<String>,
}

pub struct SaleEngine {
    registry: Arc<PhaseRegistry>,
    supply: SupplyLedger,
    validator: PurchaseValidator,
    builder: Arc<TransactionBuilder>,
    build_timeout: Duration,
}

impl SaleEngine {
    pub fn new(
        registry: Arc<PhaseRegistry>,
        supply: SupplyLedger,
        builder: Arc<TransactionBuilder>,
        build_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            supply,
            validator: PurchaseValidator,
            builder,
            build_timeout,
        }
    }

    pub fn registry(&self) -> &PhaseRegistry {
        &self.registry
    }

    pub fn phase(&self, phase_id: &str, now: DateTime<Utc>) -> Result<SalePhase, SaleError> {
        let definition = self.registry.get(phase_id)?;
        self.view(definition, now)
    }

    pub fn overview(&self, now: DateTime<Utc>) -> Result<SaleOverview, SaleError> {
        let mut phases = Vec::with_capacity(self.registry.phases().len());
        let mut total_supply = Amount::ZERO;
        let mut remaining_supply = Amount::ZERO;

        for definition in self.registry.phases() {
            let phase = self.view(definition, now)?;
            total_supply = total_supply
                .checked_add(phase.total_supply)
                .ok_or_else(|| SaleError::Internal("total supply overflow".to_string()))?;
            remaining_supply = remaining_supply
                .checked_add(phase.remaining_supply)
                .ok_or_else(|| SaleError::Internal("remaining supply overflow".to_string()))?;
            phases.push(phase);
        }

        Ok(SaleOverview {
            phases,
            total_supply,
            remaining_supply,
            sold: total_supply.saturating_sub(remaining_supply),
            active_phase_id: self.registry.active_phase(now).map(|p| p.id.clone()),
        })
    }

    /// Build an unsigned purchase transaction, holding supply for it.
    ///
    /// Without `phase_id` the phase active at `now` is used. Supply is only
    /// consumed if the transaction was built; every failure after the
    /// reservation hands it back.
    pub async fn purchase(
        &self,
        phase_id: Option<&str>,
        buyer_address: &str,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> Result<PurchaseReceipt, SaleError> {
        let phase = match phase_id {
            Some(id) => self.registry.get(id)?,
            None => self.registry.active_phase(now).ok_or_else(|| {
                SaleError::Validation("No sale phase is currently active".to_string())
            })?,
        };

        let request = PurchaseRequest {
            phase_id: phase.id.clone(),
            buyer_address: buyer_address.to_string(),
            amount,
        };
        let snapshot = self.supply.snapshot(&request.phase_id)?;
        let buyer = self.validator.validate(&request, phase, &snapshot, now)?;
        let total_cost = amount.mul_ceil(phase.unit_price)?;

        let reservation = self.supply.reserve(&request.phase_id, amount)?;

        let plan = PurchasePlan {
            buyer,
            amount,
            total_cost,
        };
        let built = within(self.build_timeout, self.builder.build_purchase(&plan)).await;

        let transaction = match built {
            Ok(transaction) => transaction,
            Err(e) => {
                warn!(
                    phase_id = %request.phase_id,
                    buyer = %buyer,
                    %amount,
                    error = %e,
                    "Purchase build failed, releasing reservation"
                );
                if let Err(release_err) = reservation.release() {
                    error!(error = %release_err, "Failed to release reservation");
                }
                return Err(e);
            }
        };

        reservation.commit()?;
        let remaining_supply = self.supply.snapshot(&request.phase_id)?.remaining;

        info!(
            phase_id = %request.phase_id,
            buyer = %buyer,
            %amount,
            %total_cost,
            %remaining_supply,
            "Purchase transaction built"
        );

        Ok(PurchaseReceipt {
            transaction,
            phase_id: request.phase_id,
            amount,
            unit_price: phase.unit_price,
            total_cost,
            remaining_supply,
        })
    }

    fn view(&self, definition: &PhaseDefinition, now: DateTime<Utc>) -> Result<SalePhase, SaleError> {
        let snapshot = self.supply.snapshot(&definition.id)?;
        Ok(SalePhase::from_definition(definition, snapshot.remaining, now))
    }
}
