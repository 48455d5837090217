// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sale phases and the registry that resolves which one is active.
//!
//! Phase definitions are static for the life of the process. The remaining
//! supply of each phase lives in the [`SupplyLedger`](super::supply::SupplyLedger);
//! a [`SalePhase`] is a point-in-time view joining both.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::amount::Amount;
use super::error::SaleError;

/// Configured sale phase (without mutable supply state).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Price in SOL per token.
    pub unit_price: Amount,
    pub min_purchase: Amount,
    pub max_purchase: Amount,
    pub total_supply: Amount,
    /// Window start (inclusive).
    pub start_time: DateTime<Utc>,
    /// Window end (inclusive).
    pub end_time: DateTime<Utc>,
}

impl PhaseDefinition {
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now <= self.end_time
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> PhaseStatus {
        if now < self.start_time {
            PhaseStatus::Upcoming
        } else if now > self.end_time {
            PhaseStatus::Ended
        } else {
            PhaseStatus::Active
        }
    }

    fn overlaps(&self, other: &PhaseDefinition) -> bool {
        self.start_time <= other.end_time && other.start_time <= self.end_time
    }
}

/// Lifecycle of a phase relative to the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    Upcoming,
    Active,
    Ended,
}

/// Snapshot of a phase with its current remaining supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalePhase {
    pub id: String,
    pub name: String,
    pub description: String,
    #[schema(value_type = String, example = "0.00001")]
    pub unit_price: Amount,
    #[schema(value_type = String)]
    pub min_purchase: Amount,
    #[schema(value_type = String)]
    pub max_purchase: Amount,
    #[schema(value_type = String)]
    pub total_supply: Amount,
    #[schema(value_type = String)]
    pub remaining_supply: Amount,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: PhaseStatus,
}

impl SalePhase {
    pub fn from_definition(
        definition: &PhaseDefinition,
        remaining_supply: Amount,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: definition.id.clone(),
            name: definition.name.clone(),
            description: definition.description.clone(),
            unit_price: definition.unit_price,
            min_purchase: definition.min_purchase,
            max_purchase: definition.max_purchase,
            total_supply: definition.total_supply,
            remaining_supply,
            start_time: definition.start_time,
            end_time: definition.end_time,
            status: definition.status_at(now),
        }
    }

    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now <= self.end_time
    }
}

/// Ordered, validated set of sale phases.
#[derive(Debug, Clone)]
pub struct PhaseRegistry {
    phases: Vec<PhaseDefinition>,
}

impl PhaseRegistry {
    /// Validate and wrap a list of phase definitions.
    ///
    /// Overlapping windows are accepted; [`PhaseRegistry::active_phase`]
    /// resolves them by list order.
    pub fn new(phases: Vec<PhaseDefinition>) -> Result<Self, SaleError> {
        if phases.is_empty() {
            return Err(SaleError::Validation(
                "At least one sale phase must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for phase in &phases {
            if phase.id.trim().is_empty() {
                return Err(SaleError::Validation("Phase id must not be empty".to_string()));
            }
            if !seen.insert(phase.id.as_str()) {
                return Err(SaleError::Validation(format!(
                    "Duplicate phase id: {}",
                    phase.id
                )));
            }
            if phase.start_time > phase.end_time {
                return Err(SaleError::Validation(format!(
                    "Phase {} starts after it ends",
                    phase.id
                )));
            }
            if phase.unit_price.is_zero() {
                return Err(SaleError::Validation(format!(
                    "Phase {} has a zero unit price",
                    phase.id
                )));
            }
            if phase.min_purchase.is_zero() || phase.min_purchase > phase.max_purchase {
                return Err(SaleError::Validation(format!(
                    "Phase {} purchase bounds are invalid",
                    phase.id
                )));
            }
            if phase.total_supply.is_zero() {
                return Err(SaleError::Validation(format!(
                    "Phase {} has no supply",
                    phase.id
                )));
            }
        }

        for (i, a) in phases.iter().enumerate() {
            for b in &phases[i + 1..] {
                if a.overlaps(b) {
                    tracing::warn!(
                        first = %a.id,
                        second = %b.id,
                        "Sale phase windows overlap; the earlier phase in the list wins"
                    );
                }
            }
        }

        Ok(Self { phases })
    }

    /// Load phase definitions from a JSON array on disk.
    pub fn from_json_file(path: &Path) -> Result<Self, SaleError> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            SaleError::Validation(format!("Cannot read phase file {}: {e}", path.display()))
        })?;
        let phases: Vec<PhaseDefinition> = serde_json::from_str(&data).map_err(|e| {
            SaleError::Validation(format!("Invalid phase file {}: {e}", path.display()))
        })?;
        Self::new(phases)
    }

    /// First phase (by list order) whose window contains `now`.
    pub fn active_phase(&self, now: DateTime<Utc>) -> Option<&PhaseDefinition> {
        self.phases.iter().find(|phase| phase.contains(now))
    }

    pub fn get(&self, phase_id: &str) -> Result<&PhaseDefinition, SaleError> {
        self.phases
            .iter()
            .find(|phase| phase.id == phase_id)
            .ok_or_else(|| SaleError::PhaseNotFound(phase_id.to_string()))
    }

    pub fn phases(&self) -> &[PhaseDefinition] {
        &self.phases
    }
}

/// Default three-tier schedule used when no phase file is configured.
pub fn default_phases() -> Vec<PhaseDefinition> {
    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s)
            .single()
            .unwrap_or_default()
    }

    vec![
        PhaseDefinition {
            id: "pre-sale".to_string(),
            name: "Pre-Sale".to_string(),
            description: "Early access for whitelisted addresses".to_string(),
            unit_price: Amount::from_raw(10_000),
            min_purchase: Amount::from_whole(1_000),
            max_purchase: Amount::from_whole(100_000),
            total_supply: Amount::from_whole(1_000_000_000),
            start_time: at(2025, 7, 1, 0, 0, 0),
            end_time: at(2025, 7, 7, 23, 59, 59),
        },
        PhaseDefinition {
            id: "public-sale".to_string(),
            name: "Public Sale".to_string(),
            description: "Open to all participants".to_string(),
            unit_price: Amount::from_raw(15_000),
            min_purchase: Amount::from_whole(100),
            max_purchase: Amount::from_whole(1_000_000),
            total_supply: Amount::from_whole(5_000_000_000),
            start_time: at(2025, 7, 8, 0, 0, 0),
            end_time: at(2025, 7, 15, 23, 59, 59),
        },
        PhaseDefinition {
            id: "final-sale".to_string(),
            name: "Final Sale".to_string(),
            description: "Last chance to participate".to_string(),
            unit_price: Amount::from_raw(20_000),
            min_purchase: Amount::from_whole(10),
            max_purchase: Amount::from_whole(10_000_000),
            total_supply: Amount::from_whole(12_067_600_000),
            start_time: at(2025, 7, 16, 0, 0, 0),
            end_time: at(2025, 7, 23, 23, 59, 59),
        },
    ]
}
