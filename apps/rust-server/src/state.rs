// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tracing::{info, warn};

use crate::blockchain::{
    AssociatedTokenResolver, BuilderConfig, LedgerClient, RetryPolicy, TransactionBuilder,
};
use crate::confirmation::ConfirmationTracker;
use crate::config::AppConfig;
use crate::crowdfunding::CampaignService;
use crate::sale::{PhaseRegistry, SaleEngine, SaleError, SupplyLedger};
use crate::storage::SaleDatabase;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<SaleDatabase>,
    pub ledger: Arc<dyn LedgerClient>,
    pub engine: Arc<SaleEngine>,
    pub builder: Arc<TransactionBuilder>,
    pub tracker: ConfirmationTracker,
    pub campaigns: Arc<CampaignService>,
}

impl AppState {
    /// Wire the services together and bring the supply ledger in line with
    /// the phase schedule. Reservations left over from an interrupted run are
    /// released here, before any request is served.
    pub fn build(
        config: AppConfig,
        db: Arc<SaleDatabase>,
        registry: PhaseRegistry,
        ledger: Arc<dyn LedgerClient>,
    ) -> Result<Self, SaleError> {
        let supply = SupplyLedger::new(db.clone());
        supply.seed(registry.phases())?;
        let released = supply.recover_stale_reservations()?;
        if released > 0 {
            warn!(released, "Released reservations left by an interrupted run");
        }

        let retry = RetryPolicy::new(config.ledger.rpc_max_attempts, config.ledger.rpc_timeout);
        let accounts = Arc::new(AssociatedTokenResolver::new(ledger.clone(), retry.clone()));
        let builder = Arc::new(TransactionBuilder::new(
            ledger.clone(),
            accounts,
            retry.clone(),
            BuilderConfig {
                sale_mint: config.sale.sale_mint,
                usdc_mint: config.sale.usdc_mint,
                treasury: config.sale.treasury,
                sale_decimals: config.sale.sale_decimals,
                payment_tokens_per_unit: config.sale.payment_tokens_per_unit,
            },
        ));

        info!(phases = registry.phases().len(), "Sale schedule loaded");
        let engine = Arc::new(SaleEngine::new(
            Arc::new(registry),
            supply,
            builder.clone(),
            config.ledger.build_timeout,
        ));
        let tracker = ConfirmationTracker::new(
            db.clone(),
            ledger.clone(),
            retry,
            config.confirmation.timeout,
        );
        let campaigns = Arc::new(CampaignService::new(
            db.clone(),
            builder.clone(),
            config.sale.crowdfunding_wallet,
            config.ledger.build_timeout,
        ));

        Ok(Self {
            config: Arc::new(config),
            db,
            ledger,
            engine,
            builder,
            tracker,
            campaigns,
        })
    }
}
