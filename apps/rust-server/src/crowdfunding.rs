// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Crowdfunding campaigns funded in sale tokens.
//!
//! Contributions are unsigned token transfers from the contributor into the
//! vault owner's token account. The campaign's `raised` total counts prepared
//! contributions.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::blockchain::transactions::within;
use crate::blockchain::{parse_pubkey, TransactionBuilder, UnsignedTransaction};
use crate::sale::amount::Amount;
use crate::sale::error::SaleError;
use crate::storage::SaleDatabase;

const NAME_MAX_CHARS: usize = 100;
const DESCRIPTION_MAX_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub description: String,
    #[schema(value_type = String)]
    pub goal: Amount,
    #[schema(value_type = String)]
    pub raised: Amount,
    pub end_date: DateTime<Utc>,
    /// Owner of the vault receiving contributions.
    pub creator: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub name: String,
    pub description: String,
    pub goal: Amount,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PreparedContribution {
    pub campaign: Campaign,
    pub transaction: UnsignedTransaction,
}

pub struct CampaignService {
    db: Arc<SaleDatabase>,
    builder: Arc<TransactionBuilder>,
    vault_owner: Pubkey,
    build_timeout: Duration,
}

impl CampaignService {
    pub fn new(
        db: Arc<SaleDatabase>,
        builder: Arc<TransactionBuilder>,
        vault_owner: Pubkey,
        build_timeout: Duration,
    ) -> Self {
        Self {
            db,
            builder,
            vault_owner,
            build_timeout,
        }
    }

    pub fn create(&self, new: NewCampaign, now: DateTime<Utc>) -> Result<Campaign, SaleError> {
        let name = new.name.trim();
        let name_len = name.chars().count();
        if name_len == 0 || name_len > NAME_MAX_CHARS {
            return Err(SaleError::Validation(format!(
                "name must be between 1 and {NAME_MAX_CHARS} characters"
            )));
        }
        if new.description.chars().count() > DESCRIPTION_MAX_CHARS {
            return Err(SaleError::Validation(format!(
                "description must be at most {DESCRIPTION_MAX_CHARS} characters"
            )));
        }
        if new.goal.is_zero() {
            return Err(SaleError::Validation("goal must be positive".to_string()));
        }
        if new.end_date <= now {
            return Err(SaleError::Validation("endDate must be in the future".to_string()));
        }

        let campaign = Campaign {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: new.description,
            goal: new.goal,
            raised: Amount::ZERO,
            end_date: new.end_date,
            creator: self.vault_owner.to_string(),
            created_at: now,
        };
        self.db.insert_campaign(&campaign)?;

        tracing::info!(campaign_id = %campaign.id, name = %campaign.name, "Campaign created");
        Ok(campaign)
    }

    pub fn get(&self, id: &str) -> Result<Campaign, SaleError> {
        self.db
            .get_campaign(id)?
            .ok_or_else(|| SaleError::CampaignNotFound(id.to_string()))
    }

    pub fn list(&self) -> Result<Vec<Campaign>, SaleError> {
        Ok(self.db.list_campaigns()?)
    }

    /// Prepare an unsigned contribution and count it towards the campaign.
    pub async fn contribute(
        &self,
        campaign_id: &str,
        contributor_address: &str,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> Result<PreparedContribution, SaleError> {
        let campaign = self.get(campaign_id)?;
        if now > campaign.end_date {
            return Err(SaleError::CampaignEnded(campaign.id));
        }
        if amount.is_zero() {
            return Err(SaleError::Validation("amount must be positive".to_string()));
        }
        let contributor = parse_pubkey("contributorAddress", contributor_address)?;
        let vault_owner = parse_pubkey("creator", &campaign.creator)?;

        let transaction = within(
            self.build_timeout,
            self.builder.build_contribution(&contributor, &vault_owner, amount),
        )
        .await?;

        let campaign = self
            .db
            .add_to_raised(&campaign.id, amount)?
            .ok_or_else(|| SaleError::CampaignNotFound(campaign.id.clone()))?;

        tracing::info!(
            campaign_id = %campaign.id,
            contributor = %contributor,
            %amount,
            raised = %campaign.raised,
            "Contribution prepared"
        );
        Ok(PreparedContribution {
            campaign,
            transaction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::mock::MockLedger;
    use crate::blockchain::{AssociatedTokenResolver, BuilderConfig, RetryPolicy};
    use chrono::Duration as ChronoDuration;

    const CONTRIBUTOR: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";

    fn service() -> (CampaignService, Arc<MockLedger>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(SaleDatabase::open(&dir.path().join("sale.redb")).unwrap());
        let ledger = Arc::new(MockLedger::new());
        let retry = RetryPolicy::new(1, Duration::from_millis(100));
        let accounts = Arc::new(AssociatedTokenResolver::new(ledger.clone(), retry.clone()));
        let builder = Arc::new(TransactionBuilder::new(
            ledger.clone(),
            accounts,
            retry,
            BuilderConfig {
                sale_mint: Pubkey::new_unique(),
                usdc_mint: Pubkey::new_unique(),
                treasury: Pubkey::new_unique(),
                sale_decimals: Some(9),
                payment_tokens_per_unit: Amount::from_whole(1000),
            },
        ));
        (
            CampaignService::new(db, builder, Pubkey::new_unique(), Duration::from_secs(5)),
            ledger,
            dir,
        )
    }

    fn new_campaign(name: &str, end_in: ChronoDuration) -> NewCampaign {
        NewCampaign {
            name: name.to_string(),
            description: "Community garden".to_string(),
            goal: Amount::from_whole(5000),
            end_date: Utc::now() + end_in,
        }
    }

    #[test]
    fn create_validates_input() {
        let (service, _ledger, _dir) = service();
        let now = Utc::now();

        assert!(service.create(new_campaign("", ChronoDuration::days(1)), now).is_err());
        assert!(service
            .create(new_campaign(&"x".repeat(101), ChronoDuration::days(1)), now)
            .is_err());

        let mut zero_goal = new_campaign("Garden", ChronoDuration::days(1));
        zero_goal.goal = Amount::ZERO;
        assert!(service.create(zero_goal, now).is_err());

        let mut long = new_campaign("Garden", ChronoDuration::days(1));
        long.description = "d".repeat(1001);
        assert!(service.create(long, now).is_err());

        let created = service
            .create(new_campaign("Garden", ChronoDuration::days(1)), now)
            .unwrap();
        assert!(created.raised.is_zero());
        assert_eq!(service.get(&created.id).unwrap(), created);
        assert_eq!(service.list().unwrap().len(), 1);
    }

    #[test]
    fn unknown_campaign_is_not_found() {
        let (service, _ledger, _dir) = service();
        assert_eq!(service.get("missing").unwrap_err().code(), "CAMPAIGN_NOT_FOUND");
    }

    #[tokio::test]
    async fn contribution_builds_transaction_and_counts_towards_raised() {
        let (service, ledger, _dir) = service();
        let campaign = service
            .create(new_campaign("Garden", ChronoDuration::days(1)), Utc::now())
            .unwrap();

        let prepared = service
            .contribute(&campaign.id, CONTRIBUTOR, Amount::from_whole(25), Utc::now())
            .await
            .unwrap();
        assert_eq!(prepared.campaign.raised, Amount::from_whole(25));
        assert_eq!(prepared.transaction.fee_payer.to_string(), CONTRIBUTOR);
        assert_eq!(prepared.transaction.recent_blockhash, ledger.blockhash());
        assert_eq!(service.get(&campaign.id).unwrap().raised, Amount::from_whole(25));
    }

    #[tokio::test]
    async fn contribution_after_end_is_rejected() {
        let (service, _ledger, _dir) = service();
        let campaign = service
            .create(new_campaign("Garden", ChronoDuration::hours(1)), Utc::now())
            .unwrap();

        let err = service
            .contribute(
                &campaign.id,
                CONTRIBUTOR,
                Amount::from_whole(1),
                Utc::now() + ChronoDuration::hours(2),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CAMPAIGN_ENDED");
    }

    #[tokio::test]
    async fn failed_build_does_not_count() {
        let (service, ledger, _dir) = service();
        let campaign = service
            .create(new_campaign("Garden", ChronoDuration::days(1)), Utc::now())
            .unwrap();
        ledger.set_offline(true);

        let err = service
            .contribute(&campaign.id, CONTRIBUTOR, Amount::from_whole(5), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "LEDGER_UNAVAILABLE");
        assert!(service.get(&campaign.id).unwrap().raised.is_zero());
    }
}
