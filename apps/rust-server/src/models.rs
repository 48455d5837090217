// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. All JSON keys are
//! camelCase. Amounts are accepted as JSON numbers or strings and always
//! returned as decimal strings so no precision is lost in transit.
//!
//! ## Model Categories
//!
//! - **Token sales**: phase listing and purchase transactions
//! - **Crowdfunding**: campaign creation and contributions
//! - **Payments**: fixed-rate SOL/USDC payments paid out in sale tokens
//! - **Transactions**: generic transfers, relay, and confirmation tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::blockchain::{PaymentMethod, TransferAsset, UnsignedTransaction};
use crate::confirmation::{ConfirmationStatus, TrackingContext};
use crate::crowdfunding::Campaign;
use crate::sale::{Amount, SaleOverview, SalePhase};

/// Upper bound for amounts on `/payments` and `/transactions/create`.
pub const MAX_DIRECT_AMOUNT: Amount = Amount::from_whole(1000);

// =============================================================================
// Token Sales
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TokenSaleQuery {
    /// Phase id. Without it the whole schedule is returned.
    pub phase: Option<String>,
}

/// All phases with aggregate supply figures.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleOverviewResponse {
    pub phases: Vec<SalePhase>,
    #[schema(value_type = String)]
    pub total_supply: Amount,
    #[schema(value_type = String)]
    pub remaining_supply: Amount,
    #[schema(value_type = String)]
    pub sold: Amount,
    pub active_phase_id: Option<String>,
}

impl From<SaleOverview> for SaleOverviewResponse {
    fn from(overview: SaleOverview) -> Self {
        Self {
            phases: overview.phases,
            total_supply: overview.total_supply,
            remaining_supply: overview.remaining_supply,
            sold: overview.sold,
            active_phase_id: overview.active_phase_id,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseTokensRequest {
    /// Defaults to the currently active phase.
    #[serde(default)]
    pub phase_id: Option<String>,
    /// Number of tokens to buy, e.g. `"2500"` or `2500`.
    #[schema(value_type = String, example = "2500")]
    pub amount: Amount,
    /// Buyer wallet (base58). Pays fees and signs the transaction.
    pub wallet_address: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseTokensResponse {
    /// Base64 unsigned transaction, to be signed by the buyer.
    pub transaction: String,
    pub phase_id: String,
    #[schema(value_type = String)]
    pub amount: Amount,
    /// SOL per token.
    #[schema(value_type = String)]
    pub price: Amount,
    /// SOL owed by the buyer.
    #[schema(value_type = String)]
    pub total_cost: Amount,
    #[schema(value_type = String)]
    pub remaining_supply: Amount,
    pub last_valid_block_height: u64,
}

// =============================================================================
// Crowdfunding
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CampaignQuery {
    pub campaign_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[schema(value_type = String, example = "50000")]
    pub goal: Amount,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignResponse {
    pub success: bool,
    pub campaign_id: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CampaignListResponse {
    pub campaigns: Vec<Campaign>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContributeRequest {
    pub campaign_id: String,
    pub contributor_address: String,
    #[schema(value_type = String, example = "100")]
    pub amount: Amount,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContributeResponse {
    pub success: bool,
    pub transaction: String,
    pub last_valid_block_height: u64,
    pub message: String,
}

// =============================================================================
// Payments
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Payer wallet (base58).
    pub public_key: String,
    pub payment_method: PaymentMethod,
    /// Amount of SOL or USDC paid, in (0, 1000].
    #[schema(value_type = String, example = "1.5")]
    pub amount: Amount,
}

/// Unsigned transaction plus the block height after which it expires.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedTransactionResponse {
    pub transaction: String,
    pub last_valid_block_height: u64,
    pub message: String,
}

impl UnsignedTransactionResponse {
    pub fn new(unsigned: UnsignedTransaction, message: impl Into<String>) -> Self {
        Self {
            transaction: unsigned.transaction,
            last_valid_block_height: unsigned.last_valid_block_height,
            message: message.into(),
        }
    }
}

// =============================================================================
// Transactions
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub sender_address: String,
    pub recipient_address: String,
    /// Amount in (0, 1000].
    #[schema(value_type = String, example = "10")]
    pub amount: Amount,
    pub transaction_type: TransferAsset,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionResponse {
    pub success: bool,
    pub transaction: String,
    pub last_valid_block_height: u64,
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTransactionRequest {
    /// Base64 wire transaction signed by the client.
    pub signed_transaction: String,
    /// What the transaction settles, if known.
    #[serde(default)]
    pub context: Option<TrackingContext>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTransactionResponse {
    pub success: bool,
    pub signature: String,
    pub status: ConfirmationStatus,
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackTransactionRequest {
    pub signature: String,
    #[serde(default)]
    pub context: Option<TrackingContext>,
}

/// Reject zero and amounts above [`MAX_DIRECT_AMOUNT`].
pub fn check_direct_amount(amount: Amount) -> Result<(), String> {
    if amount.is_zero() {
        return Err("amount must be positive".to_string());
    }
    if amount > MAX_DIRECT_AMOUNT {
        return Err(format!("amount must not exceed {MAX_DIRECT_AMOUNT}"));
    }
    Ok(())
}
