// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Unsigned transaction assembly.
//!
//! Every builder follows the same shape: resolve the token accounts involved,
//! prepend an account-creation instruction for each destination that does not
//! exist yet, append the transfers, then bind the message to a freshly fetched
//! blockhash with the requesting wallet as fee payer. The result is the
//! bincode wire form with empty signature slots, base64-encoded.
//!
//! The builder only reads from the ledger; it never signs or submits.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use spl_token::solana_program::program_pack::Pack;
use utoipa::ToSchema;

use super::accounts::AccountResolver;
use super::client::{LedgerClient, LedgerError};
use super::retry::RetryPolicy;
use super::types::{UnsignedTransaction, NATIVE_DECIMALS};
use crate::sale::amount::Amount;
use crate::sale::error::SaleError;

/// Asset used to pay on `/payments`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PaymentMethod {
    #[serde(rename = "SOL")]
    Sol,
    #[serde(rename = "USDC")]
    Usdc,
}

/// Asset moved by a generic transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TransferAsset {
    #[serde(rename = "SOL")]
    Sol,
    #[serde(rename = "USDC")]
    Usdc,
    #[serde(rename = "TOKEN", alias = "MILTON")]
    SaleToken,
}

/// Static addresses the builder works with.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    pub sale_mint: Pubkey,
    pub usdc_mint: Pubkey,
    pub treasury: Pubkey,
    /// Skip the mint account read when known.
    pub sale_decimals: Option<u8>,
    /// Sale tokens granted per paid SOL or USDC on `/payments`.
    pub payment_tokens_per_unit: Amount,
}

/// A validated token purchase ready to be turned into a transaction.
#[derive(Debug, Clone, Copy)]
pub struct PurchasePlan {
    pub buyer: Pubkey,
    pub amount: Amount,
    /// SOL owed by the buyer.
    pub total_cost: Amount,
}

pub struct TransactionBuilder {
    ledger: Arc<dyn LedgerClient>,
    accounts: Arc<dyn AccountResolver>,
    retry: RetryPolicy,
    config: BuilderConfig,
    decimals: Mutex<HashMap<Pubkey, u8>>,
}

impl TransactionBuilder {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        accounts: Arc<dyn AccountResolver>,
        retry: RetryPolicy,
        config: BuilderConfig,
    ) -> Self {
        let mut decimals = HashMap::new();
        if let Some(known) = config.sale_decimals {
            decimals.insert(config.sale_mint, known);
        }
        Self {
            ledger,
            accounts,
            retry,
            config,
            decimals: Mutex::new(decimals),
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Sale-token purchase: allocation to the buyer, SOL to the treasury.
    pub async fn build_purchase(
        &self,
        plan: &PurchasePlan,
    ) -> Result<UnsignedTransaction, SaleError> {
        let mint = self.config.sale_mint;
        let treasury = self.config.treasury;
        let decimals = self.mint_decimals(&mint).await?;
        let token_units = plan.amount.to_base_units(decimals)?;
        let lamports = plan.total_cost.to_base_units(NATIVE_DECIMALS)?;

        let mut instructions = Vec::with_capacity(3);
        let buyer_ata = self
            .ensure_token_account(&mut instructions, &plan.buyer, &plan.buyer, &mint)
            .await?;
        let treasury_ata = self.accounts.resolve(&mint, &treasury);
        instructions.push(transfer_checked(
            &treasury_ata,
            &mint,
            &buyer_ata,
            &treasury,
            token_units,
            decimals,
        )?);
        instructions.push(system_instruction::transfer(&plan.buyer, &treasury, lamports));

        self.finish(&instructions, &plan.buyer).await
    }

    /// Crowdfunding contribution of sale tokens into a campaign vault.
    pub async fn build_contribution(
        &self,
        contributor: &Pubkey,
        vault_owner: &Pubkey,
        amount: Amount,
    ) -> Result<UnsignedTransaction, SaleError> {
        let mint = self.config.sale_mint;
        let decimals = self.mint_decimals(&mint).await?;
        let units = amount.to_base_units(decimals)?;

        let mut instructions = Vec::with_capacity(2);
        let vault_ata = self
            .ensure_token_account(&mut instructions, contributor, vault_owner, &mint)
            .await?;
        let contributor_ata = self.accounts.resolve(&mint, contributor);
        instructions.push(transfer_checked(
            &contributor_ata,
            &mint,
            &vault_ata,
            contributor,
            units,
            decimals,
        )?);

        self.finish(&instructions, contributor).await
    }

    /// Fixed-rate payment in SOL or USDC, paid out in sale tokens.
    pub async fn build_payment(
        &self,
        buyer: &Pubkey,
        method: PaymentMethod,
        amount: Amount,
    ) -> Result<UnsignedTransaction, SaleError> {
        let treasury = self.config.treasury;
        let mut instructions = Vec::with_capacity(4);

        match method {
            PaymentMethod::Sol => {
                let lamports = amount.to_base_units(NATIVE_DECIMALS)?;
                instructions.push(system_instruction::transfer(buyer, &treasury, lamports));
            }
            PaymentMethod::Usdc => {
                let usdc = self.config.usdc_mint;
                let decimals = self.mint_decimals(&usdc).await?;
                let units = amount.to_base_units(decimals)?;
                let treasury_usdc = self
                    .ensure_token_account(&mut instructions, buyer, &treasury, &usdc)
                    .await?;
                let buyer_usdc = self.accounts.resolve(&usdc, buyer);
                instructions.push(transfer_checked(
                    &buyer_usdc,
                    &usdc,
                    &treasury_usdc,
                    buyer,
                    units,
                    decimals,
                )?);
            }
        }

        let mint = self.config.sale_mint;
        let decimals = self.mint_decimals(&mint).await?;
        let tokens = amount.mul_floor(self.config.payment_tokens_per_unit)?;
        let token_units = tokens.to_base_units(decimals)?;
        let buyer_ata = self
            .ensure_token_account(&mut instructions, buyer, buyer, &mint)
            .await?;
        let treasury_ata = self.accounts.resolve(&mint, &treasury);
        instructions.push(transfer_checked(
            &treasury_ata,
            &mint,
            &buyer_ata,
            &treasury,
            token_units,
            decimals,
        )?);

        self.finish(&instructions, buyer).await
    }

    /// Plain transfer between two wallets.
    pub async fn build_transfer(
        &self,
        sender: &Pubkey,
        recipient: &Pubkey,
        asset: TransferAsset,
        amount: Amount,
    ) -> Result<UnsignedTransaction, SaleError> {
        let mint = match asset {
            TransferAsset::Sol => {
                let lamports = amount.to_base_units(NATIVE_DECIMALS)?;
                let instructions = [system_instruction::transfer(sender, recipient, lamports)];
                return self.finish(&instructions, sender).await;
            }
            TransferAsset::Usdc => self.config.usdc_mint,
            TransferAsset::SaleToken => self.config.sale_mint,
        };

        let decimals = self.mint_decimals(&mint).await?;
        let units = amount.to_base_units(decimals)?;

        let mut instructions = Vec::with_capacity(2);
        let recipient_ata = self
            .ensure_token_account(&mut instructions, sender, recipient, &mint)
            .await?;
        let sender_ata = self.accounts.resolve(&mint, sender);
        instructions.push(transfer_checked(
            &sender_ata,
            &mint,
            &recipient_ata,
            sender,
            units,
            decimals,
        )?);

        self.finish(&instructions, sender).await
    }

    /// Decimals of `mint`, read from the mint account once and then cached.
    pub async fn mint_decimals(&self, mint: &Pubkey) -> Result<u8, LedgerError> {
        if let Some(decimals) = self.cached_decimals(mint) {
            return Ok(decimals);
        }

        let account = self
            .retry
            .run("get_mint", || self.ledger.get_account_info(mint))
            .await?
            .ok_or_else(|| LedgerError::InvalidData(format!("mint account {mint} not found")))?;
        let state = spl_token::state::Mint::unpack(&account.data)
            .map_err(|e| LedgerError::InvalidData(format!("mint account {mint}: {e}")))?;

        if let Ok(mut cache) = self.decimals.lock() {
            cache.insert(*mint, state.decimals);
        }
        Ok(state.decimals)
    }

    fn cached_decimals(&self, mint: &Pubkey) -> Option<u8> {
        self.decimals.lock().ok()?.get(mint).copied()
    }

    /// Resolve `owner`'s token account for `mint`, pushing a creation
    /// instruction paid by `payer` if it does not exist yet.
    async fn ensure_token_account(
        &self,
        instructions: &mut Vec<Instruction>,
        payer: &Pubkey,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Pubkey, LedgerError> {
        let address = self.accounts.resolve(mint, owner);
        if !self.accounts.account_exists(&address).await? {
            tracing::debug!(%owner, %mint, %address, "Token account missing, adding create instruction");
            instructions.push(create_associated_token_account_idempotent(
                payer,
                owner,
                mint,
                &spl_token::id(),
            ));
        }
        Ok(address)
    }

    async fn finish(
        &self,
        instructions: &[Instruction],
        fee_payer: &Pubkey,
    ) -> Result<UnsignedTransaction, SaleError> {
        let latest = self
            .retry
            .run("get_latest_blockhash", || self.ledger.get_latest_blockhash())
            .await?;

        let mut transaction = Transaction::new_with_payer(instructions, Some(fee_payer));
        transaction.message.recent_blockhash = latest.blockhash;

        let wire = bincode::serialize(&transaction)
            .map_err(|e| SaleError::Internal(format!("transaction serialization: {e}")))?;

        Ok(UnsignedTransaction {
            transaction: BASE64.encode(wire),
            fee_payer: *fee_payer,
            recent_blockhash: latest.blockhash,
            last_valid_block_height: latest.last_valid_block_height,
        })
    }
}

fn transfer_checked(
    source: &Pubkey,
    mint: &Pubkey,
    destination: &Pubkey,
    authority: &Pubkey,
    amount: u64,
    decimals: u8,
) -> Result<Instruction, LedgerError> {
    spl_token::instruction::transfer_checked(
        &spl_token::id(),
        source,
        mint,
        destination,
        authority,
        &[],
        amount,
        decimals,
    )
    .map_err(|e| LedgerError::InstructionBuild {
        program: "spl-token".to_string(),
        reason: e.to_string(),
    })
}

/// Bound a whole build. Running out of time counts as the ledger being
/// unavailable.
pub async fn within<F>(limit: Duration, build: F) -> Result<UnsignedTransaction, SaleError>
where
    F: Future<Output = Result<UnsignedTransaction, SaleError>>,
{
    tokio::time::timeout(limit, build).await.map_err(|_| {
        SaleError::LedgerUnavailable(format!(
            "transaction build timed out after {} ms",
            limit.as_millis()
        ))
    })?
}

/// Decode a base64 wire transaction.
pub fn decode_wire(encoded: &str) -> Result<Vec<u8>, SaleError> {
    BASE64
        .decode(encoded.trim())
        .map_err(|e| SaleError::Validation(format!("signedTransaction is not valid base64: {e}")))
}
