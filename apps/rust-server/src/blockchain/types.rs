// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger types and constants.

use std::str::FromStr;

use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;

use super::client::LedgerError;

/// Mainnet USDC mint.
pub const USDC_MAINNET_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// Decimals of the native asset (1 SOL = 10^9 lamports).
pub const NATIVE_DECIMALS: u8 = 9;

/// A recent blockhash together with the last block height at which a
/// transaction referencing it can still land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestBlockhash {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Cluster commitment reached by a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommitmentLevel {
    Processed,
    Confirmed,
    Finalized,
}

/// Ledger-reported status of a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSignatureStatus {
    pub level: CommitmentLevel,
    /// Execution error, if the transaction landed but failed.
    pub err: Option<String>,
}

/// Base64 wire form of an unsigned transaction, ready for a wallet to sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub transaction: String,
    pub fee_payer: Pubkey,
    pub recent_blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Parse a base58 account key.
pub fn parse_pubkey(field: &str, value: &str) -> Result<Pubkey, LedgerError> {
    Pubkey::from_str(value.trim())
        .map_err(|e| LedgerError::InvalidAddress(format!("{field}: {e}")))
}
