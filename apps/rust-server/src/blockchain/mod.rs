// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Solana integration module.
//!
//! This module provides functionality for:
//! - Reading blockhashes, accounts and signature statuses
//! - Resolving associated token accounts
//! - Assembling unsigned purchase, payment and transfer transactions
//! - Relaying client-signed transactions

pub mod accounts;
pub mod client;
#[cfg(test)]
pub mod mock;
pub mod retry;
pub mod transactions;
pub mod types;

pub use accounts::{AccountResolver, AssociatedTokenResolver};
pub use client::{LedgerClient, LedgerError, RpcLedgerClient};
pub use retry::RetryPolicy;
pub use transactions::{
    BuilderConfig, PaymentMethod, PurchasePlan, TransactionBuilder, TransferAsset,
};
pub use types::*;
