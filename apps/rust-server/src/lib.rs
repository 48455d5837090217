// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token Sale Engine - Sale, Payment and Confirmation Service
//!
//! Builds unsigned Solana transactions for phased token sales, crowdfunding
//! contributions and payments, and tracks submitted transactions until the
//! ledger reports a final outcome. Buyers sign in their own wallets; the
//! service holds no private keys.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `blockchain` - Solana RPC access and transaction assembly
//! - `confirmation` - Signature tracking and the background poller
//! - `crowdfunding` - Campaigns and contributions
//! - `sale` - Phases, supply accounting and purchase orchestration
//! - `storage` - redb persistence and caches

pub mod api;
pub mod blockchain;
pub mod config;
pub mod confirmation;
pub mod crowdfunding;
pub mod error;
pub mod models;
pub mod sale;
pub mod state;
pub mod storage;
