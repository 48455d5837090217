// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Narrow ledger client used by the sale engine.
//!
//! Only four RPC calls are needed: a recent blockhash, account lookups, signature
//! status and raw transaction relay. [`LedgerClient`] keeps the rest of the
//! crate independent of the RPC transport so tests can substitute an
//! in-process ledger.

use std::time::Duration;

use async_trait::async_trait;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::RpcError;
use solana_sdk::account::Account;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use solana_transaction_status::TransactionConfirmationStatus;

use super::types::{CommitmentLevel, LatestBlockhash, LedgerSignatureStatus};

/// Errors that can occur while talking to the ledger.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("{operation} timed out after {timeout_ms} ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("{0}")]
    InvalidAddress(String),

    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("invalid ledger data: {0}")]
    InvalidData(String),

    #[error("instruction building failed for {program}: {reason}")]
    InstructionBuild { program: String, reason: String },
}

impl LedgerError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Unavailable(_) | LedgerError::Timeout { .. })
    }

    fn from_client(err: ClientError, sending: bool) -> Self {
        match err.kind() {
            ClientErrorKind::TransactionError(e) => LedgerError::Rejected(e.to_string()),
            ClientErrorKind::SigningError(e) => LedgerError::Rejected(e.to_string()),
            ClientErrorKind::RpcError(RpcError::RpcResponseError { message, .. }) if sending => {
                LedgerError::Rejected(message.clone())
            }
            _ => LedgerError::Unavailable(err.to_string()),
        }
    }
}

/// Read and relay operations against the ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn get_latest_blockhash(&self) -> Result<LatestBlockhash, LedgerError>;

    /// Fetch an account, `None` if it does not exist.
    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<Account>, LedgerError>;

    /// Status of a signature, `None` if the ledger has not seen it.
    ///
    /// Without `search_history` only the node's recent status cache is
    /// consulted, which forgets signatures after a few hundred slots.
    async fn get_signature_status(
        &self,
        signature: &Signature,
        search_history: bool,
    ) -> Result<Option<LedgerSignatureStatus>, LedgerError>;

    /// Relay a fully signed, wire-encoded transaction.
    async fn send_raw_transaction(&self, wire: &[u8]) -> Result<Signature, LedgerError>;
}

/// [`LedgerClient`] backed by the nonblocking Solana JSON-RPC client.
pub struct RpcLedgerClient {
    rpc: RpcClient,
}

impl RpcLedgerClient {
    pub fn new(url: String, timeout: Duration) -> Self {
        Self {
            rpc: RpcClient::new_with_timeout_and_commitment(
                url,
                timeout,
                CommitmentConfig::confirmed(),
            ),
        }
    }

    pub fn url(&self) -> String {
        self.rpc.url()
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn get_latest_blockhash(&self) -> Result<LatestBlockhash, LedgerError> {
        let (blockhash, last_valid_block_height) = self
            .rpc
            .get_latest_blockhash_with_commitment(CommitmentConfig::confirmed())
            .await
            .map_err(|e| LedgerError::from_client(e, false))?;
        Ok(LatestBlockhash {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<Account>, LedgerError> {
        let response = self
            .rpc
            .get_account_with_commitment(address, CommitmentConfig::confirmed())
            .await
            .map_err(|e| LedgerError::from_client(e, false))?;
        Ok(response.value)
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
        search_history: bool,
    ) -> Result<Option<LedgerSignatureStatus>, LedgerError> {
        let signatures = [*signature];
        let lookup = if search_history {
            self.rpc.get_signature_statuses_with_history(&signatures).await
        } else {
            self.rpc.get_signature_statuses(&signatures).await
        };
        let response = lookup.map_err(|e| LedgerError::from_client(e, false))?;

        let Some(status) = response.value.into_iter().next().flatten() else {
            return Ok(None);
        };

        let level = match status.confirmation_status {
            Some(TransactionConfirmationStatus::Processed) => CommitmentLevel::Processed,
            Some(TransactionConfirmationStatus::Confirmed) => CommitmentLevel::Confirmed,
            Some(TransactionConfirmationStatus::Finalized) => CommitmentLevel::Finalized,
            // Older nodes omit the field; a rooted slot reports no confirmation count.
            None if status.confirmations.is_none() => CommitmentLevel::Finalized,
            None => CommitmentLevel::Confirmed,
        };

        Ok(Some(LedgerSignatureStatus {
            level,
            err: status.err.map(|e| e.to_string()),
        }))
    }

    async fn send_raw_transaction(&self, wire: &[u8]) -> Result<Signature, LedgerError> {
        let transaction: VersionedTransaction = bincode::deserialize(wire)
            .map_err(|e| LedgerError::InvalidData(format!("undecodable transaction: {e}")))?;
        self.rpc
            .send_transaction(&transaction)
            .await
            .map_err(|e| LedgerError::from_client(e, true))
    }
}
