// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction endpoints: generic transfers, relay of client-signed
//! transactions, and confirmation tracking.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use crate::{
    blockchain::{parse_pubkey, transactions::within},
    confirmation::ConfirmationRecord,
    error::{ApiError, ErrorBody},
    models::{
        check_direct_amount, CreateTransactionRequest, CreateTransactionResponse,
        SubmitTransactionRequest, SubmitTransactionResponse, TrackTransactionRequest,
    },
    sale::SaleError,
    state::AppState,
};

/// Build an unsigned transfer between two wallets.
#[utoipa::path(
    post,
    path = "/api/v1/transactions/create",
    tag = "Transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 200, description = "Unsigned transaction created", body = CreateTransactionResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 503, description = "Ledger unavailable", body = ErrorBody)
    )
)]
pub async fn create_transaction(
    State(state): State<AppState>,
    payload: Result<Json<CreateTransactionRequest>, JsonRejection>,
) -> Result<Json<CreateTransactionResponse>, ApiError> {
    let Json(request) = payload?;
    check_direct_amount(request.amount).map_err(ApiError::bad_request)?;
    let sender = parse_pubkey("senderAddress", &request.sender_address).map_err(SaleError::from)?;
    let recipient =
        parse_pubkey("recipientAddress", &request.recipient_address).map_err(SaleError::from)?;

    let unsigned = within(
        state.config.ledger.build_timeout,
        state
            .builder
            .build_transfer(&sender, &recipient, request.transaction_type, request.amount),
    )
    .await?;

    Ok(Json(CreateTransactionResponse {
        success: true,
        transaction: unsigned.transaction,
        last_valid_block_height: unsigned.last_valid_block_height,
        message: "Transaction created successfully. Please sign and submit the transaction."
            .to_string(),
    }))
}

/// Relay a client-signed transaction and start tracking it.
///
/// The server never adds signatures; the transaction must be fully signed.
#[utoipa::path(
    post,
    path = "/api/v1/transactions/submit",
    tag = "Transactions",
    request_body = SubmitTransactionRequest,
    responses(
        (status = 200, description = "Transaction relayed", body = SubmitTransactionResponse),
        (status = 400, description = "Malformed or rejected transaction", body = ErrorBody),
        (status = 503, description = "Ledger unavailable", body = ErrorBody)
    )
)]
pub async fn submit_transaction(
    State(state): State<AppState>,
    payload: Result<Json<SubmitTransactionRequest>, JsonRejection>,
) -> Result<Json<SubmitTransactionResponse>, ApiError> {
    let Json(request) = payload?;
    let record = state
        .tracker
        .submit(&request.signed_transaction, request.context)
        .await?;

    Ok(Json(SubmitTransactionResponse {
        success: true,
        message: format!("Transaction submitted successfully. Signature: {}", record.signature),
        signature: record.signature,
        status: record.status,
    }))
}

/// Register a signature the client submitted on its own.
#[utoipa::path(
    post,
    path = "/api/v1/transactions/track",
    tag = "Transactions",
    request_body = TrackTransactionRequest,
    responses(
        (status = 200, description = "Signature is tracked", body = ConfirmationRecord),
        (status = 400, description = "Invalid signature", body = ErrorBody)
    )
)]
pub async fn track_transaction(
    State(state): State<AppState>,
    payload: Result<Json<TrackTransactionRequest>, JsonRejection>,
) -> Result<Json<ConfirmationRecord>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(state.tracker.track(&request.signature, request.context)?))
}

/// Current confirmation status of a signature, refreshed from the ledger.
#[utoipa::path(
    get,
    path = "/api/v1/transactions/{signature}",
    tag = "Transactions",
    params(
        ("signature" = String, Path, description = "Transaction signature (base58)")
    ),
    responses(
        (status = 200, description = "Confirmation record", body = ConfirmationRecord),
        (status = 400, description = "Invalid signature", body = ErrorBody),
        (status = 503, description = "Ledger unavailable", body = ErrorBody)
    )
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(signature): Path<String>,
) -> Result<Json<ConfirmationRecord>, ApiError> {
    Ok(Json(state.tracker.status(&signature).await?))
}

#[cfg(test)]
mod tests {
    use crate::api::router;
    use crate::api::test_helpers::send;
    use crate::blockchain::{CommitmentLevel, LedgerSignatureStatus};
    use crate::state::test_support::{open_phase, test_app, BUYER};
    use axum::http::{Method, StatusCode};
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use serde_json::json;
    use solana_sdk::pubkey::Pubkey;
    use solana_sdk::signature::{Keypair, Signature, Signer};
    use solana_sdk::system_instruction;
    use solana_sdk::transaction::Transaction;

    fn signed_transfer(blockhash: solana_sdk::hash::Hash) -> (String, Signature) {
        let payer = Keypair::new();
        let ix = system_instruction::transfer(&payer.pubkey(), &Pubkey::new_unique(), 1_000);
        let tx = Transaction::new_signed_with_payer(&[ix], Some(&payer.pubkey()), &[&payer], blockhash);
        let signature = tx.signatures[0];
        (BASE64.encode(bincode::serialize(&tx).unwrap()), signature)
    }

    #[tokio::test]
    async fn create_builds_transfers_for_each_asset() {
        let app = test_app(vec![open_phase("pre-sale", 1000, 1, 1000)]);
        app.ledger.add_mint(app.state.config.sale.usdc_mint, 6);
        let recipient = Pubkey::new_unique().to_string();

        for asset in ["SOL", "USDC", "MILTON", "TOKEN"] {
            let (status, body) = send(
                router(app.state.clone()),
                Method::POST,
                "/api/v1/transactions/create",
                Some(json!({
                    "senderAddress": BUYER,
                    "recipientAddress": recipient,
                    "amount": 2,
                    "transactionType": asset
                })),
            )
            .await;
            assert_eq!(status, StatusCode::OK, "{asset}");
            assert_eq!(body["success"], true);
        }

        let (status, body) = send(
            router(app.state.clone()),
            Method::POST,
            "/api/v1/transactions/create",
            Some(json!({
                "senderAddress": BUYER,
                "recipientAddress": recipient,
                "amount": 1001,
                "transactionType": "SOL"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn submit_relays_and_status_follows_the_ledger() {
        let app = test_app(vec![open_phase("pre-sale", 1000, 1, 1000)]);
        let (wire, signature) = signed_transfer(app.ledger.blockhash());

        let (status, body) = send(
            router(app.state.clone()),
            Method::POST,
            "/api/v1/transactions/submit",
            Some(json!({"signedTransaction": wire})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["signature"], signature.to_string());
        assert_eq!(body["status"], "pending");
        assert_eq!(app.ledger.sent().len(), 1);

        app.ledger.set_signature_status(
            signature,
            LedgerSignatureStatus {
                level: CommitmentLevel::Finalized,
                err: None,
            },
        );
        let uri = format!("/api/v1/transactions/{signature}");
        let (status, record) = send(router(app.state.clone()), Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["status"], "confirmed");
        assert_eq!(record["context"]["kind"], "external");
    }

    #[tokio::test]
    async fn rejected_and_malformed_submissions_are_400() {
        let app = test_app(vec![open_phase("pre-sale", 1000, 1, 1000)]);

        let (status, body) = send(
            router(app.state.clone()),
            Method::POST,
            "/api/v1/transactions/submit",
            Some(json!({"signedTransaction": "%%%"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        app.ledger.reject_sends(Some("Blockhash not found"));
        let (wire, _) = signed_transfer(app.ledger.blockhash());
        let (status, body) = send(
            router(app.state.clone()),
            Method::POST,
            "/api/v1/transactions/submit",
            Some(json!({"signedTransaction": wire})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "TRANSACTION_REJECTED");
    }

    #[tokio::test]
    async fn track_registers_signature_with_context() {
        let app = test_app(vec![open_phase("pre-sale", 1000, 1, 1000)]);
        let signature = Signature::new_unique().to_string();

        let (status, record) = send(
            router(app.state.clone()),
            Method::POST,
            "/api/v1/transactions/track",
            Some(json!({
                "signature": signature,
                "context": {"kind": "purchase", "phaseId": "pre-sale", "amount": "10"}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["status"], "pending");
        assert_eq!(record["context"]["phaseId"], "pre-sale");

        let (status, body) = send(
            router(app.state.clone()),
            Method::POST,
            "/api/v1/transactions/track",
            Some(json!({"signature": "not-a-signature"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }
}
