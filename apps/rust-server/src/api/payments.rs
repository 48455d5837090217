// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::{
    blockchain::{parse_pubkey, transactions::within, PaymentMethod},
    error::{ApiError, ErrorBody},
    models::{check_direct_amount, PaymentRequest, UnsignedTransactionResponse},
    sale::SaleError,
    state::AppState,
};

/// Build an unsigned fixed-rate payment.
///
/// The payer sends SOL or USDC to the treasury and receives sale tokens at
/// the configured rate in the same transaction.
#[utoipa::path(
    post,
    path = "/api/v1/payments",
    tag = "Payments",
    request_body = PaymentRequest,
    responses(
        (status = 200, description = "Unsigned payment created", body = UnsignedTransactionResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 503, description = "Ledger unavailable", body = ErrorBody)
    )
)]
pub async fn create_payment(
    State(state): State<AppState>,
    payload: Result<Json<PaymentRequest>, JsonRejection>,
) -> Result<Json<UnsignedTransactionResponse>, ApiError> {
    let Json(request) = payload?;
    check_direct_amount(request.amount).map_err(ApiError::bad_request)?;
    let payer = parse_pubkey("publicKey", &request.public_key).map_err(SaleError::from)?;

    let unsigned = within(
        state.config.ledger.build_timeout,
        state.builder.build_payment(&payer, request.payment_method, request.amount),
    )
    .await?;

    let asset = match request.payment_method {
        PaymentMethod::Sol => "SOL",
        PaymentMethod::Usdc => "USDC",
    };
    tracing::info!(payer = %payer, asset, amount = %request.amount, "Payment transaction built");

    Ok(Json(UnsignedTransactionResponse::new(
        unsigned,
        "Transaction created successfully",
    )))
}
