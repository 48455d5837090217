// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token sale endpoints: phase listing and purchase transactions.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;

use crate::{
    error::{ApiError, ErrorBody},
    models::{PurchaseTokensRequest, PurchaseTokensResponse, SaleOverviewResponse, TokenSaleQuery},
    state::AppState,
};

/// Get one sale phase, or the whole schedule.
///
/// With `?phase=` the phase is returned as a `SalePhase`; without it the
/// response is a `SaleOverviewResponse`.
#[utoipa::path(
    get,
    path = "/api/v1/token-sales",
    tag = "Token Sales",
    params(TokenSaleQuery),
    responses(
        (status = 200, description = "Phase details or sale overview", body = SaleOverviewResponse),
        (status = 404, description = "Unknown phase", body = ErrorBody)
    )
)]
pub async fn get_token_sales(
    State(state): State<AppState>,
    query: Result<Query<TokenSaleQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let now = Utc::now();

    match query.phase {
        Some(phase_id) => Ok(Json(state.engine.phase(&phase_id, now)?).into_response()),
        None => {
            let overview = SaleOverviewResponse::from(state.engine.overview(now)?);
            Ok(Json(overview).into_response())
        }
    }
}

/// Build an unsigned purchase transaction.
///
/// The requested amount is held against the phase supply while the
/// transaction is assembled and consumed once it is built.
#[utoipa::path(
    post,
    path = "/api/v1/token-sales",
    tag = "Token Sales",
    request_body = PurchaseTokensRequest,
    responses(
        (status = 201, description = "Unsigned transaction created", body = PurchaseTokensResponse),
        (status = 400, description = "Purchase rejected", body = ErrorBody),
        (status = 404, description = "Unknown phase", body = ErrorBody),
        (status = 503, description = "Ledger unavailable", body = ErrorBody)
    )
)]
pub async fn purchase_tokens(
    State(state): State<AppState>,
    payload: Result<Json<PurchaseTokensRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PurchaseTokensResponse>), ApiError> {
    let Json(request) = payload?;

    let receipt = state
        .engine
        .purchase(
            request.phase_id.as_deref(),
            &request.wallet_address,
            request.amount,
            Utc::now(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PurchaseTokensResponse {
            transaction: receipt.transaction.transaction,
            phase_id: receipt.phase_id,
            amount: receipt.amount,
            price: receipt.unit_price,
            total_cost: receipt.total_cost,
            remaining_supply: receipt.remaining_supply,
            last_valid_block_height: receipt.transaction.last_valid_block_height,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use crate::api::router;
    use crate::api::test_helpers::{send, send_raw};
    use crate::state::test_support::{open_phase, test_app, BUYER};
    use axum::http::{Method, StatusCode};
    use chrono::Utc;
    use serde_json::json;

    #[tokio::test]
    async fn purchase_returns_transaction_and_updates_supply() {
        let app = test_app(vec![open_phase("pre-sale", 1000, 100, 1000)]);

        let (status, body) = send(
            router(app.state.clone()),
            Method::POST,
            "/api/v1/token-sales",
            Some(json!({"phaseId": "pre-sale", "amount": 250, "walletAddress": BUYER})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["phaseId"], "pre-sale");
        assert_eq!(body["amount"], "250");
        assert_eq!(body["price"], "0.00001");
        assert_eq!(body["totalCost"], "0.0025");
        assert_eq!(body["remainingSupply"], "750");
        assert_eq!(body["lastValidBlockHeight"], app.ledger.last_valid_block_height());
        assert!(body["transaction"].as_str().is_some_and(|t| !t.is_empty()));

        let (_, phase) = send(
            router(app.state.clone()),
            Method::GET,
            "/api/v1/token-sales?phase=pre-sale",
            None,
        )
        .await;
        assert_eq!(phase["remainingSupply"], "750");
        assert_eq!(phase["status"], "active");
    }

    #[tokio::test]
    async fn phase_defaults_to_the_active_one() {
        let app = test_app(vec![open_phase("public-sale", 1000, 1, 1000)]);

        let (status, body) = send(
            router(app.state.clone()),
            Method::POST,
            "/api/v1/token-sales",
            Some(json!({"amount": "10", "walletAddress": BUYER})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["phaseId"], "public-sale");
    }

    #[tokio::test]
    async fn sells_out_then_rejects_with_insufficient_supply() {
        let app = test_app(vec![open_phase("pre-sale", 1000, 100, 1000)]);

        let (status, body) = send(
            router(app.state.clone()),
            Method::POST,
            "/api/v1/token-sales",
            Some(json!({"phaseId": "pre-sale", "amount": 1000, "walletAddress": BUYER})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["remainingSupply"], "0");

        let (status, body) = send(
            router(app.state.clone()),
            Method::POST,
            "/api/v1/token-sales",
            Some(json!({"phaseId": "pre-sale", "amount": 100, "walletAddress": BUYER})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INSUFFICIENT_SUPPLY");
    }

    #[tokio::test]
    async fn rule_violations_carry_codes() {
        let app = test_app(vec![open_phase("pre-sale", 1000, 100, 900)]);
        let cases = [
            (json!({"phaseId": "pre-sale", "amount": 950, "walletAddress": BUYER}), StatusCode::BAD_REQUEST, "ABOVE_MAXIMUM"),
            (json!({"phaseId": "pre-sale", "amount": 50, "walletAddress": BUYER}), StatusCode::BAD_REQUEST, "BELOW_MINIMUM"),
            (json!({"phaseId": "pre-sale", "amount": 200, "walletAddress": "not-a-key"}), StatusCode::BAD_REQUEST, "INVALID_ADDRESS"),
            (json!({"phaseId": "main", "amount": 200, "walletAddress": BUYER}), StatusCode::NOT_FOUND, "PHASE_NOT_FOUND"),
            (json!({"phaseId": "pre-sale", "amount": "-1", "walletAddress": BUYER}), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        ];

        for (request, status, code) in cases {
            let (got_status, body) =
                send(router(app.state.clone()), Method::POST, "/api/v1/token-sales", Some(request)).await;
            assert_eq!(got_status, status, "{code}");
            assert_eq!(body["code"], code);
        }

        let (_, phase) = send(
            router(app.state.clone()),
            Method::GET,
            "/api/v1/token-sales?phase=pre-sale",
            None,
        )
        .await;
        assert_eq!(phase["remainingSupply"], "1000");
    }

    #[tokio::test]
    async fn malformed_amount_is_rejected_before_the_window_check() {
        let mut ended = open_phase("pre-sale", 1000, 1, 1000);
        ended.start_time = Utc::now() - chrono::Duration::days(2);
        ended.end_time = Utc::now() - chrono::Duration::days(1);
        let app = test_app(vec![ended]);

        let (status, body) = send(
            router(app.state.clone()),
            Method::POST,
            "/api/v1/token-sales",
            Some(json!({"phaseId": "pre-sale", "amount": "-5", "walletAddress": BUYER})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, body) = send(
            router(app.state.clone()),
            Method::POST,
            "/api/v1/token-sales",
            Some(json!({"phaseId": "pre-sale", "amount": 5, "walletAddress": BUYER})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "PHASE_INACTIVE");
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let app = test_app(vec![open_phase("pre-sale", 1000, 1, 1000)]);
        let (status, body) = send_raw(
            router(app.state.clone()),
            Method::POST,
            "/api/v1/token-sales",
            Some("{\"amount\": "),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn ledger_outage_is_503_and_keeps_supply() {
        let app = test_app(vec![open_phase("pre-sale", 1000, 1, 1000)]);
        app.ledger.set_offline(true);

        let (status, body) = send(
            router(app.state.clone()),
            Method::POST,
            "/api/v1/token-sales",
            Some(json!({"phaseId": "pre-sale", "amount": 10, "walletAddress": BUYER})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "LEDGER_UNAVAILABLE");

        let (_, phase) = send(
            router(app.state.clone()),
            Method::GET,
            "/api/v1/token-sales?phase=pre-sale",
            None,
        )
        .await;
        assert_eq!(phase["remainingSupply"], "1000");
    }

    #[tokio::test]
    async fn overview_lists_phases_and_totals() {
        let app = test_app(vec![
            open_phase("pre-sale", 1000, 1, 1000),
            open_phase("public-sale", 500, 1, 500),
        ]);

        let (status, body) =
            send(router(app.state.clone()), Method::GET, "/api/v1/token-sales", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phases"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["totalSupply"], "1500");
        assert_eq!(body["sold"], "0");
        assert_eq!(body["activePhaseId"], "pre-sale");

        let (status, body) = send(
            router(app.state.clone()),
            Method::GET,
            "/api/v1/token-sales?phase=missing",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "PHASE_NOT_FOUND");
    }
}
