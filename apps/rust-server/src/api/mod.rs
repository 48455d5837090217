// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    blockchain::{PaymentMethod, TransferAsset},
    confirmation::{ConfirmationRecord, ConfirmationStatus, TrackingContext, TransactionKind},
    crowdfunding::Campaign,
    error::ErrorBody,
    models::{
        CampaignListResponse, ContributeRequest, ContributeResponse, CreateCampaignRequest,
        CreateCampaignResponse, CreateTransactionRequest, CreateTransactionResponse,
        PaymentRequest, PurchaseTokensRequest, PurchaseTokensResponse, SaleOverviewResponse,
        SubmitTransactionRequest, SubmitTransactionResponse, TrackTransactionRequest,
        UnsignedTransactionResponse,
    },
    sale::{PhaseStatus, SalePhase},
    state::AppState,
};

pub mod crowdfunding;
pub mod health;
pub mod payments;
pub mod token_sales;
pub mod transactions;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route(
            "/token-sales",
            get(token_sales::get_token_sales).post(token_sales::purchase_tokens),
        )
        .route("/crowdfunding", get(crowdfunding::get_campaigns))
        .route("/crowdfunding/create", post(crowdfunding::create_campaign))
        .route("/crowdfunding/contribute", post(crowdfunding::contribute))
        .route("/payments", post(payments::create_payment))
        .route("/transactions/create", post(transactions::create_transaction))
        .route("/transactions/submit", post(transactions::submit_transaction))
        .route("/transactions/track", post(transactions::track_transaction))
        .route("/transactions/{signature}", get(transactions::get_transaction))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .nest("/api/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        token_sales::get_token_sales,
        token_sales::purchase_tokens,
        crowdfunding::get_campaigns,
        crowdfunding::create_campaign,
        crowdfunding::contribute,
        payments::create_payment,
        transactions::create_transaction,
        transactions::submit_transaction,
        transactions::track_transaction,
        transactions::get_transaction,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            ErrorBody,
            SalePhase,
            PhaseStatus,
            SaleOverviewResponse,
            PurchaseTokensRequest,
            PurchaseTokensResponse,
            Campaign,
            CampaignListResponse,
            CreateCampaignRequest,
            CreateCampaignResponse,
            ContributeRequest,
            ContributeResponse,
            PaymentMethod,
            PaymentRequest,
            UnsignedTransactionResponse,
            TransferAsset,
            CreateTransactionRequest,
            CreateTransactionResponse,
            SubmitTransactionRequest,
            SubmitTransactionResponse,
            TrackTransactionRequest,
            ConfirmationRecord,
            ConfirmationStatus,
            TrackingContext,
            TransactionKind,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks
        )
    ),
    tags(
        (name = "Token Sales", description = "Sale phases and purchase transactions"),
        (name = "Crowdfunding", description = "Campaigns and contributions"),
        (name = "Payments", description = "Fixed-rate SOL/USDC payments"),
        (name = "Transactions", description = "Transfers, relay and confirmation tracking"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
