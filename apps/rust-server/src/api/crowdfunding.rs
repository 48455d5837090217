// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Crowdfunding endpoints.

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
    crowdfunding::{Campaign, NewCampaign},
    error::{ApiError, ErrorBody},
    models::{
        CampaignListResponse, CampaignQuery, ContributeRequest, ContributeResponse,
        CreateCampaignRequest, CreateCampaignResponse,
    },
    state::AppState,
};

/// Get one campaign by id, or list all campaigns.
#[utoipa::path(
    get,
    path = "/api/v1/crowdfunding",
    tag = "Crowdfunding",
    params(CampaignQuery),
    responses(
        (status = 200, description = "Campaign, or all campaigns when no id is given", body = CampaignListResponse),
        (status = 404, description = "Campaign not found", body = ErrorBody)
    )
)]
pub async fn get_campaigns(
    State(state): State<AppState>,
    query: Result<Query<CampaignQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    match query.campaign_id {
        Some(id) => {
            let campaign: Campaign = state.campaigns.get(&id)?;
            Ok(Json(campaign).into_response())
        }
        None => Ok(Json(CampaignListResponse {
            campaigns: state.campaigns.list()?,
        })
        .into_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/crowdfunding/create",
    tag = "Crowdfunding",
    request_body = CreateCampaignRequest,
    responses(
        (status = 201, description = "Campaign created", body = CreateCampaignResponse),
        (status = 400, description = "Invalid campaign", body = ErrorBody)
    )
)]
pub async fn create_campaign(
    State(state): State<AppState>,
    payload: Result<Json<CreateCampaignRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateCampaignResponse>), ApiError> {
    let Json(request) = payload?;

    let campaign = state.campaigns.create(
        NewCampaign {
            name: request.name,
            description: request.description,
            goal: request.goal,
            end_date: request.end_date,
        },
        Utc::now(),
    )?;

    Ok((
        StatusCode::CREATED,
        Json(CreateCampaignResponse {
            success: true,
            campaign_id: campaign.id,
            message: "Campaign created successfully".to_string(),
        }),
    ))
}

/// Build an unsigned contribution into the campaign vault.
#[utoipa::path(
    post,
    path = "/api/v1/crowdfunding/contribute",
    tag = "Crowdfunding",
    request_body = ContributeRequest,
    responses(
        (status = 200, description = "Unsigned contribution created", body = ContributeResponse),
        (status = 400, description = "Campaign ended or invalid request", body = ErrorBody),
        (status = 404, description = "Campaign not found", body = ErrorBody),
        (status = 503, description = "Ledger unavailable", body = ErrorBody)
    )
)]
pub async fn contribute(
    State(state): State<AppState>,
    payload: Result<Json<ContributeRequest>, JsonRejection>,
) -> Result<Json<ContributeResponse>, ApiError> {
    let Json(request) = payload?;

    let prepared = state
        .campaigns
        .contribute(
            &request.campaign_id,
            &request.contributor_address,
            request.amount,
            Utc::now(),
        )
        .await?;

    Ok(Json(ContributeResponse {
        success: true,
        transaction: prepared.transaction.transaction,
        last_valid_block_height: prepared.transaction.last_valid_block_height,
        message: format!("Contribution of {} to {} prepared", request.amount, prepared.campaign.name),
    }))
}
