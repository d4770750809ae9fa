//! Dispute API endpoints

use api_types::dispute::{
    AssignRequest, DisputeDetail, DisputeKind as ApiKind, DisputeList, DisputeListResponse,
    DisputeNew, DisputeResponse, DisputeStatus as ApiStatus, MessageNew, MessageResponse,
    MessageView, ResolveRequest,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, transactions::actor_for};
use engine::{
    Dispute, DisputeFilter, DisputeKind, DisputeMessage, DisputeStatus, OpenDisputeCmd,
    ResolveDisputeCmd, users,
};

fn map_status(status: DisputeStatus) -> ApiStatus {
    match status {
        DisputeStatus::Open => ApiStatus::Open,
        DisputeStatus::UnderReview => ApiStatus::UnderReview,
        DisputeStatus::Resolved => ApiStatus::Resolved,
    }
}

fn parse_status(status: ApiStatus) -> DisputeStatus {
    match status {
        ApiStatus::Open => DisputeStatus::Open,
        ApiStatus::UnderReview => DisputeStatus::UnderReview,
        ApiStatus::Resolved => DisputeStatus::Resolved,
    }
}

fn map_kind(kind: DisputeKind) -> ApiKind {
    match kind {
        DisputeKind::ProductNotReceived => ApiKind::ProductNotReceived,
        DisputeKind::ProductNotAsDescribed => ApiKind::ProductNotAsDescribed,
        DisputeKind::DamagedProduct => ApiKind::DamagedProduct,
        DisputeKind::SellerNotResponding => ApiKind::SellerNotResponding,
        DisputeKind::Other => ApiKind::Other,
    }
}

fn parse_kind(kind: ApiKind) -> DisputeKind {
    match kind {
        ApiKind::ProductNotReceived => DisputeKind::ProductNotReceived,
        ApiKind::ProductNotAsDescribed => DisputeKind::ProductNotAsDescribed,
        ApiKind::DamagedProduct => DisputeKind::DamagedProduct,
        ApiKind::SellerNotResponding => DisputeKind::SellerNotResponding,
        ApiKind::Other => DisputeKind::Other,
    }
}

fn map_view(dispute: Dispute) -> api_types::dispute::DisputeView {
    api_types::dispute::DisputeView {
        id: dispute.id,
        public_id: dispute.public_id,
        transaction_id: dispute.transaction_id,
        initiator_id: dispute.initiator_id,
        dispute_type: map_kind(dispute.kind),
        title: dispute.title,
        description: dispute.description,
        evidence: dispute.evidence,
        status: map_status(dispute.status),
        assigned_reviewer_id: dispute.assigned_reviewer_id,
        resolution: dispute.resolution,
        resolved_at: dispute.resolved_at,
        created_at: dispute.created_at,
    }
}

fn map_message(message: DisputeMessage) -> MessageView {
    MessageView {
        id: message.id,
        sender_id: message.sender_id,
        message: message.body,
        attachments: message.attachments,
        from_reviewer: message.from_reviewer,
        created_at: message.created_at,
    }
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<DisputeNew>,
) -> Result<(StatusCode, Json<DisputeResponse>), ServerError> {
    let actor = actor_for(&user)?;
    let dispute = state
        .engine
        .open_dispute(OpenDisputeCmd {
            transaction_id: payload.transaction_id,
            actor,
            kind: parse_kind(payload.dispute_type),
            title: payload.title,
            description: payload.description,
            evidence: payload.evidence,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DisputeResponse {
            message: "Dispute created successfully".to_string(),
            dispute: map_view(dispute),
        }),
    ))
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(payload): Query<DisputeList>,
) -> Result<Json<DisputeListResponse>, ServerError> {
    let actor = actor_for(&user)?;
    let filter = DisputeFilter {
        status: payload.status.map(parse_status),
        kind: payload.dispute_type.map(parse_kind),
        assigned_reviewer_id: payload.assigned_reviewer_id,
    };
    let limit = payload.limit.unwrap_or(50);

    let disputes = state.engine.list_disputes(&actor, &filter, limit).await?;

    Ok(Json(DisputeListResponse {
        disputes: disputes.into_iter().map(map_view).collect(),
    }))
}

pub async fn get(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DisputeDetail>, ServerError> {
    let actor = actor_for(&user)?;
    let (dispute, messages) = state.engine.dispute(&actor, id).await?;

    Ok(Json(DisputeDetail {
        dispute: map_view(dispute),
        messages: messages.into_iter().map(map_message).collect(),
    }))
}

pub async fn add_message(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MessageNew>,
) -> Result<(StatusCode, Json<MessageResponse>), ServerError> {
    let actor = actor_for(&user)?;
    let message = state
        .engine
        .add_dispute_message(id, &actor, &payload.message, payload.attachments)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Message added successfully".to_string(),
            dispute_message: map_message(message),
        }),
    ))
}

pub async fn assign(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<DisputeResponse>, ServerError> {
    let actor = actor_for(&user)?;
    let dispute = state
        .engine
        .assign_dispute(id, &actor, payload.assigned_reviewer_id.as_deref())
        .await?;

    Ok(Json(DisputeResponse {
        message: "Dispute assigned successfully".to_string(),
        dispute: map_view(dispute),
    }))
}

pub async fn resolve(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResolveRequest>,
) -> Result<Json<DisputeResponse>, ServerError> {
    let actor = actor_for(&user)?;
    let dispute = state
        .engine
        .resolve_dispute(ResolveDisputeCmd {
            dispute_id: id,
            actor,
            resolution: payload.resolution,
            refund_cents: payload.refund_cents,
        })
        .await?;

    Ok(Json(DisputeResponse {
        message: "Dispute resolved successfully".to_string(),
        dispute: map_view(dispute),
    }))
}
