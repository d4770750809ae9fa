//! Transaction API endpoints

use api_types::transaction::{
    ShippingAddress as ApiAddress, StatusUpdate, TrackingUpdate, TransactionList,
    TransactionListResponse, TransactionNew, TransactionResponse, TransactionStatus as ApiStatus,
    TransactionView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};
use engine::{
    Actor, CreateTransactionCmd, ShippingAddress, TransactionFilter, TransactionSide,
    TransactionStatus, TransitionCmd, UserRole, users,
};

pub(crate) fn actor_for(user: &users::Model) -> Result<Actor, ServerError> {
    let role = UserRole::try_from(user.role.as_str())?;
    Ok(Actor::new(user.id.clone(), role))
}

fn map_status(status: TransactionStatus) -> ApiStatus {
    match status {
        TransactionStatus::Pending => ApiStatus::Pending,
        TransactionStatus::Paid => ApiStatus::Paid,
        TransactionStatus::Shipped => ApiStatus::Shipped,
        TransactionStatus::Delivered => ApiStatus::Delivered,
        TransactionStatus::Completed => ApiStatus::Completed,
        TransactionStatus::Cancelled => ApiStatus::Cancelled,
        TransactionStatus::Disputed => ApiStatus::Disputed,
        TransactionStatus::Refunded => ApiStatus::Refunded,
    }
}

fn parse_status(status: ApiStatus) -> TransactionStatus {
    match status {
        ApiStatus::Pending => TransactionStatus::Pending,
        ApiStatus::Paid => TransactionStatus::Paid,
        ApiStatus::Shipped => TransactionStatus::Shipped,
        ApiStatus::Delivered => TransactionStatus::Delivered,
        ApiStatus::Completed => TransactionStatus::Completed,
        ApiStatus::Cancelled => TransactionStatus::Cancelled,
        ApiStatus::Disputed => TransactionStatus::Disputed,
        ApiStatus::Refunded => TransactionStatus::Refunded,
    }
}

fn map_view(tx: engine::Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        public_id: tx.public_id,
        buyer_id: tx.buyer_id,
        seller_id: tx.seller_id,
        product_id: tx.product_id,
        quantity: tx.quantity,
        unit_price_cents: tx.unit_price_cents,
        shipping_cents: tx.shipping_cents,
        platform_fee_cents: tx.platform_fee_cents,
        total_cents: tx.total_cents,
        escrow_cents: tx.escrow_cents,
        status: map_status(tx.status),
        shipping_address: ApiAddress {
            street: tx.shipping_address.street,
            city: tx.shipping_address.city,
            postal_code: tx.shipping_address.postal_code,
            country: tx.shipping_address.country,
        },
        tracking_number: tx.tracking_number,
        buyer_notes: tx.buyer_notes,
        seller_notes: tx.seller_notes,
        created_at: tx.created_at,
        estimated_delivery_at: tx.estimated_delivery_at,
        delivered_at: tx.delivered_at,
    }
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionResponse>), ServerError> {
    let transaction = state
        .engine
        .create_transaction(CreateTransactionCmd {
            buyer_id: user.id,
            product_id: payload.product_id,
            quantity: payload.quantity,
            shipping_address: ShippingAddress {
                street: payload.shipping_address.street,
                city: payload.shipping_address.city,
                postal_code: payload.shipping_address.postal_code,
                country: payload.shipping_address.country,
            },
            buyer_notes: payload.buyer_notes,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(TransactionResponse {
            message: "Transaction created successfully".to_string(),
            transaction: map_view(transaction),
        }),
    ))
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(payload): Query<TransactionList>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let actor = actor_for(&user)?;
    let side = match payload.side.as_deref() {
        Some("buyer") => Some(TransactionSide::Buyer),
        Some("seller") => Some(TransactionSide::Seller),
        Some(other) => {
            return Err(ServerError::Generic(format!("invalid side: {other}")));
        }
        None => None,
    };
    let filter = TransactionFilter {
        status: payload.status.map(parse_status),
        side,
        from: payload.from,
        to: payload.to,
    };
    let limit = payload.limit.unwrap_or(50);

    let transactions = state.engine.list_transactions(&actor, &filter, limit).await?;

    Ok(Json(TransactionListResponse {
        transactions: transactions.into_iter().map(map_view).collect(),
    }))
}

pub async fn get(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let actor = actor_for(&user)?;
    let transaction = state.engine.transaction(&actor, id).await?;
    Ok(Json(map_view(transaction)))
}

pub async fn update_status(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusUpdate>,
) -> Result<Json<TransactionResponse>, ServerError> {
    let actor = actor_for(&user)?;
    let transaction = state
        .engine
        .transition_transaction(TransitionCmd {
            transaction_id: id,
            actor,
            new_status: parse_status(payload.status),
            notes: payload.notes,
        })
        .await?;

    Ok(Json(TransactionResponse {
        message: "Transaction status updated successfully".to_string(),
        transaction: map_view(transaction),
    }))
}

pub async fn update_tracking(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TrackingUpdate>,
) -> Result<Json<TransactionResponse>, ServerError> {
    let transaction = state
        .engine
        .add_tracking(id, &user.id, &payload.tracking_number)
        .await?;

    Ok(Json(TransactionResponse {
        message: "Tracking number added successfully".to_string(),
        transaction: map_view(transaction),
    }))
}
