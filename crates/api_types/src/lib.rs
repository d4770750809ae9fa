//! Shared request/response bodies for the marketplace HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionStatus {
        Pending,
        Paid,
        Shipped,
        Delivered,
        Completed,
        Cancelled,
        Disputed,
        Refunded,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ShippingAddress {
        pub street: String,
        pub city: String,
        pub postal_code: String,
        pub country: String,
    }

    /// Request body for opening a purchase.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub product_id: String,
        pub quantity: i32,
        pub shipping_address: ShippingAddress,
        pub buyer_notes: Option<String>,
    }

    /// Request body for a status-update request.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct StatusUpdate {
        pub status: TransactionStatus,
        /// Absent means "keep the stored notes"; never an implicit clear.
        pub notes: Option<String>,
    }

    /// Request body for recording a shipment.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TrackingUpdate {
        pub tracking_number: String,
    }

    /// Query parameters for listing transactions.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionList {
        pub status: Option<TransactionStatus>,
        /// `"buyer"` or `"seller"`; absent means both sides.
        pub side: Option<String>,
        pub from: Option<DateTime<Utc>>,
        pub to: Option<DateTime<Utc>>,
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub public_id: String,
        pub buyer_id: String,
        pub seller_id: String,
        pub product_id: String,
        pub quantity: i32,
        pub unit_price_cents: i64,
        pub shipping_cents: i64,
        pub platform_fee_cents: i64,
        pub total_cents: i64,
        pub escrow_cents: i64,
        pub status: TransactionStatus,
        pub shipping_address: ShippingAddress,
        pub tracking_number: Option<String>,
        pub buyer_notes: Option<String>,
        pub seller_notes: Option<String>,
        pub created_at: DateTime<Utc>,
        pub estimated_delivery_at: Option<DateTime<Utc>>,
        pub delivered_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionResponse {
        pub message: String,
        pub transaction: TransactionView,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
    }
}

pub mod dispute {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum DisputeStatus {
        Open,
        UnderReview,
        Resolved,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum DisputeKind {
        ProductNotReceived,
        ProductNotAsDescribed,
        DamagedProduct,
        SellerNotResponding,
        Other,
    }

    /// Request body for opening a dispute.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct DisputeNew {
        pub transaction_id: Uuid,
        pub dispute_type: DisputeKind,
        pub title: String,
        pub description: String,
        #[serde(default)]
        pub evidence: Vec<String>,
    }

    /// Request body for posting to a dispute thread.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MessageNew {
        pub message: String,
        #[serde(default)]
        pub attachments: Vec<String>,
    }

    /// Request body for starting review of a dispute.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AssignRequest {
        /// Absent moves the dispute to `under_review` without an assignee.
        #[serde(default)]
        pub assigned_reviewer_id: Option<String>,
    }

    /// Request body for resolving a dispute.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ResolveRequest {
        pub resolution: String,
        /// Cents returned to the buyer; `0` or absent releases the escrow to
        /// the seller.
        #[serde(default)]
        pub refund_cents: i64,
        /// Recorded for the audit trail; the refund amount alone decides the
        /// final transaction status.
        #[serde(default)]
        pub refund_to_buyer: Option<bool>,
    }

    /// Query parameters for listing disputes.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct DisputeList {
        pub status: Option<DisputeStatus>,
        pub dispute_type: Option<DisputeKind>,
        pub assigned_reviewer_id: Option<String>,
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DisputeView {
        pub id: Uuid,
        pub public_id: String,
        pub transaction_id: Uuid,
        pub initiator_id: String,
        pub dispute_type: DisputeKind,
        pub title: String,
        pub description: String,
        pub evidence: Vec<String>,
        pub status: DisputeStatus,
        pub assigned_reviewer_id: Option<String>,
        pub resolution: Option<String>,
        pub resolved_at: Option<DateTime<Utc>>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MessageView {
        pub id: Uuid,
        pub sender_id: String,
        pub message: String,
        pub attachments: Vec<String>,
        pub from_reviewer: bool,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DisputeResponse {
        pub message: String,
        pub dispute: DisputeView,
    }

    /// One dispute with its ordered message thread.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct DisputeDetail {
        pub dispute: DisputeView,
        pub messages: Vec<MessageView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DisputeListResponse {
        pub disputes: Vec<DisputeView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MessageResponse {
        pub message: String,
        pub dispute_message: MessageView,
    }
}
