//! Escrow transaction primitives.
//!
//! A `Transaction` records a purchase between a buyer and a seller, with the
//! full amount notionally held in escrow until delivery is confirmed. Its
//! `status` moves through a fixed state machine; terminal rows are kept for
//! audit and never deleted.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, UserRole};

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

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Disputed => "disputed",
            Self::Refunded => "refunded",
        }
    }

    /// Statuses reachable from `self` via a direct status-update request.
    ///
    /// `disputed` has no outgoing edges here: leaving it is the dispute
    /// resolution's job, which forces `completed` or `refunded` directly.
    pub fn allowed_targets(self) -> &'static [TransactionStatus] {
        match self {
            Self::Pending => &[Self::Paid, Self::Cancelled],
            Self::Paid => &[Self::Shipped, Self::Cancelled],
            Self::Shipped => &[Self::Delivered, Self::Disputed],
            Self::Delivered => &[Self::Completed, Self::Disputed],
            Self::Disputed | Self::Completed | Self::Cancelled | Self::Refunded => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Refunded)
    }

    /// Statuses a dispute may be opened against.
    pub fn dispute_eligible(self) -> bool {
        matches!(self, Self::Shipped | Self::Delivered)
    }

    /// Whether a non-privileged participant may request this target status.
    ///
    /// Reviewers are not restricted; buyers and sellers each own a fixed
    /// subset of the transitions.
    pub fn requestable_by(self, role: UserRole) -> bool {
        match role {
            UserRole::Buyer => {
                matches!(self, Self::Paid | Self::Delivered | Self::Disputed)
            }
            UserRole::Seller => matches!(self, Self::Shipped),
            UserRole::Admin | UserRole::SuperAdmin => true,
        }
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "disputed" => Ok(Self::Disputed),
            "refunded" => Ok(Self::Refunded),
            other => Err(EngineError::Validation(format!(
                "invalid transaction status: {other}"
            ))),
        }
    }
}

/// Structured shipping address, stored as JSON in a single column.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    /// Human-facing opaque identifier (`TXN-…`), distinct from the row key.
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

impl Transaction {
    pub fn new_public_id(now: DateTime<Utc>) -> String {
        let suffix: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(8)
            .collect::<String>()
            .to_uppercase();
        format!("TXN-{}-{}", now.timestamp_millis(), suffix)
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
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
    pub status: String,
    pub shipping_address: String,
    pub tracking_number: Option<String>,
    pub buyer_notes: Option<String>,
    pub seller_notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub estimated_delivery_at: Option<DateTimeUtc>,
    pub delivered_at: Option<DateTimeUtc>,
}

impl Model {
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }

    pub fn status(&self) -> ResultEngine<TransactionStatus> {
        TransactionStatus::try_from(self.status.as_str())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::ProductId",
        to = "super::products::Column::Id"
    )]
    Products,
    #[sea_orm(has_many = "super::disputes::Entity")]
    Disputes,
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl Related<super::disputes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Disputes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            public_id: ActiveValue::Set(tx.public_id.clone()),
            buyer_id: ActiveValue::Set(tx.buyer_id.clone()),
            seller_id: ActiveValue::Set(tx.seller_id.clone()),
            product_id: ActiveValue::Set(tx.product_id.clone()),
            quantity: ActiveValue::Set(tx.quantity),
            unit_price_cents: ActiveValue::Set(tx.unit_price_cents),
            shipping_cents: ActiveValue::Set(tx.shipping_cents),
            platform_fee_cents: ActiveValue::Set(tx.platform_fee_cents),
            total_cents: ActiveValue::Set(tx.total_cents),
            escrow_cents: ActiveValue::Set(tx.escrow_cents),
            status: ActiveValue::Set(tx.status.as_str().to_string()),
            shipping_address: ActiveValue::Set(
                serde_json::to_string(&tx.shipping_address).unwrap_or_default(),
            ),
            tracking_number: ActiveValue::Set(tx.tracking_number.clone()),
            buyer_notes: ActiveValue::Set(tx.buyer_notes.clone()),
            seller_notes: ActiveValue::Set(tx.seller_notes.clone()),
            created_at: ActiveValue::Set(tx.created_at),
            estimated_delivery_at: ActiveValue::Set(tx.estimated_delivery_at),
            delivered_at: ActiveValue::Set(tx.delivered_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("transaction not exists".to_string()))?,
            public_id: model.public_id,
            buyer_id: model.buyer_id,
            seller_id: model.seller_id,
            product_id: model.product_id,
            quantity: model.quantity,
            unit_price_cents: model.unit_price_cents,
            shipping_cents: model.shipping_cents,
            platform_fee_cents: model.platform_fee_cents,
            total_cents: model.total_cents,
            escrow_cents: model.escrow_cents,
            status: TransactionStatus::try_from(model.status.as_str())?,
            shipping_address: serde_json::from_str(&model.shipping_address).unwrap_or_default(),
            tracking_number: model.tracking_number,
            buyer_notes: model.buyer_notes,
            seller_notes: model.seller_notes,
            created_at: model.created_at,
            estimated_delivery_at: model.estimated_delivery_at,
            delivered_at: model.delivered_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_matches_workflow() {
        use TransactionStatus::*;

        assert_eq!(Pending.allowed_targets(), &[Paid, Cancelled]);
        assert_eq!(Paid.allowed_targets(), &[Shipped, Cancelled]);
        assert_eq!(Shipped.allowed_targets(), &[Delivered, Disputed]);
        assert_eq!(Delivered.allowed_targets(), &[Completed, Disputed]);
        for terminal in [Completed, Cancelled, Refunded] {
            assert!(terminal.allowed_targets().is_empty());
            assert!(terminal.is_terminal());
        }
        // Leaving `disputed` is reserved to dispute resolution.
        assert!(Disputed.allowed_targets().is_empty());
        assert!(!Disputed.is_terminal());
    }

    #[test]
    fn role_restrictions() {
        use TransactionStatus::*;

        for status in [Paid, Delivered, Disputed] {
            assert!(status.requestable_by(UserRole::Buyer));
        }
        assert!(!Shipped.requestable_by(UserRole::Buyer));
        assert!(Shipped.requestable_by(UserRole::Seller));
        assert!(!Paid.requestable_by(UserRole::Seller));
        assert!(Cancelled.requestable_by(UserRole::Admin));
        assert!(Completed.requestable_by(UserRole::SuperAdmin));
    }

    #[test]
    fn dispute_eligibility() {
        use TransactionStatus::*;

        assert!(Shipped.dispute_eligible());
        assert!(Delivered.dispute_eligible());
        for status in [Pending, Paid, Completed, Cancelled, Disputed, Refunded] {
            assert!(!status.dispute_eligible());
        }
    }

    #[test]
    fn public_id_shape() {
        let id = Transaction::new_public_id(Utc::now());
        assert!(id.starts_with("TXN-"));
        assert_eq!(id.split('-').count(), 3);
    }
}
