//! Dispute primitives.
//!
//! A `Dispute` interrupts an escrow transaction: opening one forces the
//! parent transaction to `disputed`, resolving one forces it to `completed`
//! or `refunded`. At most one dispute per transaction may be active (`open`
//! or `under_review`) at a time; the schema enforces this with a partial
//! unique index.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    UnderReview,
    Resolved,
}

impl DisputeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::UnderReview => "under_review",
            Self::Resolved => "resolved",
        }
    }

    /// Active disputes block new disputes on the same transaction and still
    /// accept messages.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Open | Self::UnderReview)
    }
}

impl TryFrom<&str> for DisputeStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "open" => Ok(Self::Open),
            "under_review" => Ok(Self::UnderReview),
            "resolved" => Ok(Self::Resolved),
            other => Err(EngineError::Validation(format!(
                "invalid dispute status: {other}"
            ))),
        }
    }
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

impl DisputeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProductNotReceived => "product_not_received",
            Self::ProductNotAsDescribed => "product_not_as_described",
            Self::DamagedProduct => "damaged_product",
            Self::SellerNotResponding => "seller_not_responding",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for DisputeKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "product_not_received" => Ok(Self::ProductNotReceived),
            "product_not_as_described" => Ok(Self::ProductNotAsDescribed),
            "damaged_product" => Ok(Self::DamagedProduct),
            "seller_not_responding" => Ok(Self::SellerNotResponding),
            "other" => Ok(Self::Other),
            other => Err(EngineError::Validation(format!(
                "invalid dispute type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dispute {
    pub id: Uuid,
    /// Human-facing opaque identifier (`DSP-…`).
    pub public_id: String,
    pub transaction_id: Uuid,
    pub initiator_id: String,
    pub kind: DisputeKind,
    pub title: String,
    pub description: String,
    /// Opaque evidence references (uploaded file ids, URLs); unordered.
    pub evidence: Vec<String>,
    pub status: DisputeStatus,
    pub assigned_reviewer_id: Option<String>,
    pub resolution: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Dispute {
    pub fn new_public_id(now: DateTime<Utc>) -> String {
        let suffix: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(8)
            .collect::<String>()
            .to_uppercase();
        format!("DSP-{}-{}", now.timestamp_millis(), suffix)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "disputes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub public_id: String,
    pub transaction_id: String,
    pub initiator_id: String,
    pub kind: String,
    pub title: String,
    pub description: String,
    pub evidence: String,
    pub status: String,
    pub assigned_reviewer_id: Option<String>,
    pub resolution: Option<String>,
    pub resolved_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

impl Model {
    pub fn status(&self) -> Result<DisputeStatus, EngineError> {
        DisputeStatus::try_from(self.status.as_str())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::TransactionId",
        to = "super::transactions::Column::Id"
    )]
    Transactions,
    #[sea_orm(has_many = "super::dispute_messages::Entity")]
    DisputeMessages,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::dispute_messages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DisputeMessages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Dispute> for ActiveModel {
    fn from(dispute: &Dispute) -> Self {
        Self {
            id: ActiveValue::Set(dispute.id.to_string()),
            public_id: ActiveValue::Set(dispute.public_id.clone()),
            transaction_id: ActiveValue::Set(dispute.transaction_id.to_string()),
            initiator_id: ActiveValue::Set(dispute.initiator_id.clone()),
            kind: ActiveValue::Set(dispute.kind.as_str().to_string()),
            title: ActiveValue::Set(dispute.title.clone()),
            description: ActiveValue::Set(dispute.description.clone()),
            evidence: ActiveValue::Set(
                serde_json::to_string(&dispute.evidence).unwrap_or_else(|_| "[]".to_string()),
            ),
            status: ActiveValue::Set(dispute.status.as_str().to_string()),
            assigned_reviewer_id: ActiveValue::Set(dispute.assigned_reviewer_id.clone()),
            resolution: ActiveValue::Set(dispute.resolution.clone()),
            resolved_at: ActiveValue::Set(dispute.resolved_at),
            created_at: ActiveValue::Set(dispute.created_at),
        }
    }
}

impl TryFrom<Model> for Dispute {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("dispute not exists".to_string()))?,
            public_id: model.public_id,
            transaction_id: Uuid::parse_str(&model.transaction_id)
                .map_err(|_| EngineError::KeyNotFound("transaction not exists".to_string()))?,
            initiator_id: model.initiator_id,
            kind: DisputeKind::try_from(model.kind.as_str())?,
            title: model.title,
            description: model.description,
            evidence: serde_json::from_str(&model.evidence).unwrap_or_default(),
            status: DisputeStatus::try_from(model.status.as_str())?,
            assigned_reviewer_id: model.assigned_reviewer_id,
            resolution: model.resolution,
            resolved_at: model.resolved_at,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_statuses() {
        assert!(DisputeStatus::Open.is_active());
        assert!(DisputeStatus::UnderReview.is_active());
        assert!(!DisputeStatus::Resolved.is_active());
    }

    #[test]
    fn kind_round_trips_canonical_strings() {
        for kind in [
            DisputeKind::ProductNotReceived,
            DisputeKind::ProductNotAsDescribed,
            DisputeKind::DamagedProduct,
            DisputeKind::SellerNotResponding,
            DisputeKind::Other,
        ] {
            assert_eq!(DisputeKind::try_from(kind.as_str()).unwrap(), kind);
        }
    }
}
