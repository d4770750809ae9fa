//! Dispute message thread.
//!
//! Messages are append-only and ordered by creation time within a dispute.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisputeMessage {
    pub id: Uuid,
    pub dispute_id: Uuid,
    pub sender_id: String,
    pub body: String,
    /// Opaque attachment references; unordered.
    pub attachments: Vec<String>,
    /// Set when the sender acted as a reviewer.
    pub from_reviewer: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "dispute_messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub dispute_id: String,
    pub sender_id: String,
    pub body: String,
    pub attachments: String,
    pub from_reviewer: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::disputes::Entity",
        from = "Column::DisputeId",
        to = "super::disputes::Column::Id"
    )]
    Disputes,
}

impl Related<super::disputes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Disputes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&DisputeMessage> for ActiveModel {
    fn from(message: &DisputeMessage) -> Self {
        Self {
            id: ActiveValue::Set(message.id.to_string()),
            dispute_id: ActiveValue::Set(message.dispute_id.to_string()),
            sender_id: ActiveValue::Set(message.sender_id.clone()),
            body: ActiveValue::Set(message.body.clone()),
            attachments: ActiveValue::Set(
                serde_json::to_string(&message.attachments).unwrap_or_else(|_| "[]".to_string()),
            ),
            from_reviewer: ActiveValue::Set(message.from_reviewer),
            created_at: ActiveValue::Set(message.created_at),
        }
    }
}

impl TryFrom<Model> for DisputeMessage {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("message not exists".to_string()))?,
            dispute_id: Uuid::parse_str(&model.dispute_id)
                .map_err(|_| EngineError::KeyNotFound("dispute not exists".to_string()))?,
            sender_id: model.sender_id,
            body: model.body,
            attachments: serde_json::from_str(&model.attachments).unwrap_or_default(),
            from_reviewer: model.from_reviewer,
            created_at: model.created_at,
        })
    }
}
