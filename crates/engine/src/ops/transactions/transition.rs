use chrono::{Duration, Utc};
use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    Actor, EngineError, NotificationCategory, Patch, ResultEngine, Transaction, TransactionStatus,
    UserRole, transactions,
};

use super::super::{Engine, normalize_required_text, notify::NotificationNew, with_tx};

/// Days between shipping confirmation and the estimated delivery date.
const DELIVERY_ESTIMATE_DAYS: i64 = 7;

/// A request to move a transaction to a new status.
#[derive(Clone, Debug)]
pub struct TransitionCmd {
    pub transaction_id: Uuid,
    pub actor: Actor,
    pub new_status: TransactionStatus,
    pub notes: Option<String>,
}

fn status_message(status: TransactionStatus) -> Option<&'static str> {
    match status {
        TransactionStatus::Paid => Some("Payment received for your order"),
        TransactionStatus::Shipped => Some("Your order has been shipped"),
        TransactionStatus::Delivered => Some("Your order has been delivered"),
        TransactionStatus::Completed => Some("Transaction completed successfully"),
        TransactionStatus::Cancelled => Some("Transaction has been cancelled"),
        TransactionStatus::Disputed => Some("A dispute has been opened for this transaction"),
        TransactionStatus::Pending | TransactionStatus::Refunded => None,
    }
}

impl Engine {
    /// Moves a transaction along the status workflow.
    ///
    /// The write is a compare-and-set against the status the caller was shown:
    /// if another request moved the row first, this one fails instead of
    /// silently overwriting.
    pub async fn transition_transaction(&self, cmd: TransitionCmd) -> ResultEngine<Transaction> {
        let now = Utc::now();
        let (transaction, counterparty_note) = with_tx!(self, |db_tx| {
            let model = self.require_transaction(&db_tx, cmd.transaction_id).await?;
            self.require_transaction_access(&model, &cmd.actor)?;

            let current = model.status()?;
            if !current.allowed_targets().contains(&cmd.new_status) {
                return Err(EngineError::InvalidTransition(format!(
                    "cannot move from {} to {}",
                    current.as_str(),
                    cmd.new_status.as_str()
                )));
            }

            let is_buyer = model.buyer_id == cmd.actor.id;
            if !cmd.actor.role.is_reviewer() {
                let side_matches = match cmd.actor.role {
                    UserRole::Buyer => is_buyer,
                    UserRole::Seller => model.seller_id == cmd.actor.id,
                    UserRole::Admin | UserRole::SuperAdmin => true,
                };
                if !side_matches || !cmd.new_status.requestable_by(cmd.actor.role) {
                    return Err(EngineError::Forbidden(format!(
                        "role {} cannot set status {}",
                        cmd.actor.role.as_str(),
                        cmd.new_status.as_str()
                    )));
                }
            }

            let notes = Patch::from(
                cmd.notes
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| Some(s.to_string())),
            );

            let mut patch = transactions::ActiveModel {
                status: ActiveValue::Set(cmd.new_status.as_str().to_string()),
                ..Default::default()
            };
            if is_buyer {
                patch.buyer_notes = notes.into_active_value();
            } else {
                patch.seller_notes = notes.into_active_value();
            }
            match cmd.new_status {
                TransactionStatus::Shipped => {
                    patch.estimated_delivery_at =
                        ActiveValue::Set(Some(now + Duration::days(DELIVERY_ESTIMATE_DAYS)));
                }
                TransactionStatus::Delivered => {
                    patch.delivered_at = ActiveValue::Set(Some(now));
                }
                _ => {}
            }
            let updated = transactions::Entity::update_many()
                .set(patch)
                .filter(transactions::Column::Id.eq(model.id.clone()))
                .filter(transactions::Column::Status.eq(current.as_str()))
                .exec(&db_tx)
                .await?;
            if updated.rows_affected == 0 {
                return Err(EngineError::InvalidTransition(format!(
                    "transaction left {} concurrently",
                    current.as_str()
                )));
            }

            let refreshed = self.require_transaction(&db_tx, cmd.transaction_id).await?;
            let recipient_id = if is_buyer {
                refreshed.seller_id.clone()
            } else {
                refreshed.buyer_id.clone()
            };
            let note = status_message(cmd.new_status).map(|message| NotificationNew {
                recipient_id,
                title: "Transaction Update".to_string(),
                message: message.to_string(),
                category: NotificationCategory::Transaction,
                action_ref: Some(refreshed.public_id.clone()),
            });

            Ok((Transaction::try_from(refreshed)?, note))
        })?;

        if let Some(note) = counterparty_note {
            self.notify(note).await;
        }

        tracing::info!(
            public_id = %transaction.public_id,
            status = transaction.status.as_str(),
            "transaction status updated"
        );

        Ok(transaction)
    }

    /// Records a tracking number and marks the order shipped in one step.
    ///
    /// Only the transaction's seller can do this, and only while the order is
    /// `paid`.
    pub async fn add_tracking(
        &self,
        transaction_id: Uuid,
        seller_id: &str,
        tracking_number: &str,
    ) -> ResultEngine<Transaction> {
        let tracking = normalize_required_text(tracking_number, "tracking number")?;
        let now = Utc::now();
        let (transaction, buyer_note) = with_tx!(self, |db_tx| {
            let model = transactions::Entity::find_by_id(transaction_id.to_string())
                .filter(transactions::Column::SellerId.eq(seller_id.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;

            if model.status()? != TransactionStatus::Paid {
                return Err(EngineError::InvalidState(
                    "tracking can only be added to paid transactions".to_string(),
                ));
            }

            let updated = transactions::Entity::update_many()
                .col_expr(
                    transactions::Column::TrackingNumber,
                    Expr::value(tracking.clone()),
                )
                .col_expr(
                    transactions::Column::Status,
                    Expr::value(TransactionStatus::Shipped.as_str()),
                )
                .col_expr(
                    transactions::Column::EstimatedDeliveryAt,
                    Expr::value(now + Duration::days(DELIVERY_ESTIMATE_DAYS)),
                )
                .filter(transactions::Column::Id.eq(model.id.clone()))
                .filter(transactions::Column::Status.eq(TransactionStatus::Paid.as_str()))
                .exec(&db_tx)
                .await?;
            if updated.rows_affected == 0 {
                return Err(EngineError::InvalidState(
                    "transaction is no longer paid".to_string(),
                ));
            }

            let refreshed = self.require_transaction(&db_tx, transaction_id).await?;
            let note = NotificationNew {
                recipient_id: refreshed.buyer_id.clone(),
                title: "Order Shipped".to_string(),
                message: format!("Your order has been shipped, tracking number {tracking}"),
                category: NotificationCategory::Transaction,
                action_ref: Some(refreshed.public_id.clone()),
            };

            Ok((Transaction::try_from(refreshed)?, note))
        })?;

        self.notify(buyer_note).await;

        Ok(transaction)
    }
}
