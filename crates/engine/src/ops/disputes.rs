//! Dispute lifecycle operations.
//!
//! Opening a dispute freezes the parent transaction at `disputed`; resolving
//! it is the only way out, forcing `completed` or `refunded` directly. The
//! one-active-dispute rule is enforced twice: a friendly pre-check for the
//! common case, and the partial unique index for the race.

use chrono::Utc;
use sea_orm::{
    Condition, QueryFilter, QueryOrder, QuerySelect, SqlErr, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Actor, Dispute, DisputeKind, DisputeMessage, DisputeStatus, EngineError, NotificationCategory,
    ResultEngine, TransactionStatus, dispute_messages, disputes, money, transactions,
};

use super::{Engine, normalize_required_text, notify::NotificationNew, with_tx};

/// Everything needed to open a dispute against a transaction.
#[derive(Clone, Debug)]
pub struct OpenDisputeCmd {
    pub transaction_id: Uuid,
    pub actor: Actor,
    pub kind: DisputeKind,
    pub title: String,
    pub description: String,
    pub evidence: Vec<String>,
}

/// A reviewer's verdict on a dispute.
#[derive(Clone, Debug)]
pub struct ResolveDisputeCmd {
    pub dispute_id: Uuid,
    pub actor: Actor,
    pub resolution: String,
    /// Cents returned to the buyer; `0` releases the escrow to the seller.
    pub refund_cents: i64,
}

/// Typed listing criteria for disputes.
#[derive(Clone, Debug, Default)]
pub struct DisputeFilter {
    pub status: Option<DisputeStatus>,
    pub kind: Option<DisputeKind>,
    pub assigned_reviewer_id: Option<String>,
}

impl Engine {
    /// Opens a dispute and moves the parent transaction to `disputed`.
    pub async fn open_dispute(&self, cmd: OpenDisputeCmd) -> ResultEngine<Dispute> {
        let title = normalize_required_text(&cmd.title, "title")?;
        let description = normalize_required_text(&cmd.description, "description")?;
        let now = Utc::now();

        let (dispute, notes) = with_tx!(self, |db_tx| {
            let tx_model = self.require_transaction(&db_tx, cmd.transaction_id).await?;
            if !tx_model.is_participant(&cmd.actor.id) {
                return Err(EngineError::Forbidden(
                    "not part of this transaction".to_string(),
                ));
            }

            let current = tx_model.status()?;
            if !current.dispute_eligible() {
                return Err(EngineError::InvalidState(
                    "disputes can only be opened for shipped or delivered transactions"
                        .to_string(),
                ));
            }

            let active_exists = disputes::Entity::find()
                .filter(disputes::Column::TransactionId.eq(tx_model.id.clone()))
                .filter(disputes::Column::Status.is_in([
                    DisputeStatus::Open.as_str(),
                    DisputeStatus::UnderReview.as_str(),
                ]))
                .one(&db_tx)
                .await?
                .is_some();
            if active_exists {
                return Err(EngineError::Conflict(
                    "an active dispute already exists for this transaction".to_string(),
                ));
            }

            let dispute = Dispute {
                id: Uuid::new_v4(),
                public_id: Dispute::new_public_id(now),
                transaction_id: cmd.transaction_id,
                initiator_id: cmd.actor.id.clone(),
                kind: cmd.kind,
                title,
                description,
                evidence: cmd.evidence.clone(),
                status: DisputeStatus::Open,
                assigned_reviewer_id: None,
                resolution: None,
                resolved_at: None,
                created_at: now,
            };

            let model: disputes::ActiveModel = (&dispute).into();
            // The partial unique index closes the race the pre-check leaves
            // open.
            if let Err(err) = model.insert(&db_tx).await {
                if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                    return Err(EngineError::Conflict(
                        "an active dispute already exists for this transaction".to_string(),
                    ));
                }
                return Err(err.into());
            }

            let frozen = transactions::Entity::update_many()
                .col_expr(
                    transactions::Column::Status,
                    Expr::value(TransactionStatus::Disputed.as_str()),
                )
                .filter(transactions::Column::Id.eq(tx_model.id.clone()))
                .filter(transactions::Column::Status.eq(current.as_str()))
                .exec(&db_tx)
                .await?;
            if frozen.rows_affected == 0 {
                return Err(EngineError::InvalidState(
                    "transaction status changed while opening the dispute".to_string(),
                ));
            }

            let counterparty_id = if tx_model.buyer_id == cmd.actor.id {
                tx_model.seller_id.clone()
            } else {
                tx_model.buyer_id.clone()
            };
            let mut notes = vec![NotificationNew {
                recipient_id: counterparty_id,
                title: "Dispute Opened".to_string(),
                message: "A dispute has been opened for this transaction".to_string(),
                category: NotificationCategory::Dispute,
                action_ref: Some(dispute.public_id.clone()),
            }];
            for reviewer in self.active_reviewers(&db_tx).await? {
                notes.push(NotificationNew {
                    recipient_id: reviewer.id,
                    title: "New Dispute".to_string(),
                    message: format!("Dispute {} awaits review", dispute.public_id),
                    category: NotificationCategory::Dispute,
                    action_ref: Some(dispute.public_id.clone()),
                });
            }

            Ok((dispute, notes))
        })?;

        self.notify_all(notes).await;

        tracing::info!(
            public_id = %dispute.public_id,
            kind = dispute.kind.as_str(),
            "dispute opened"
        );

        Ok(dispute)
    }

    /// Appends a message to an active dispute's thread.
    pub async fn add_dispute_message(
        &self,
        dispute_id: Uuid,
        actor: &Actor,
        body: &str,
        attachments: Vec<String>,
    ) -> ResultEngine<DisputeMessage> {
        let body = normalize_required_text(body, "message")?;
        let now = Utc::now();

        let (message, notes) = with_tx!(self, |db_tx| {
            let (dispute, tx_model) = self.require_dispute(&db_tx, dispute_id).await?;
            self.require_transaction_access(&tx_model, actor)?;

            if !dispute.status()?.is_active() {
                return Err(EngineError::InvalidState(
                    "cannot add messages to closed disputes".to_string(),
                ));
            }

            let message = DisputeMessage {
                id: Uuid::new_v4(),
                dispute_id,
                sender_id: actor.id.clone(),
                body,
                attachments,
                from_reviewer: actor.role.is_reviewer(),
                created_at: now,
            };
            let model: dispute_messages::ActiveModel = (&message).into();
            model.insert(&db_tx).await?;

            let mut recipients = vec![tx_model.buyer_id.clone(), tx_model.seller_id.clone()];
            if let Some(reviewer_id) = dispute.assigned_reviewer_id.clone() {
                recipients.push(reviewer_id);
            }
            let notes: Vec<NotificationNew> = recipients
                .into_iter()
                .filter(|recipient| recipient != &actor.id)
                .map(|recipient_id| NotificationNew {
                    recipient_id,
                    title: "New Dispute Message".to_string(),
                    message: format!("New message in dispute {}", dispute.public_id),
                    category: NotificationCategory::Dispute,
                    action_ref: Some(dispute.public_id.clone()),
                })
                .collect();

            Ok((message, notes))
        })?;

        self.notify_all(notes).await;

        Ok(message)
    }

    /// Moves an open dispute to `under_review`, optionally pinning it to a
    /// specific active reviewer.
    ///
    /// Without an assignee the dispute still leaves the `open` queue; any
    /// reviewer can pick it up later.
    pub async fn assign_dispute(
        &self,
        dispute_id: Uuid,
        actor: &Actor,
        reviewer_id: Option<&str>,
    ) -> ResultEngine<Dispute> {
        if !actor.role.is_reviewer() {
            return Err(EngineError::Forbidden(
                "only reviewers can assign disputes".to_string(),
            ));
        }

        let (dispute, note) = with_tx!(self, |db_tx| {
            let (dispute, _) = self.require_dispute(&db_tx, dispute_id).await?;
            if dispute.status()? != DisputeStatus::Open {
                return Err(EngineError::InvalidState(
                    "only open disputes can be assigned".to_string(),
                ));
            }
            if let Some(reviewer_id) = reviewer_id {
                self.require_active_reviewer(&db_tx, reviewer_id).await?;
            }

            let mut update = disputes::Entity::update_many()
                .col_expr(
                    disputes::Column::Status,
                    Expr::value(DisputeStatus::UnderReview.as_str()),
                )
                .filter(disputes::Column::Id.eq(dispute.id.clone()))
                .filter(disputes::Column::Status.eq(DisputeStatus::Open.as_str()));
            if let Some(reviewer_id) = reviewer_id {
                update = update.col_expr(
                    disputes::Column::AssignedReviewerId,
                    Expr::value(reviewer_id.to_string()),
                );
            }
            let assigned = update.exec(&db_tx).await?;
            if assigned.rows_affected == 0 {
                return Err(EngineError::InvalidState(
                    "dispute is no longer open".to_string(),
                ));
            }

            let (refreshed, _) = self.require_dispute(&db_tx, dispute_id).await?;
            let note = reviewer_id.map(|reviewer_id| NotificationNew {
                recipient_id: reviewer_id.to_string(),
                title: "Dispute Assigned".to_string(),
                message: format!("Dispute {} has been assigned to you", refreshed.public_id),
                category: NotificationCategory::Dispute,
                action_ref: Some(refreshed.public_id.clone()),
            });

            Ok((Dispute::try_from(refreshed)?, note))
        })?;

        if let Some(note) = note {
            self.notify(note).await;
        }

        Ok(dispute)
    }

    /// Resolves a dispute and settles the frozen transaction.
    ///
    /// A positive refund forces the transaction to `refunded`; a zero refund
    /// releases the escrow to the seller and forces `completed`.
    pub async fn resolve_dispute(&self, cmd: ResolveDisputeCmd) -> ResultEngine<Dispute> {
        if !cmd.actor.role.is_reviewer() {
            return Err(EngineError::Forbidden(
                "only reviewers can resolve disputes".to_string(),
            ));
        }
        let resolution = normalize_required_text(&cmd.resolution, "resolution")?;
        if cmd.refund_cents < 0 {
            return Err(EngineError::Validation(
                "refund must not be negative".to_string(),
            ));
        }
        let now = Utc::now();

        let (dispute, notes) = with_tx!(self, |db_tx| {
            let (dispute, tx_model) = self.require_dispute(&db_tx, cmd.dispute_id).await?;
            if dispute.status()? == DisputeStatus::Resolved {
                return Err(EngineError::Conflict(
                    "dispute is already resolved".to_string(),
                ));
            }
            if cmd.refund_cents > tx_model.escrow_cents {
                return Err(EngineError::Validation(format!(
                    "refund exceeds the {} held in escrow",
                    money::format_cents(tx_model.escrow_cents)
                )));
            }

            let closed = disputes::Entity::update_many()
                .col_expr(
                    disputes::Column::Status,
                    Expr::value(DisputeStatus::Resolved.as_str()),
                )
                .col_expr(disputes::Column::Resolution, Expr::value(resolution.clone()))
                .col_expr(disputes::Column::ResolvedAt, Expr::value(now))
                .filter(disputes::Column::Id.eq(dispute.id.clone()))
                .filter(disputes::Column::Status.is_in([
                    DisputeStatus::Open.as_str(),
                    DisputeStatus::UnderReview.as_str(),
                ]))
                .exec(&db_tx)
                .await?;
            if closed.rows_affected == 0 {
                return Err(EngineError::Conflict(
                    "dispute is already resolved".to_string(),
                ));
            }

            let final_status = if cmd.refund_cents > 0 {
                TransactionStatus::Refunded
            } else {
                TransactionStatus::Completed
            };
            transactions::Entity::update_many()
                .col_expr(
                    transactions::Column::Status,
                    Expr::value(final_status.as_str()),
                )
                .filter(transactions::Column::Id.eq(tx_model.id.clone()))
                .exec(&db_tx)
                .await?;

            if cmd.refund_cents > 0 {
                tracing::info!(
                    public_id = %dispute.public_id,
                    refund = %money::format_cents(cmd.refund_cents),
                    "dispute resolved with refund"
                );
            }

            let (refreshed, _) = self.require_dispute(&db_tx, cmd.dispute_id).await?;
            let notes: Vec<NotificationNew> = [tx_model.buyer_id.clone(), tx_model.seller_id]
                .into_iter()
                .map(|recipient_id| NotificationNew {
                    recipient_id,
                    title: "Dispute Resolved".to_string(),
                    message: format!("Dispute {} has been resolved", refreshed.public_id),
                    category: NotificationCategory::Dispute,
                    action_ref: Some(refreshed.public_id.clone()),
                })
                .collect();

            Ok((Dispute::try_from(refreshed)?, notes))
        })?;

        self.notify_all(notes).await;

        Ok(dispute)
    }

    /// Loads one dispute with its ordered message thread.
    pub async fn dispute(
        &self,
        actor: &Actor,
        dispute_id: Uuid,
    ) -> ResultEngine<(Dispute, Vec<DisputeMessage>)> {
        with_tx!(self, |db_tx| {
            let (model, tx_model) = self.require_dispute(&db_tx, dispute_id).await?;
            self.require_transaction_access(&tx_model, actor)?;

            let messages = dispute_messages::Entity::find()
                .filter(dispute_messages::Column::DisputeId.eq(model.id.clone()))
                .order_by_asc(dispute_messages::Column::CreatedAt)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(DisputeMessage::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;

            Ok((Dispute::try_from(model)?, messages))
        })
    }

    /// Lists disputes newest-first; participants only see disputes on their
    /// own transactions.
    pub async fn list_disputes(
        &self,
        actor: &Actor,
        filter: &DisputeFilter,
        limit: u64,
    ) -> ResultEngine<Vec<Dispute>> {
        let mut query = disputes::Entity::find()
            .order_by_desc(disputes::Column::CreatedAt)
            .limit(limit);

        if !actor.role.is_reviewer() {
            query = query.inner_join(transactions::Entity).filter(
                Condition::any()
                    .add(transactions::Column::BuyerId.eq(actor.id.clone()))
                    .add(transactions::Column::SellerId.eq(actor.id.clone())),
            );
        }

        if let Some(status) = filter.status {
            query = query.filter(disputes::Column::Status.eq(status.as_str()));
        }
        if let Some(kind) = filter.kind {
            query = query.filter(disputes::Column::Kind.eq(kind.as_str()));
        }
        if let Some(reviewer_id) = &filter.assigned_reviewer_id {
            query = query.filter(disputes::Column::AssignedReviewerId.eq(reviewer_id.clone()));
        }

        let models = query.all(&self.database).await?;
        models.into_iter().map(Dispute::try_from).collect()
    }

    /// Loads a dispute together with its parent transaction row.
    async fn require_dispute(
        &self,
        db: &sea_orm::DatabaseTransaction,
        dispute_id: Uuid,
    ) -> ResultEngine<(disputes::Model, transactions::Model)> {
        let model = disputes::Entity::find_by_id(dispute_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("dispute not exists".to_string()))?;
        let tx_model = transactions::Entity::find_by_id(model.transaction_id.clone())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;
        Ok((model, tx_model))
    }
}
