//! Escrow transaction operations: creation, status transitions, reads.

use chrono::{DateTime, Utc};
use sea_orm::{Condition, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{Actor, ResultEngine, Transaction, TransactionStatus, transactions};

use super::{Engine, with_tx};

mod create;
mod transition;

pub use create::CreateTransactionCmd;
pub use transition::TransitionCmd;

/// Which side of a transaction the caller is interested in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionSide {
    Buyer,
    Seller,
}

/// Typed listing criteria.
///
/// The filterable fields are a closed contract; there is no pass-through to
/// raw query fragments.
#[derive(Clone, Debug, Default)]
pub struct TransactionFilter {
    pub status: Option<TransactionStatus>,
    pub side: Option<TransactionSide>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl Engine {
    /// Loads one transaction; visible to its participants and reviewers.
    pub async fn transaction(&self, actor: &Actor, id: Uuid) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let model = self.require_transaction(&db_tx, id).await?;
            self.require_transaction_access(&model, actor)?;
            Transaction::try_from(model)
        })
    }

    /// Lists transactions newest-first.
    ///
    /// Participants see their own rows (optionally narrowed to one side);
    /// reviewers see everything.
    pub async fn list_transactions(
        &self,
        actor: &Actor,
        filter: &TransactionFilter,
        limit: u64,
    ) -> ResultEngine<Vec<Transaction>> {
        let mut query = transactions::Entity::find()
            .order_by_desc(transactions::Column::CreatedAt)
            .limit(limit);

        if !actor.role.is_reviewer() {
            let ownership = match filter.side {
                Some(TransactionSide::Buyer) => {
                    Condition::all().add(transactions::Column::BuyerId.eq(actor.id.clone()))
                }
                Some(TransactionSide::Seller) => {
                    Condition::all().add(transactions::Column::SellerId.eq(actor.id.clone()))
                }
                None => Condition::any()
                    .add(transactions::Column::BuyerId.eq(actor.id.clone()))
                    .add(transactions::Column::SellerId.eq(actor.id.clone())),
            };
            query = query.filter(ownership);
        }

        if let Some(status) = filter.status {
            query = query.filter(transactions::Column::Status.eq(status.as_str()));
        }
        if let Some(from) = filter.from {
            query = query.filter(transactions::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(transactions::Column::CreatedAt.lte(to));
        }

        let models = query.all(&self.database).await?;
        models.into_iter().map(Transaction::try_from).collect()
    }
}
