//! Authorization helpers shared by the transaction and dispute operations.

use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{Actor, EngineError, ResultEngine, UserRole, transactions, users};

use super::Engine;

impl Engine {
    pub(super) async fn require_user(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    /// Loads a user and asserts they are an active reviewer.
    pub(super) async fn require_active_reviewer(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<users::Model> {
        let user = self.require_user(db, user_id).await?;
        let role = UserRole::try_from(user.role.as_str())?;
        if !role.is_reviewer() || !user.is_active {
            return Err(EngineError::Validation(
                "not an active reviewer".to_string(),
            ));
        }
        Ok(user)
    }

    /// All active reviewers, for dispute fan-out notifications.
    pub(super) async fn active_reviewers(
        &self,
        db: &DatabaseTransaction,
    ) -> ResultEngine<Vec<users::Model>> {
        users::Entity::find()
            .filter(users::Column::IsActive.eq(true))
            .filter(
                users::Column::Role.is_in([
                    UserRole::Admin.as_str(),
                    UserRole::SuperAdmin.as_str(),
                ]),
            )
            .all(db)
            .await
            .map_err(Into::into)
    }

    pub(super) async fn require_transaction(
        &self,
        db: &DatabaseTransaction,
        transaction_id: Uuid,
    ) -> ResultEngine<transactions::Model> {
        transactions::Entity::find_by_id(transaction_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))
    }

    /// A transaction is visible to its buyer, its seller, and reviewers.
    pub(super) fn require_transaction_access(
        &self,
        model: &transactions::Model,
        actor: &Actor,
    ) -> ResultEngine<()> {
        if model.is_participant(&actor.id) || actor.role.is_reviewer() {
            return Ok(());
        }
        Err(EngineError::Forbidden(
            "not part of this transaction".to_string(),
        ))
    }
}
