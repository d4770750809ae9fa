use chrono::Utc;
use sea_orm::{QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    EngineError, NotificationCategory, ResultEngine, ShippingAddress, Transaction,
    TransactionStatus, UserRole, money, products,
};

use super::super::{Engine, normalize_optional_text, notify::NotificationNew, with_tx};

/// Everything needed to open a new escrow transaction.
#[derive(Clone, Debug)]
pub struct CreateTransactionCmd {
    pub buyer_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub shipping_address: ShippingAddress,
    pub buyer_notes: Option<String>,
}

impl Engine {
    /// Creates a `pending` transaction and reserves stock for it.
    ///
    /// Pricing is snapshotted from the product at creation time; the full
    /// total is held in escrow. The stock decrement is conditional on enough
    /// stock remaining, so two concurrent buyers can never oversell the same
    /// units.
    pub async fn create_transaction(&self, cmd: CreateTransactionCmd) -> ResultEngine<Transaction> {
        if cmd.quantity <= 0 {
            return Err(EngineError::Validation(
                "quantity must be positive".to_string(),
            ));
        }

        let now = Utc::now();
        let (transaction, seller_note) = with_tx!(self, |db_tx| {
            let buyer = self.require_user(&db_tx, &cmd.buyer_id).await?;
            let buyer_role = UserRole::try_from(buyer.role.as_str())?;
            if buyer_role != UserRole::Buyer {
                return Err(EngineError::Forbidden(
                    "only buyers can create transactions".to_string(),
                ));
            }
            if !buyer.is_verified {
                return Err(EngineError::Forbidden(
                    "account must be verified before buying".to_string(),
                ));
            }

            let product = products::Entity::find_by_id(cmd.product_id.clone())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("product not exists".to_string()))?;
            if !product.is_active {
                return Err(EngineError::Validation(
                    "product is no longer available".to_string(),
                ));
            }
            if product.seller_id == cmd.buyer_id {
                return Err(EngineError::Validation(
                    "cannot buy your own product".to_string(),
                ));
            }
            if product.quantity_available < cmd.quantity {
                return Err(EngineError::InsufficientStock(format!(
                    "only {} units available",
                    product.quantity_available
                )));
            }

            let subtotal = money::subtotal_cents(product.price_cents, i64::from(cmd.quantity))?;
            let fee = money::platform_fee_cents(subtotal, self.fee_bps)?;
            let total = subtotal
                .checked_add(product.shipping_cents)
                .and_then(|v| v.checked_add(fee))
                .ok_or_else(|| EngineError::Validation("amount too large".to_string()))?;

            let transaction = Transaction {
                id: Uuid::new_v4(),
                public_id: Transaction::new_public_id(now),
                buyer_id: cmd.buyer_id.clone(),
                seller_id: product.seller_id.clone(),
                product_id: product.id.clone(),
                quantity: cmd.quantity,
                unit_price_cents: product.price_cents,
                shipping_cents: product.shipping_cents,
                platform_fee_cents: fee,
                total_cents: total,
                escrow_cents: total,
                status: TransactionStatus::Pending,
                shipping_address: cmd.shipping_address.clone(),
                tracking_number: None,
                buyer_notes: normalize_optional_text(cmd.buyer_notes.as_deref()),
                seller_notes: None,
                created_at: now,
                estimated_delivery_at: None,
                delivered_at: None,
            };

            let model: crate::transactions::ActiveModel = (&transaction).into();
            model.insert(&db_tx).await?;

            // Conditional decrement so a concurrent sale of the last units
            // makes exactly one of the two inserts roll back.
            let decremented = products::Entity::update_many()
                .col_expr(
                    products::Column::QuantityAvailable,
                    Expr::col(products::Column::QuantityAvailable).sub(cmd.quantity),
                )
                .filter(products::Column::Id.eq(product.id.clone()))
                .filter(products::Column::QuantityAvailable.gte(cmd.quantity))
                .exec(&db_tx)
                .await?;
            if decremented.rows_affected == 0 {
                return Err(EngineError::InsufficientStock(
                    "product sold out while ordering".to_string(),
                ));
            }

            let seller_note = NotificationNew {
                recipient_id: product.seller_id.clone(),
                title: "New Order Received".to_string(),
                message: format!(
                    "{} ordered {} x {}",
                    buyer.display_name(),
                    cmd.quantity,
                    product.title
                ),
                category: NotificationCategory::Transaction,
                action_ref: Some(transaction.public_id.clone()),
            };

            Ok((transaction, seller_note))
        })?;

        self.notify(seller_note).await;

        tracing::info!(
            public_id = %transaction.public_id,
            total_cents = transaction.total_cents,
            "transaction created"
        );

        Ok(transaction)
    }
}
