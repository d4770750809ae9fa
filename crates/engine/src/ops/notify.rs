//! Best-effort notification emitter.
//!
//! Notifications are written **after** the primary DB transaction commits and
//! on the plain connection: the state transition is the unit of consistency,
//! a failed notification insert is logged and swallowed, never propagated.

use chrono::Utc;
use sea_orm::{ActiveValue, prelude::*};
use uuid::Uuid;

use crate::{NotificationCategory, notifications};

use super::Engine;

/// One notification to insert for one recipient.
#[derive(Clone, Debug)]
pub(super) struct NotificationNew {
    pub recipient_id: String,
    pub title: String,
    pub message: String,
    pub category: NotificationCategory,
    pub action_ref: Option<String>,
}

impl Engine {
    pub(super) async fn notify(&self, notification: NotificationNew) {
        let model = notifications::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            user_id: ActiveValue::Set(notification.recipient_id.clone()),
            title: ActiveValue::Set(notification.title),
            message: ActiveValue::Set(notification.message),
            category: ActiveValue::Set(notification.category.as_str().to_string()),
            action_ref: ActiveValue::Set(notification.action_ref),
            read: ActiveValue::Set(false),
            created_at: ActiveValue::Set(Utc::now()),
        };

        if let Err(err) = model.insert(&self.database).await {
            tracing::warn!(
                recipient = %notification.recipient_id,
                "failed to insert notification: {err}"
            );
        }
    }

    /// Inserts are independent per recipient; one failure does not stop the
    /// rest.
    pub(super) async fn notify_all(&self, notifications: Vec<NotificationNew>) {
        for notification in notifications {
            self.notify(notification).await;
        }
    }
}
