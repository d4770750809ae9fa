//! Keyed, time-windowed attempt counters.
//!
//! Replaces an in-memory per-process map: counters are persisted so every
//! server instance sees the same window, and rows reset explicitly when the
//! window elapses.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveValue, SqlErr, TransactionTrait, prelude::*};

use crate::{EngineError, ResultEngine, rate_limits};

use super::{Engine, with_tx};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited,
}

impl RateDecision {
    pub fn is_limited(self) -> bool {
        matches!(self, Self::Limited)
    }
}

impl Engine {
    /// Counts one attempt under `key` and reports whether the caller is over
    /// `limit` attempts inside the current window.
    pub async fn register_attempt(
        &self,
        key: &str,
        limit: i32,
        window_secs: i64,
        now: DateTime<Utc>,
    ) -> ResultEngine<RateDecision> {
        with_tx!(self, |db_tx| {
            let existing = rate_limits::Entity::find_by_id(key.to_string())
                .one(&db_tx)
                .await?;

            let count = match existing {
                None => {
                    let row = rate_limits::ActiveModel {
                        key: ActiveValue::Set(key.to_string()),
                        window_started_at: ActiveValue::Set(now),
                        count: ActiveValue::Set(1),
                    };
                    match row.insert(&db_tx).await {
                        Ok(_) => 1,
                        // A concurrent first attempt inserted the row between
                        // our read and this insert; count against its window.
                        Err(err)
                            if matches!(
                                err.sql_err(),
                                Some(SqlErr::UniqueConstraintViolation(_))
                            ) =>
                        {
                            let row = rate_limits::Entity::find_by_id(key.to_string())
                                .one(&db_tx)
                                .await?
                                .ok_or_else(|| {
                                    EngineError::Conflict(
                                        "attempt counter vanished mid-update".to_string(),
                                    )
                                })?;
                            let next = row.count.saturating_add(1);
                            let bumped = rate_limits::ActiveModel {
                                key: ActiveValue::Set(key.to_string()),
                                window_started_at: ActiveValue::Set(row.window_started_at),
                                count: ActiveValue::Set(next),
                            };
                            bumped.update(&db_tx).await?;
                            next
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                Some(row) if now - row.window_started_at >= Duration::seconds(window_secs) => {
                    let reset = rate_limits::ActiveModel {
                        key: ActiveValue::Set(key.to_string()),
                        window_started_at: ActiveValue::Set(now),
                        count: ActiveValue::Set(1),
                    };
                    reset.update(&db_tx).await?;
                    1
                }
                Some(row) => {
                    let next = row.count.saturating_add(1);
                    let bumped = rate_limits::ActiveModel {
                        key: ActiveValue::Set(key.to_string()),
                        window_started_at: ActiveValue::Set(row.window_started_at),
                        count: ActiveValue::Set(next),
                    };
                    bumped.update(&db_tx).await?;
                    next
                }
            };

            if count > limit {
                Ok(RateDecision::Limited)
            } else {
                Ok(RateDecision::Allowed)
            }
        })
    }

    /// Drops the counter for `key`, e.g. after a successful login.
    pub async fn clear_attempts(&self, key: &str) -> ResultEngine<()> {
        rate_limits::Entity::delete_by_id(key.to_string())
            .exec(&self.database)
            .await?;
        Ok(())
    }
}
