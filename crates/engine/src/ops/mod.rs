use sea_orm::DatabaseConnection;

use crate::{EngineError, ResultEngine};

mod access;
mod disputes;
mod notify;
mod rate_limit;
mod transactions;

pub use disputes::{DisputeFilter, OpenDisputeCmd, ResolveDisputeCmd};
pub use rate_limit::RateDecision;
pub use transactions::{CreateTransactionCmd, TransactionFilter, TransactionSide, TransitionCmd};

/// Default platform fee: 250 basis points (2.5%).
pub const DEFAULT_FEE_BPS: i64 = 250;

/// Run a block inside a DB transaction, committing on success and rolling
/// back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    fee_bps: i64,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Platform fee rate in basis points applied at transaction creation.
    pub fn fee_bps(&self) -> i64 {
        self.fee_bps
    }
}

fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    fee_bps: i64,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            fee_bps: DEFAULT_FEE_BPS,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Override the platform fee rate (basis points).
    pub fn fee_bps(mut self, fee_bps: i64) -> EngineBuilder {
        self.fee_bps = fee_bps;
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> ResultEngine<Engine> {
        if self.fee_bps < 0 || self.fee_bps > 10_000 {
            return Err(EngineError::Validation(
                "fee_bps must be between 0 and 10000".to_string(),
            ));
        }
        Ok(Engine {
            database: self.database,
            fee_bps: self.fee_bps,
        })
    }
}
