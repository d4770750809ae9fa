//! Marketplace escrow engine.
//!
//! The engine owns the transaction and dispute lifecycles: creation with
//! stock reservation, the status state machine, dispute threads and
//! resolution, and the best-effort notification emitter. All state lives in
//! the relational store; the engine holds no in-process caches.

pub use disputes::{Dispute, DisputeKind, DisputeStatus};
pub use dispute_messages::DisputeMessage;
pub use error::EngineError;
pub use notifications::NotificationCategory;
pub use patch::Patch;
pub use roles::{Actor, UserRole};
pub use transactions::{ShippingAddress, Transaction, TransactionStatus};

pub use ops::{
    CreateTransactionCmd, DisputeFilter, Engine, EngineBuilder, OpenDisputeCmd, RateDecision,
    ResolveDisputeCmd, TransactionFilter, TransactionSide, TransitionCmd, DEFAULT_FEE_BPS,
};

pub mod dispute_messages;
pub mod disputes;
mod error;
pub mod money;
pub mod notifications;
mod ops;
mod patch;
pub mod products;
pub mod rate_limits;
mod roles;
pub mod transactions;
pub mod users;

type ResultEngine<T> = Result<T, EngineError>;
