//! The module contains the errors the engine can throw.
//!
//! The interesting ones are the settlement-specific errors:
//!
//! - [`EmptyGroup`] thrown when a summary is requested for a group with no
//!   members (the even split would divide by zero).
//! - [`Integrity`] thrown when a ledger entry references a member outside the
//!   group, or a write would break the ledger shape.
//! - [`NotReconciled`] thrown when the matching loop leaves an unmatched
//!   balance beyond the rounding allowance. A closed ledger never does this;
//!   seeing it means the bookkeeping upstream is corrupted.
//!
//!  [`EmptyGroup`]: EngineError::EmptyGroup
//!  [`Integrity`]: EngineError::Integrity
//!  [`NotReconciled`]: EngineError::NotReconciled
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("empty group: {0}")]
    EmptyGroup(String),
    #[error("ledger integrity: {0}")]
    Integrity(String),
    #[error("not reconciled: {0}")]
    NotReconciled(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::EmptyGroup(a), Self::EmptyGroup(b)) => a == b,
            (Self::Integrity(a), Self::Integrity(b)) => a == b,
            (Self::NotReconciled(a), Self::NotReconciled(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
