//! The module contains the errors the engine can throw.
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The caller is not the owner of the target account or allocation.
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid allocation kind: {0}")]
    InvalidKind(String),
    /// The requested kind is not permitted for the current account-count
    /// transition (e.g. Kebutuhan while adding a second account).
    #[error("Policy violation: {0}")]
    PolicyViolation(String),
    /// An allocation row the rebalancer expected was missing. The whole
    /// operation is rolled back; the caller may retry.
    #[error("Inconsistent state: {0}")]
    Inconsistent(String),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidKind(a), Self::InvalidKind(b)) => a == b,
            (Self::PolicyViolation(a), Self::PolicyViolation(b)) => a == b,
            (Self::Inconsistent(a), Self::Inconsistent(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
