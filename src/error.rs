use crate::domain::transaction::TransactionStatus;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("unknown protocol: {0}")]
    Configuration(String),
    #[error("acquirer unreachable after {attempts} attempts")]
    AcquirerTimeout { attempts: u32 },
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("invalid state transition: {from} -> {to}")]
    InvalidStateTransition {
        from: TransactionStatus,
        to: TransactionStatus,
    },
    #[error("transaction not found: {0}")]
    NotFound(Uuid),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, AuthError>;
