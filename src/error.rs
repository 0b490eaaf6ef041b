use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaymentError>;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("invalid API key")]
    InvalidCredential,
    #[error("callback host '{0}' does not match the registered domain")]
    CallbackMismatch(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("payment gateway rejected the request: {0}")]
    GatewayRejected(String),
    #[error("transaction not found")]
    TransactionNotFound,
    #[error("transaction belongs to another merchant")]
    OwnershipViolation,
    #[error("payment gateway '{0}' is not supported")]
    UnsupportedProvider(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("gateway token '{0}' is already recorded")]
    DuplicateToken(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

/// Stable, machine-readable error kind returned to merchants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidCredential,
    CallbackMismatch,
    InvalidRequest,
    GatewayUnavailable,
    GatewayRejected,
    TransactionNotFound,
    OwnershipViolation,
    UnsupportedProvider,
    Config,
    Internal,
}

impl PaymentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::InvalidCredential => ErrorKind::InvalidCredential,
            PaymentError::CallbackMismatch(_) => ErrorKind::CallbackMismatch,
            PaymentError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            PaymentError::GatewayUnavailable(_) => ErrorKind::GatewayUnavailable,
            PaymentError::GatewayRejected(_) => ErrorKind::GatewayRejected,
            PaymentError::TransactionNotFound => ErrorKind::TransactionNotFound,
            PaymentError::OwnershipViolation => ErrorKind::OwnershipViolation,
            PaymentError::UnsupportedProvider(_) => ErrorKind::UnsupportedProvider,
            PaymentError::Config(_) => ErrorKind::Config,
            PaymentError::DuplicateToken(_)
            | PaymentError::CsvError(_)
            | PaymentError::IoError(_)
            | PaymentError::InternalError(_) => ErrorKind::Internal,
            #[cfg(feature = "storage-rocksdb")]
            PaymentError::RocksDbError(_) => ErrorKind::Internal,
        }
    }

    /// Wraps a serialization or storage failure that has no variant of its own.
    pub fn internal<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        PaymentError::InternalError(Box::new(err))
    }
}
