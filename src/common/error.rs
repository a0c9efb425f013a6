//! Common Error Types for zBridge
//!
//! Every component has its own error enum. Each maps onto an [`ErrorKind`]
//! so callers can tell "wait and retry" from "this input is invalid or
//! fraudulent" without matching on every variant.

use thiserror::Error;

use crate::bridge::BridgeError;
use crate::relay::RelayError;
use crate::storage::StorageError;
use crate::vault::VaultError;

/// Rejection classes shared by all components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input has the wrong shape (short header, wrong-length proof)
    MalformedInput,
    /// State does not allow the call yet or any more (wrong status, expired)
    PreconditionViolation,
    /// Caller is not the party allowed to make this call
    Unauthorized,
    /// A proof, PoW or Merkle check failed
    CryptographicRejection,
    /// Not enough collateral or balance
    EconomicFailure,
    Storage,
    Config,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedInput => "MALFORMED_INPUT",
            ErrorKind::PreconditionViolation => "PRECONDITION_VIOLATION",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::CryptographicRejection => "CRYPTOGRAPHIC_REJECTION",
            ErrorKind::EconomicFailure => "ECONOMIC_FAILURE",
            ErrorKind::Storage => "STORAGE_ERROR",
            ErrorKind::Config => "CONFIG_ERROR",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Root error type for zBridge
#[derive(Debug, Error)]
pub enum ZBridgeError {
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),

    #[error("logging error: {0}")]
    Logging(#[from] super::logging::LoggingError),

    #[error("relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ZBridgeError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ZBridgeError::Config(_) | ZBridgeError::Logging(_) => ErrorKind::Config,
            ZBridgeError::Relay(e) => e.kind(),
            ZBridgeError::Vault(e) => e.kind(),
            ZBridgeError::Bridge(e) => e.kind(),
            ZBridgeError::Storage(_) | ZBridgeError::Io(_) => ErrorKind::Storage,
            ZBridgeError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        match self {
            ZBridgeError::Relay(e) => e.is_retryable(),
            ZBridgeError::Vault(e) => e.is_retryable(),
            ZBridgeError::Bridge(e) => e.is_retryable(),
            ZBridgeError::Storage(e) => e.is_retryable(),
            ZBridgeError::Io(_) => true,
            _ => false,
        }
    }

    /// Get error code for API responses and structured logs
    pub fn error_code(&self) -> &'static str {
        self.kind().as_str()
    }
}

/// Result type alias using ZBridgeError
pub type Result<T> = std::result::Result<T, ZBridgeError>;
