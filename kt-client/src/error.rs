//! Client error types

use shared::error::{ErrorCategory, ErrorCode};
use thiserror::Error;

/// Key transparency error type
#[derive(Debug, Error)]
pub enum KtError {
    /// Reading from the blob store failed
    #[error("Storage read error: {0}")]
    StorageRead(String),

    /// Writing to the blob store failed
    #[error("Storage write error: {0}")]
    StorageWrite(String),

    /// Crypto provider failure
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Transparency log / directory request failed
    #[error("Transparency log error: {0}")]
    Log(String),

    /// Addresses or user keys unavailable
    #[error("Account error: {0}")]
    Account(String),

    /// Published keys contradict the transparency log
    #[error("Key list does not match the transparency log")]
    KeyMismatch,

    /// Configuration rejected
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl KtError {
    /// Stable error code for telemetry
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::StorageRead(_) => ErrorCode::StorageRead,
            Self::StorageWrite(_) => ErrorCode::StorageWrite,
            Self::Crypto(_) => ErrorCode::CryptoFailure,
            Self::Log(_) => ErrorCode::LogUnavailable,
            Self::Account(_) => ErrorCode::AccountUnavailable,
            Self::KeyMismatch => ErrorCode::KeyListMismatch,
            Self::InvalidConfig(_) => ErrorCode::InvalidConfig,
            Self::Serialization(_) => ErrorCode::Serialization,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.code().category()
    }
}

impl From<kt_crypto::CryptoError> for KtError {
    fn from(err: kt_crypto::CryptoError) -> Self {
        KtError::Crypto(err.to_string())
    }
}

/// Result type for key transparency operations
pub type KtResult<T> = Result<T, KtError>;
