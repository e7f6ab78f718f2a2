//! Error codes for key transparency reports
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Protocol inconsistency
//! - 2xxx: Verification failures
//! - 3xxx: Storage failures
//! - 4xxx: Scheduler failures
//! - 5xxx: Crypto provider errors
//! - 6xxx: Transparency log errors

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error code enum
///
/// Represented as u16 values so reports serialize compactly and stay stable
/// across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Unknown error
    Unknown = 1,
    /// Configuration rejected
    InvalidConfig = 2,
    /// Record could not be (de)serialized
    Serialization = 3,
    /// Address or user key lookup failed
    AccountUnavailable = 4,

    // ==================== 1xxx: Protocol ====================
    /// SKL with unresolved MinEpochID came without ExpectedMinEpochID
    MissingExpectedMinEpoch = 1001,

    // ==================== 2xxx: Verification ====================
    /// SKL signature did not verify against the published keys
    SignatureInvalid = 2001,
    /// Signature verified but carried no creation time
    MissingSignatureTimestamp = 2002,
    /// Published keys do not match the transparency log
    KeyListMismatch = 2003,
    /// Armored public key could not be imported
    KeyImportFailed = 2004,

    // ==================== 3xxx: Storage ====================
    /// Blob read failed
    StorageRead = 3001,
    /// Blob write failed
    StorageWrite = 3002,
    /// Stashed key record could not be committed
    StashCommitFailed = 3003,
    /// Stashed key records could not be purged
    StashPurgeFailed = 3004,

    // ==================== 4xxx: Scheduler ====================
    /// Self-audit returned an error
    SelfAuditFailed = 4001,
    /// Self-audit task panicked
    SelfAuditPanicked = 4002,

    // ==================== 5xxx: Crypto ====================
    /// Crypto provider failure
    CryptoFailure = 5001,

    // ==================== 6xxx: Log ====================
    /// Transparency log or directory unreachable / returned an error
    LogUnavailable = 6001,
}

impl ErrorCode {
    /// Get the numeric code
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Unknown => "Unknown error",
            ErrorCode::InvalidConfig => "Invalid configuration",
            ErrorCode::Serialization => "Serialization failed",
            ErrorCode::AccountUnavailable => "Account data unavailable",
            ErrorCode::MissingExpectedMinEpoch => {
                "ExpectedMinEpochID missing for a SKL with unresolved MinEpochID"
            }
            ErrorCode::SignatureInvalid => "Signed key list signature verification failed",
            ErrorCode::MissingSignatureTimestamp => "Signature carries no creation time",
            ErrorCode::KeyListMismatch => "Key list does not match the transparency log",
            ErrorCode::KeyImportFailed => "Public key import failed",
            ErrorCode::StorageRead => "Storage read failed",
            ErrorCode::StorageWrite => "Storage write failed",
            ErrorCode::StashCommitFailed => "Failure during others keys commitment",
            ErrorCode::StashPurgeFailed => "Failure while purging stashed keys",
            ErrorCode::SelfAuditFailed => "Self audit failed",
            ErrorCode::SelfAuditPanicked => "Self audit task panicked",
            ErrorCode::CryptoFailure => "Crypto operation failed",
            ErrorCode::LogUnavailable => "Transparency log request failed",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 into [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid error code: {0}")]
pub struct InvalidErrorCode(pub u16);

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::InvalidConfig),
            3 => Ok(ErrorCode::Serialization),
            4 => Ok(ErrorCode::AccountUnavailable),

            // Protocol
            1001 => Ok(ErrorCode::MissingExpectedMinEpoch),

            // Verification
            2001 => Ok(ErrorCode::SignatureInvalid),
            2002 => Ok(ErrorCode::MissingSignatureTimestamp),
            2003 => Ok(ErrorCode::KeyListMismatch),
            2004 => Ok(ErrorCode::KeyImportFailed),

            // Storage
            3001 => Ok(ErrorCode::StorageRead),
            3002 => Ok(ErrorCode::StorageWrite),
            3003 => Ok(ErrorCode::StashCommitFailed),
            3004 => Ok(ErrorCode::StashPurgeFailed),

            // Scheduler
            4001 => Ok(ErrorCode::SelfAuditFailed),
            4002 => Ok(ErrorCode::SelfAuditPanicked),

            // Crypto
            5001 => Ok(ErrorCode::CryptoFailure),

            // Log
            6001 => Ok(ErrorCode::LogUnavailable),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}
