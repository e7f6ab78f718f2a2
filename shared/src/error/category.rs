//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// Categories are determined by the leading digit of the error code:
/// - 0xxx: General errors
/// - 1xxx: Protocol inconsistency
/// - 2xxx: Verification failures
/// - 3xxx: Storage failures
/// - 4xxx: Scheduler failures
/// - 5xxx: Crypto provider errors
/// - 6xxx: Transparency log errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Protocol inconsistency (1xxx)
    ProtocolInconsistency,
    /// Verification failures (2xxx)
    Verification,
    /// Storage failures (3xxx)
    Storage,
    /// Scheduler failures (4xxx)
    Scheduler,
    /// Crypto provider errors (5xxx)
    Crypto,
    /// Transparency log errors (6xxx)
    Log,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::ProtocolInconsistency,
            2000..3000 => Self::Verification,
            3000..4000 => Self::Storage,
            4000..5000 => Self::Scheduler,
            5000..6000 => Self::Crypto,
            _ => Self::Log,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::ProtocolInconsistency => "protocol_inconsistency",
            Self::Verification => "verification",
            Self::Storage => "storage",
            Self::Scheduler => "scheduler",
            Self::Crypto => "crypto",
            Self::Log => "log",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}
