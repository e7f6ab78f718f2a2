//! Feature mode and verification status enums

use serde::{Deserialize, Serialize};

/// Activation mode reported by the feature gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KtMode {
    /// Key transparency turned off; local blobs must be removed
    Disabled,
    /// Verification runs, results are not surfaced in the UI
    EnableCore,
    /// Verification runs and results are surfaced
    EnableUi,
    /// Flag not loaded yet
    Unknown,
}

impl KtMode {
    /// Map the raw feature flag value (0 / 1 / 2) to a mode
    pub fn from_flag(value: Option<i64>) -> Self {
        match value {
            Some(0) => Self::Disabled,
            Some(1) => Self::EnableCore,
            Some(2) => Self::EnableUi,
            _ => Self::Unknown,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::EnableCore | Self::EnableUi)
    }
}

/// Result of checking a key list against the transparency log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KtStatus {
    Verified,
    /// Keys contradict the log
    Mismatch,
    /// SKL not yet included in any epoch (MinEpochID is null)
    MinEpochUnresolved,
    /// Verification skipped on request
    Skipped,
}
