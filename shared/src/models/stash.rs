//! Persisted key transparency blobs

use serde::{Deserialize, Serialize};

/// Deferred verification record awaiting log catch-up
///
/// `email_identifier` is a one-way token derived from (user ID, email); the
/// raw address never reaches storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashedKeyRecord {
    #[serde(rename = "PublicKeys")]
    pub public_keys: Vec<String>,
    #[serde(rename = "ExpectedMinEpochID")]
    pub expected_min_epoch_id: u64,
    /// Unix millis; signature time for active SKLs, stash time otherwise
    #[serde(rename = "creationTimestamp")]
    pub creation_timestamp: i64,
    #[serde(rename = "emailIdentifier")]
    pub email_identifier: String,
    #[serde(rename = "isObsolete")]
    pub is_obsolete: bool,
}

/// Outcome of the last completed self-audit, one per user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    pub last_run_timestamp: i64,
}
