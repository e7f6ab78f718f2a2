//! Shared types for the key transparency workspace
//!
//! Common types used by `kt-client` and its collaborators: the wire-facing
//! models (key lists, signed key lists, stash records), the error code
//! registry and small utilities.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{ErrorCategory, ErrorCode};
pub use models::{
    Address, ApiKey, AuditResult, KtMode, KtStatus, SignedKeyList, StashedKeyRecord, UserKey,
};
