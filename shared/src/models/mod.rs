//! Key transparency models
//!
//! Field names follow the directory API (PascalCase) so that payloads from the
//! key directory deserialize directly.

pub mod account;
pub mod key;
pub mod stash;
pub mod status;

pub use account::{Address, UserKey};
pub use key::{ApiKey, SignedKeyList};
pub use stash::{AuditResult, StashedKeyRecord};
pub use status::{KtMode, KtStatus};
