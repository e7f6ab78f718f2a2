//! KT Client - key transparency verification engine
//!
//! Keeps a client's view of published public keys consistent with the
//! transparency log:
//!
//! - [`AuditScheduler`]: periodic self-audit of the user's own keys, with
//!   the next wake derived from how overdue the last audit is
//! - [`OutboundKeyVerifier`]: checks a recipient's keys before sending and
//!   stashes a record when the log has not caught up yet
//! - [`StashManager`]: persistence of deferred verification records
//!
//! External collaborators (log client, feature gate, account data, blob
//! store, telemetry) are traits in [`provider`], [`storage`] and
//! [`telemetry`]; [`KeyTransparencyManager`] wires everything together.

pub mod clock;
pub mod config;
pub mod context;
pub mod crypto;
pub mod error;
pub mod manager;
pub mod provider;
pub mod scheduler;
pub mod stash;
pub mod storage;
pub mod telemetry;
pub mod verifier;

pub use clock::{Clock, SystemClock};
pub use config::{EXP_EPOCH_INTERVAL, KtConfig};
pub use context::KtContext;
pub use crypto::DefaultCryptoProvider;
pub use error::{KtError, KtResult};
pub use manager::{KeyTransparencyManager, KeyTransparencyManagerBuilder};
pub use provider::{
    AccountProvider, CryptoProvider, FeatureGate, LogClient, PublicKeyHandle, StaticFeatureGate,
};
pub use scheduler::{AuditScheduler, AuditStatus, KeyTransparencyState, TickOutcome};
pub use stash::StashManager;
pub use storage::{BlobStore, FileBlobStore, MemoryBlobStore, UserStorage};
pub use telemetry::{Report, Reporter, TracingReporter};
pub use verifier::{OutboundKeyVerifier, VerifyOutcome};

// Re-export shared and crypto types used in trait signatures
pub use kt_crypto::{HashAlgorithm, MessageVerification, VerificationStatus};
pub use shared::models::{
    Address, ApiKey, AuditResult, KtMode, KtStatus, SignedKeyList, StashedKeyRecord, UserKey,
};
