//! Shared dependencies of the scheduler and the verifier

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::KtConfig;
use crate::provider::{AccountProvider, CryptoProvider, FeatureGate, LogClient};
use crate::stash::StashManager;
use crate::storage::UserStorage;
use crate::telemetry::Reporter;

/// Everything the engine needs for one signed-in user
///
/// Built by [`crate::KeyTransparencyManagerBuilder`]; cheap to share behind an
/// `Arc`.
pub struct KtContext {
    pub user_id: String,
    pub config: KtConfig,
    pub crypto: Arc<dyn CryptoProvider>,
    pub log: Arc<dyn LogClient>,
    pub feature_gate: Arc<dyn FeatureGate>,
    pub account: Arc<dyn AccountProvider>,
    pub reporter: Arc<dyn Reporter>,
    pub clock: Arc<dyn Clock>,
    pub storage: UserStorage,
    pub stash: StashManager,
}

impl std::fmt::Debug for KtContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KtContext")
            .field("user_id", &self.user_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
