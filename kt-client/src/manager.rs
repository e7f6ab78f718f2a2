//! Key transparency manager
//!
//! Glue between the host application and the engine: owns the shared
//! [`KtContext`], the [`AuditScheduler`] and the [`OutboundKeyVerifier`].

use std::sync::Arc;

use shared::models::{ApiKey, SignedKeyList};

use crate::clock::{Clock, SystemClock};
use crate::config::KtConfig;
use crate::context::KtContext;
use crate::crypto::DefaultCryptoProvider;
use crate::error::{KtError, KtResult};
use crate::provider::{AccountProvider, CryptoProvider, FeatureGate, LogClient};
use crate::scheduler::{AuditScheduler, KeyTransparencyState, TickOutcome};
use crate::stash::StashManager;
use crate::storage::{BlobStore, FileBlobStore, UserStorage};
use crate::telemetry::{Reporter, TracingReporter};
use crate::verifier::{OutboundKeyVerifier, VerifyOutcome};

/// Key transparency engine for one signed-in user
#[derive(Debug)]
pub struct KeyTransparencyManager {
    ctx: Arc<KtContext>,
    scheduler: AuditScheduler,
    verifier: OutboundKeyVerifier,
}

impl KeyTransparencyManager {
    pub fn builder() -> KeyTransparencyManagerBuilder {
        KeyTransparencyManagerBuilder::new()
    }

    /// Start the recurring self-audit loop
    pub fn start(&self) {
        self.scheduler.start();
    }

    /// Stop the recurring loop; in-flight audits keep running
    pub async fn stop(&self) {
        self.scheduler.stop().await;
    }

    /// Run a single scheduling step
    pub async fn tick(&self) -> KtResult<TickOutcome> {
        self.scheduler.tick().await
    }

    pub fn state(&self) -> Arc<KeyTransparencyState> {
        self.scheduler.state()
    }

    /// Next scheduled tick (unix millis)
    pub fn next_wake(&self) -> Option<i64> {
        self.scheduler.next_wake()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Verify a recipient's keys before encrypting to them
    pub async fn verify_outbound_public_keys(
        &self,
        key_list: &[ApiKey],
        email: &str,
        signed_key_list: Option<&SignedKeyList>,
        ignore_kt: bool,
    ) -> KtResult<VerifyOutcome> {
        self.verifier
            .verify(key_list, email, signed_key_list, ignore_kt)
            .await
    }

    pub fn context(&self) -> &Arc<KtContext> {
        &self.ctx
    }
}

/// Builder for [`KeyTransparencyManager`]
///
/// # Example
///
/// ```ignore
/// let manager = KeyTransparencyManager::builder()
///     .user_id("user-1")
///     .log_client(log)
///     .feature_gate(gate)
///     .account(account)
///     .config(KtConfig::from_env())
///     .build()?;
/// manager.start();
/// ```
#[derive(Default)]
pub struct KeyTransparencyManagerBuilder {
    user_id: Option<String>,
    config: Option<KtConfig>,
    crypto: Option<Arc<dyn CryptoProvider>>,
    log: Option<Arc<dyn LogClient>>,
    feature_gate: Option<Arc<dyn FeatureGate>>,
    account: Option<Arc<dyn AccountProvider>>,
    blob_store: Option<Arc<dyn BlobStore>>,
    reporter: Option<Arc<dyn Reporter>>,
    clock: Option<Arc<dyn Clock>>,
}

impl KeyTransparencyManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Defaults to [`KtConfig::default`]
    pub fn config(mut self, config: KtConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Defaults to [`DefaultCryptoProvider`]
    pub fn crypto(mut self, crypto: Arc<dyn CryptoProvider>) -> Self {
        self.crypto = Some(crypto);
        self
    }

    pub fn log_client(mut self, log: Arc<dyn LogClient>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn feature_gate(mut self, feature_gate: Arc<dyn FeatureGate>) -> Self {
        self.feature_gate = Some(feature_gate);
        self
    }

    pub fn account(mut self, account: Arc<dyn AccountProvider>) -> Self {
        self.account = Some(account);
        self
    }

    /// Defaults to a [`FileBlobStore`] under [`KtConfig::storage_dir`]
    pub fn blob_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.blob_store = Some(store);
        self
    }

    /// Defaults to [`TracingReporter`]
    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Defaults to [`SystemClock`]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the manager
    ///
    /// # Errors
    ///
    /// Returns `KtError::InvalidConfig` if a required collaborator is missing
    /// or the config does not validate.
    pub fn build(self) -> KtResult<KeyTransparencyManager> {
        let user_id = self
            .user_id
            .ok_or_else(|| KtError::InvalidConfig("user_id is required".into()))?;
        let log = self
            .log
            .ok_or_else(|| KtError::InvalidConfig("log_client is required".into()))?;
        let feature_gate = self
            .feature_gate
            .ok_or_else(|| KtError::InvalidConfig("feature_gate is required".into()))?;
        let account = self
            .account
            .ok_or_else(|| KtError::InvalidConfig("account is required".into()))?;

        let config = self.config.unwrap_or_default();
        config.validate()?;

        let blob_store = self.blob_store.unwrap_or_else(|| {
            tracing::debug!(dir = ?config.storage_dir, "Using file blob store");
            Arc::new(FileBlobStore::new(config.storage_dir.clone()))
        });

        let crypto = self
            .crypto
            .unwrap_or_else(|| Arc::new(DefaultCryptoProvider));
        let stash = StashManager::new(crypto.clone(), config.identifier_bytes);
        let storage = UserStorage::new(blob_store, user_id.clone());

        let ctx = Arc::new(KtContext {
            user_id,
            config,
            crypto,
            log,
            feature_gate,
            account,
            reporter: self.reporter.unwrap_or_else(|| Arc::new(TracingReporter)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            storage,
            stash,
        });

        tracing::debug!(user_id = %ctx.user_id, "Key transparency manager built");

        Ok(KeyTransparencyManager {
            scheduler: AuditScheduler::new(ctx.clone()),
            verifier: OutboundKeyVerifier::new(ctx.clone()),
            ctx,
        })
    }
}
