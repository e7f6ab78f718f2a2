//! Test doubles shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use kt_client::{
    AccountProvider, Address, ApiKey, BlobStore, Clock, CryptoProvider, FeatureGate,
    HashAlgorithm, KeyTransparencyManager, KtConfig, KtError, KtMode, KtResult, KtStatus,
    LogClient, MemoryBlobStore, MessageVerification, PublicKeyHandle, Report, Reporter,
    SignedKeyList, StashedKeyRecord, StaticFeatureGate, UserKey, UserStorage,
    VerificationStatus,
};
use shared::error::ErrorCode;

pub const USER_ID: &str = "user-1";
pub const HOUR: i64 = 60 * 60 * 1000;
pub const START: i64 = 1_700_000_000_000;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("kt_client=debug")
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Clock
// ============================================================================

#[derive(Debug)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self(AtomicI64::new(now))
    }

    pub fn set(&self, now: i64) {
        self.0.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.0.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Reporter
// ============================================================================

#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<Report>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }

    pub fn codes(&self) -> Vec<ErrorCode> {
        self.reports().into_iter().map(|r| r.code).collect()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, report: Report) {
        self.reports.lock().unwrap().push(report);
    }
}

// ============================================================================
// LogClient
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditBehaviour {
    Succeed,
    Fail,
    Panic,
    /// Wait until [`FakeLog::release_audit`] is called
    Block,
}

pub struct FakeLog {
    status: Mutex<Result<KtStatus, String>>,
    audit: Mutex<AuditBehaviour>,
    release: Notify,
    pub verify_calls: AtomicUsize,
    pub audit_calls: AtomicUsize,
}

impl FakeLog {
    pub fn new(status: KtStatus) -> Self {
        Self {
            status: Mutex::new(Ok(status)),
            audit: Mutex::new(AuditBehaviour::Succeed),
            release: Notify::new(),
            verify_calls: AtomicUsize::new(0),
            audit_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_status(&self, status: KtStatus) {
        *self.status.lock().unwrap() = Ok(status);
    }

    pub fn fail_verification(&self, message: &str) {
        *self.status.lock().unwrap() = Err(message.to_string());
    }

    pub fn set_audit(&self, behaviour: AuditBehaviour) {
        *self.audit.lock().unwrap() = behaviour;
    }

    pub fn release_audit(&self) {
        self.release.notify_one();
    }

    pub fn audits(&self) -> usize {
        self.audit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogClient for FakeLog {
    async fn verify_public_keys(
        &self,
        _key_list: &[ApiKey],
        _email: &str,
        _signed_key_list: Option<&SignedKeyList>,
        _ignore_kt: bool,
    ) -> KtResult<KtStatus> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.status.lock().unwrap().clone().map_err(KtError::Log)
    }

    async fn audit_addresses(
        &self,
        _user_id: &str,
        _addresses: &[Address],
        _user_keys: &[UserKey],
        _storage: &UserStorage,
    ) -> KtResult<()> {
        self.audit_calls.fetch_add(1, Ordering::SeqCst);
        let behaviour = *self.audit.lock().unwrap();
        match behaviour {
            AuditBehaviour::Succeed => Ok(()),
            AuditBehaviour::Fail => Err(KtError::Log("epoch fetch failed".into())),
            AuditBehaviour::Panic => panic!("audit exploded"),
            AuditBehaviour::Block => {
                self.release.notified().await;
                Ok(())
            }
        }
    }
}

// ============================================================================
// AccountProvider
// ============================================================================

pub struct FakeAccount {
    pub addresses: Vec<Address>,
    pub user_keys: Vec<UserKey>,
    pub fail_user_keys: AtomicBool,
}

impl FakeAccount {
    pub fn new(addresses: Vec<Address>, user_keys: Vec<UserKey>) -> Self {
        Self {
            addresses,
            user_keys,
            fail_user_keys: AtomicBool::new(false),
        }
    }

    pub fn default_user() -> Self {
        Self::new(
            vec![
                Address::new("addr-1", "me@example.com"),
                Address::new("addr-2", "alias@example.com"),
            ],
            vec![UserKey::new("key-1", "user-public-key")],
        )
    }
}

#[async_trait]
impl AccountProvider for FakeAccount {
    async fn addresses(&self) -> KtResult<Vec<Address>> {
        Ok(self.addresses.clone())
    }

    async fn user_keys(&self) -> KtResult<Vec<UserKey>> {
        if self.fail_user_keys.load(Ordering::SeqCst) {
            return Err(KtError::Account("user keys locked".into()));
        }
        Ok(self.user_keys.clone())
    }
}

// ============================================================================
// CryptoProvider
// ============================================================================

/// Crypto double with readable artifacts
///
/// - keys starting with `bad` fail to import
/// - signature `valid:<ts>` verifies with timestamp `ts`, `valid` verifies
///   without a timestamp, anything else is invalid
/// - encryption produces `sealed:<plaintext>`
#[derive(Default)]
pub struct FakeCrypto {
    pub fail_encrypt: AtomicBool,
}

impl FakeCrypto {
    pub fn open(sealed: &str) -> StashedKeyRecord {
        let json = sealed.strip_prefix("sealed:").expect("not sealed by FakeCrypto");
        serde_json::from_str(json).unwrap()
    }
}

#[async_trait]
impl CryptoProvider for FakeCrypto {
    async fn compute_hash(&self, algorithm: HashAlgorithm, data: &[u8]) -> KtResult<Vec<u8>> {
        Ok(kt_crypto::compute_hash(algorithm, data))
    }

    async fn import_public_key(&self, armored_key: &str) -> KtResult<PublicKeyHandle> {
        if armored_key.starts_with("bad") {
            return Err(KtError::Crypto(format!("cannot parse {}", armored_key)));
        }
        Ok(PublicKeyHandle::new(armored_key.to_string()))
    }

    async fn verify_message(
        &self,
        _text_data: &str,
        armored_signature: &str,
        _verification_keys: &[PublicKeyHandle],
    ) -> KtResult<MessageVerification> {
        let verification = match armored_signature.split_once(':') {
            Some(("valid", ts)) => MessageVerification {
                status: VerificationStatus::SignedAndValid,
                signature_timestamp: ts.parse().ok(),
                errors: Vec::new(),
            },
            _ if armored_signature == "valid" => MessageVerification {
                status: VerificationStatus::SignedAndValid,
                signature_timestamp: None,
                errors: Vec::new(),
            },
            _ => MessageVerification {
                status: VerificationStatus::SignedAndInvalid,
                signature_timestamp: None,
                errors: vec!["signature mismatch".to_string()],
            },
        };
        Ok(verification)
    }

    async fn encrypt_message(
        &self,
        data: &[u8],
        encryption_keys: &[PublicKeyHandle],
    ) -> KtResult<String> {
        if self.fail_encrypt.load(Ordering::SeqCst) || encryption_keys.is_empty() {
            return Err(KtError::Crypto("encryption refused".into()));
        }
        Ok(format!("sealed:{}", String::from_utf8_lossy(data)))
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub manager: KeyTransparencyManager,
    pub log: Arc<FakeLog>,
    pub gate: Arc<StaticFeatureGate>,
    pub account: Arc<FakeAccount>,
    pub reporter: Arc<RecordingReporter>,
    pub clock: Arc<ManualClock>,
    pub crypto: Arc<FakeCrypto>,
    pub store: Arc<MemoryBlobStore>,
}

impl Harness {
    pub fn new(mode: KtMode, status: KtStatus) -> Self {
        Self::with_account(mode, status, FakeAccount::default_user())
    }

    pub fn with_account(mode: KtMode, status: KtStatus, account: FakeAccount) -> Self {
        init_tracing();
        let log = Arc::new(FakeLog::new(status));
        let gate = Arc::new(StaticFeatureGate::new(mode));
        let account = Arc::new(account);
        let reporter = Arc::new(RecordingReporter::default());
        let clock = Arc::new(ManualClock::new(START));
        let crypto = Arc::new(FakeCrypto::default());
        let store = Arc::new(MemoryBlobStore::new());

        let manager = KeyTransparencyManager::builder()
            .user_id(USER_ID)
            .config(KtConfig::default())
            .crypto(crypto.clone())
            .log_client(log.clone())
            .feature_gate(gate.clone())
            .account(account.clone())
            .blob_store(store.clone())
            .reporter(reporter.clone())
            .clock(clock.clone())
            .build()
            .unwrap();

        Self {
            manager,
            log,
            gate,
            account,
            reporter,
            clock,
            crypto,
            store,
        }
    }

    pub fn storage(&self) -> &UserStorage {
        &self.manager.context().storage
    }

    pub async fn identifier(&self, email: &str) -> String {
        self.manager
            .context()
            .stash
            .email_identifier(USER_ID, email)
            .await
            .unwrap()
    }

    pub async fn set_last_audit(&self, at: i64) {
        self.storage()
            .set_audit_result(&kt_client::AuditResult {
                last_run_timestamp: at,
            })
            .await
            .unwrap();
    }

    pub async fn last_audit(&self) -> Option<i64> {
        self.storage()
            .audit_result()
            .await
            .unwrap()
            .map(|r| r.last_run_timestamp)
    }
}

/// Build a manager over default fakes with the given gate and store
pub fn manager_with(
    gate: Arc<dyn FeatureGate>,
    store: Arc<dyn BlobStore>,
    reporter: Arc<RecordingReporter>,
) -> KeyTransparencyManager {
    init_tracing();
    KeyTransparencyManager::builder()
        .user_id(USER_ID)
        .crypto(Arc::new(FakeCrypto::default()))
        .log_client(Arc::new(FakeLog::new(KtStatus::Verified)))
        .feature_gate(gate)
        .account(Arc::new(FakeAccount::default_user()))
        .blob_store(store)
        .reporter(reporter)
        .clock(Arc::new(ManualClock::new(START)))
        .build()
        .unwrap()
}

// ============================================================================
// Misbehaving collaborators
// ============================================================================

/// Blob store whose removals always fail
#[derive(Debug, Default)]
pub struct FailingRemoveStore {
    pub inner: MemoryBlobStore,
    pub removals: AtomicUsize,
}

#[async_trait]
impl BlobStore for FailingRemoveStore {
    async fn get_item(&self, key: &str) -> KtResult<Option<String>> {
        self.inner.get_item(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> KtResult<()> {
        self.inner.set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> KtResult<bool> {
        self.removals.fetch_add(1, Ordering::SeqCst);
        Err(KtError::StorageWrite(format!("read-only: {}", key)))
    }
}

/// Feature gate that never answers
#[derive(Debug, Default)]
pub struct StalledFeatureGate;

#[async_trait]
impl FeatureGate for StalledFeatureGate {
    async fn mode(&self) -> KtMode {
        std::future::pending().await
    }
}

pub fn recipient_keys() -> Vec<ApiKey> {
    vec![ApiKey::new("recipient-key-1"), ApiKey::new("recipient-key-2")]
}

pub fn active_skl(signature: &str, expected_min_epoch: u64) -> SignedKeyList {
    SignedKeyList {
        data: Some(r#"[{"Fingerprint":"abc","Primary":1}]"#.to_string()),
        signature: Some(signature.to_string()),
        min_epoch_id: None,
        max_epoch_id: None,
        expected_min_epoch_id: Some(expected_min_epoch),
        obsolescence_token: None,
    }
}

pub fn obsolete_skl(expected_min_epoch: u64) -> SignedKeyList {
    SignedKeyList {
        expected_min_epoch_id: Some(expected_min_epoch),
        obsolescence_token: Some("token".to_string()),
        ..Default::default()
    }
}
