//! External collaborator interfaces
//!
//! The engine never talks to the network, the feature flag service or the
//! crypto library directly; it goes through these traits.

use async_trait::async_trait;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, RwLock};

use kt_crypto::{HashAlgorithm, MessageVerification};
use shared::models::{Address, ApiKey, KtMode, KtStatus, SignedKeyList, UserKey};

use crate::error::KtResult;
use crate::storage::UserStorage;

// ============================================================================
// CryptoProvider
// ============================================================================

/// Opaque imported public key
///
/// Only the [`CryptoProvider`] that produced a handle can interpret it.
#[derive(Clone)]
pub struct PublicKeyHandle(Arc<dyn Any + Send + Sync>);

impl PublicKeyHandle {
    pub fn new<T: Any + Send + Sync>(key: T) -> Self {
        Self(Arc::new(key))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for PublicKeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PublicKeyHandle(..)")
    }
}

/// Crypto primitives consumed by the verifier and the stash
#[async_trait]
pub trait CryptoProvider: Send + Sync {
    async fn compute_hash(&self, algorithm: HashAlgorithm, data: &[u8]) -> KtResult<Vec<u8>>;

    async fn import_public_key(&self, armored_key: &str) -> KtResult<PublicKeyHandle>;

    /// Verify `armored_signature` over `text_data` against any of the keys
    async fn verify_message(
        &self,
        text_data: &str,
        armored_signature: &str,
        verification_keys: &[PublicKeyHandle],
    ) -> KtResult<MessageVerification>;

    /// Encrypt `data` to the given keys, returning an armored message
    async fn encrypt_message(
        &self,
        data: &[u8],
        encryption_keys: &[PublicKeyHandle],
    ) -> KtResult<String>;
}

// ============================================================================
// LogClient
// ============================================================================

/// Transparency log / key directory client
#[async_trait]
pub trait LogClient: Send + Sync {
    /// Check a recipient's published keys (and SKL) against the log
    async fn verify_public_keys(
        &self,
        key_list: &[ApiKey],
        email: &str,
        signed_key_list: Option<&SignedKeyList>,
        ignore_kt: bool,
    ) -> KtResult<KtStatus>;

    /// Audit the user's own addresses against the current epoch
    ///
    /// Implementations may read and reconcile stashed records through
    /// `storage`.
    async fn audit_addresses(
        &self,
        user_id: &str,
        addresses: &[Address],
        user_keys: &[UserKey],
        storage: &UserStorage,
    ) -> KtResult<()>;
}

// ============================================================================
// FeatureGate
// ============================================================================

/// Key transparency activation flag
#[async_trait]
pub trait FeatureGate: Send + Sync {
    /// Current mode; a flag that cannot be loaded is [`KtMode::Unknown`]
    async fn mode(&self) -> KtMode;
}

/// Feature gate holding a mode set by the host
#[derive(Debug)]
pub struct StaticFeatureGate {
    mode: RwLock<KtMode>,
}

impl StaticFeatureGate {
    pub fn new(mode: KtMode) -> Self {
        Self {
            mode: RwLock::new(mode),
        }
    }

    pub fn set_mode(&self, mode: KtMode) {
        *self.mode.write().unwrap_or_else(|e| e.into_inner()) = mode;
    }
}

impl Default for StaticFeatureGate {
    fn default() -> Self {
        Self::new(KtMode::Unknown)
    }
}

#[async_trait]
impl FeatureGate for StaticFeatureGate {
    async fn mode(&self) -> KtMode {
        *self.mode.read().unwrap_or_else(|e| e.into_inner())
    }
}

// ============================================================================
// AccountProvider
// ============================================================================

/// The signed-in user's own addresses and keys
#[async_trait]
pub trait AccountProvider: Send + Sync {
    async fn addresses(&self) -> KtResult<Vec<Address>>;

    async fn user_keys(&self) -> KtResult<Vec<UserKey>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_feature_gate() {
        let gate = StaticFeatureGate::default();
        assert_eq!(gate.mode().await, KtMode::Unknown);

        gate.set_mode(KtMode::EnableCore);
        assert_eq!(gate.mode().await, KtMode::EnableCore);
    }

    #[test]
    fn test_public_key_handle_downcast() {
        let handle = PublicKeyHandle::new(String::from("armored"));
        assert_eq!(handle.downcast_ref::<String>().map(String::as_str), Some("armored"));
        assert!(handle.downcast_ref::<u32>().is_none());
        assert_eq!(format!("{:?}", handle), "PublicKeyHandle(..)");
    }
}
