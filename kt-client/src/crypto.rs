//! Default [`CryptoProvider`] backed by `kt-crypto`

use async_trait::async_trait;
use kt_crypto::{HashAlgorithm, MessageVerification, PublicKey};

use crate::error::{KtError, KtResult};
use crate::provider::{CryptoProvider, PublicKeyHandle};

/// Crypto provider over ring / sha2 / rsa
///
/// Handles it produces wrap [`kt_crypto::PublicKey`]; foreign handles are
/// rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCryptoProvider;

impl DefaultCryptoProvider {
    fn unwrap_keys(keys: &[PublicKeyHandle]) -> KtResult<Vec<PublicKey>> {
        keys.iter()
            .map(|handle| {
                handle
                    .downcast_ref::<PublicKey>()
                    .cloned()
                    .ok_or_else(|| KtError::Crypto("key handle from another provider".into()))
            })
            .collect()
    }
}

#[async_trait]
impl CryptoProvider for DefaultCryptoProvider {
    async fn compute_hash(&self, algorithm: HashAlgorithm, data: &[u8]) -> KtResult<Vec<u8>> {
        Ok(kt_crypto::compute_hash(algorithm, data))
    }

    async fn import_public_key(&self, armored_key: &str) -> KtResult<PublicKeyHandle> {
        let key = kt_crypto::parse_public_key(armored_key)?;
        Ok(PublicKeyHandle::new(key))
    }

    async fn verify_message(
        &self,
        text_data: &str,
        armored_signature: &str,
        verification_keys: &[PublicKeyHandle],
    ) -> KtResult<MessageVerification> {
        let keys = Self::unwrap_keys(verification_keys)?;
        Ok(kt_crypto::verify_message(
            text_data.as_bytes(),
            armored_signature,
            &keys,
        ))
    }

    async fn encrypt_message(
        &self,
        data: &[u8],
        encryption_keys: &[PublicKeyHandle],
    ) -> KtResult<String> {
        let keys = Self::unwrap_keys(encryption_keys)?;
        Ok(kt_crypto::encrypt_message(data, &keys)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_matches_backend() {
        let provider = DefaultCryptoProvider;
        let digest = provider
            .compute_hash(HashAlgorithm::Sha256, b"abc")
            .await
            .unwrap();
        assert_eq!(digest, kt_crypto::compute_hash(HashAlgorithm::Sha256, b"abc"));
    }

    #[tokio::test]
    async fn test_rejects_foreign_handle() {
        let provider = DefaultCryptoProvider;
        let foreign = PublicKeyHandle::new(42u8);
        let result = provider.encrypt_message(b"data", &[foreign]).await;
        assert!(matches!(result, Err(KtError::Crypto(_))));
    }

    #[tokio::test]
    async fn test_import_rejects_garbage() {
        let provider = DefaultCryptoProvider;
        assert!(provider.import_public_key("not a key").await.is_err());
    }
}
