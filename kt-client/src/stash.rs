//! 暂存记录管理
//!
//! Stashed key records park a recipient's keys until the transparency log
//! includes their signed key list. Records are encrypted to the user's own
//! keys before they reach the blob store.
//!
//! Commit and purge for the same storage key are serialized through a
//! per-key lock: a purge issued while a commit is in flight runs after it and
//! removes what it wrote.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use kt_crypto::HashAlgorithm;
use shared::models::StashedKeyRecord;

use crate::error::{KtError, KtResult};
use crate::provider::{CryptoProvider, PublicKeyHandle};
use crate::storage::UserStorage;

/// Creates, persists and purges [`StashedKeyRecord`]s
#[derive(Clone)]
pub struct StashManager {
    crypto: Arc<dyn CryptoProvider>,
    identifier_bytes: usize,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl StashManager {
    pub fn new(crypto: Arc<dyn CryptoProvider>, identifier_bytes: usize) -> Self {
        Self {
            crypto,
            identifier_bytes,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Derive the storage identifier for an email address
    ///
    /// URL-safe base64 of `SHA-256(user_id || email)`, truncated to the
    /// configured number of digest bytes. The same pair always maps to the
    /// same identifier; the email cannot be recovered from it.
    pub async fn email_identifier(&self, user_id: &str, email: &str) -> KtResult<String> {
        let input = format!("{}{}", user_id, email);
        let digest = self
            .crypto
            .compute_hash(HashAlgorithm::Sha256, input.as_bytes())
            .await?;
        let len = self.identifier_bytes.min(digest.len());
        Ok(URL_SAFE.encode(&digest[..len]))
    }

    /// Encrypt `record` to `verification_keys` and store it under `email_identifier`
    ///
    /// Errors are returned to the caller, which reports them; nothing is retried.
    pub async fn commit(
        &self,
        record: &StashedKeyRecord,
        verification_keys: &[PublicKeyHandle],
        storage: &UserStorage,
        user_id: &str,
        email_identifier: &str,
    ) -> KtResult<()> {
        if storage.user_id() != user_id {
            return Err(KtError::StorageWrite(format!(
                "storage namespace {} does not belong to user {}",
                storage.user_id(),
                user_id
            )));
        }
        if verification_keys.is_empty() {
            return Err(KtError::Crypto("no user keys to encrypt the stash to".into()));
        }

        let plaintext = serde_json::to_vec(record)?;
        let encrypted = self
            .crypto
            .encrypt_message(&plaintext, verification_keys)
            .await?;

        let key = storage.blob_key(email_identifier);
        let lock = self.lock_for(&key);
        let written = {
            let _guard = lock.lock().await;
            storage.set_blob(email_identifier, &encrypted).await
        };
        self.release_lock(&key, lock);
        written?;

        tracing::debug!(
            user_id = %user_id,
            identifier = %email_identifier,
            obsolete = record.is_obsolete,
            min_epoch = record.expected_min_epoch_id,
            "Stashed key record committed"
        );
        Ok(())
    }

    /// Delete the records stored under `identifiers`
    ///
    /// Idempotent: identifiers without a record are skipped. Every identifier
    /// is attempted; the first error (if any) is returned afterwards.
    /// Returns the number of records removed.
    pub async fn purge(&self, storage: &UserStorage, identifiers: &[String]) -> KtResult<usize> {
        let mut removed = 0;
        let mut first_error = None;

        for identifier in identifiers {
            let key = storage.blob_key(identifier);
            let lock = self.lock_for(&key);
            let result = {
                let _guard = lock.lock().await;
                storage.remove_blob(identifier).await
            };
            self.release_lock(&key, lock);
            match result {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(identifier = %identifier, "Failed to purge stashed record: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        tracing::debug!(
            user_id = %storage.user_id(),
            requested = identifiers.len(),
            removed,
            "Stash purge finished"
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the caller's handle and forget the lock once nobody else holds it
    fn release_lock(&self, key: &str, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl std::fmt::Debug for StashManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StashManager")
            .field("identifier_bytes", &self.identifier_bytes)
            .field("locks", &self.locks.len())
            .finish_non_exhaustive()
    }
}
