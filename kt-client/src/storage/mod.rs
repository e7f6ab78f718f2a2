//! Blob storage
//!
//! [`BlobStore`] is a flat async key/value store owned by the host.
//! [`UserStorage`] scopes it to one user:
//!
//! ```text
//! kt:{user_id}:audit          → AuditResult JSON
//! kt:{user_id}:blob:{id}      → encrypted StashedKeyRecord (id = email identifier or address ID)
//! ```

mod file;
mod memory;

pub use file::FileBlobStore;
pub use memory::MemoryBlobStore;

use async_trait::async_trait;
use shared::models::AuditResult;
use std::fmt;
use std::sync::Arc;

use crate::error::{KtError, KtResult};

const KEY_PREFIX: &str = "kt";

/// Persistent key/value blob storage
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get_item(&self, key: &str) -> KtResult<Option<String>>;

    async fn set_item(&self, key: &str, value: &str) -> KtResult<()>;

    /// Remove a key; returns whether it existed. Missing keys are not an error.
    async fn remove_item(&self, key: &str) -> KtResult<bool>;
}

/// Per-user namespaced handle over a [`BlobStore`]
#[derive(Clone)]
pub struct UserStorage {
    store: Arc<dyn BlobStore>,
    user_id: String,
}

impl UserStorage {
    pub fn new(store: Arc<dyn BlobStore>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Full store key for a blob identifier
    pub fn blob_key(&self, identifier: &str) -> String {
        format!("{}:{}:blob:{}", KEY_PREFIX, self.user_id, identifier)
    }

    fn audit_key(&self) -> String {
        format!("{}:{}:audit", KEY_PREFIX, self.user_id)
    }

    pub async fn get_blob(&self, identifier: &str) -> KtResult<Option<String>> {
        self.store.get_item(&self.blob_key(identifier)).await
    }

    pub async fn set_blob(&self, identifier: &str, value: &str) -> KtResult<()> {
        self.store.set_item(&self.blob_key(identifier), value).await
    }

    pub async fn remove_blob(&self, identifier: &str) -> KtResult<bool> {
        self.store.remove_item(&self.blob_key(identifier)).await
    }

    /// Last self-audit result, if any
    pub async fn audit_result(&self) -> KtResult<Option<AuditResult>> {
        match self.store.get_item(&self.audit_key()).await? {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| KtError::StorageRead(format!("corrupt audit result: {}", e))),
            None => Ok(None),
        }
    }

    pub async fn set_audit_result(&self, result: &AuditResult) -> KtResult<()> {
        let json = serde_json::to_string(result)?;
        self.store.set_item(&self.audit_key(), &json).await
    }
}

impl fmt::Debug for UserStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserStorage")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}
