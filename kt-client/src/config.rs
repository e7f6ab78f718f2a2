//! Client configuration

use crate::error::{KtError, KtResult};
use std::path::PathBuf;
use std::time::Duration;

/// Expected interval between transparency log epochs; also the self-audit period
pub const EXP_EPOCH_INTERVAL: Duration = Duration::from_secs(4 * 60 * 60);

/// Maximum digest bytes kept for an email identifier (SHA-256 output)
const MAX_IDENTIFIER_BYTES: usize = 32;

/// Key transparency engine configuration
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | KT_AUDIT_INTERVAL_SECS | 14400 | Self-audit interval |
/// | KT_IDENTIFIER_BYTES | 32 | Digest bytes kept for email identifiers |
/// | KT_STORAGE_DIR | ./kt-storage | Base directory for the file blob store |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KtConfig {
    /// Self-audit interval
    pub audit_interval: Duration,
    /// Number of SHA-256 bytes kept for an email identifier
    pub identifier_bytes: usize,
    /// Base directory for [`crate::FileBlobStore`]
    pub storage_dir: PathBuf,
}

impl KtConfig {
    pub fn new() -> Self {
        Self {
            audit_interval: EXP_EPOCH_INTERVAL,
            identifier_bytes: MAX_IDENTIFIER_BYTES,
            storage_dir: PathBuf::from("./kt-storage"),
        }
    }

    /// 从环境变量加载配置
    ///
    /// Unset or unparsable variables fall back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::new();
        Self {
            audit_interval: std::env::var("KT_AUDIT_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.audit_interval),
            identifier_bytes: std::env::var("KT_IDENTIFIER_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.identifier_bytes),
            storage_dir: std::env::var("KT_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
        }
    }

    /// Set the self-audit interval
    pub fn with_audit_interval(mut self, interval: Duration) -> Self {
        self.audit_interval = interval;
        self
    }

    /// Set the email identifier length in digest bytes
    pub fn with_identifier_bytes(mut self, bytes: usize) -> Self {
        self.identifier_bytes = bytes;
        self
    }

    /// Set the file blob store directory
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    pub fn validate(&self) -> KtResult<()> {
        if self.audit_interval.is_zero() {
            return Err(KtError::InvalidConfig(
                "audit_interval must be greater than zero".into(),
            ));
        }
        if !(1..=MAX_IDENTIFIER_BYTES).contains(&self.identifier_bytes) {
            return Err(KtError::InvalidConfig(format!(
                "identifier_bytes must be within 1..={}, got {}",
                MAX_IDENTIFIER_BYTES, self.identifier_bytes
            )));
        }
        Ok(())
    }

    /// Audit interval in milliseconds, saturating at `i64::MAX`
    pub(crate) fn audit_interval_millis(&self) -> i64 {
        i64::try_from(self.audit_interval.as_millis()).unwrap_or(i64::MAX)
    }
}

impl Default for KtConfig {
    fn default() -> Self {
        Self::new()
    }
}
