//! Telemetry sink
//!
//! Failures inside the engine never propagate to the host; they are turned
//! into [`Report`]s and handed to a [`Reporter`].

use serde::Serialize;
use serde_json::Value;
use shared::error::{ErrorCategory, ErrorCode};
use std::collections::BTreeMap;

use crate::error::KtError;

/// A single telemetry event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub code: ErrorCode,
    pub message: String,
    /// Operation that produced the report (e.g. `verifyOutboundPublicKeys`)
    pub context: &'static str,
    pub details: BTreeMap<String, Value>,
}

impl Report {
    /// Create a report with the default message for `code`
    pub fn new(code: ErrorCode, context: &'static str) -> Self {
        Self {
            code,
            message: code.message().to_string(),
            context,
            details: BTreeMap::new(),
        }
    }

    /// Create a report from an error, keeping its code
    pub fn from_error(err: &KtError, context: &'static str) -> Self {
        Self::new(err.code(), context).with_detail("errorMessage", err.to_string())
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add a detail entry
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }
}

/// Fire-and-forget telemetry sink
///
/// Implementations must not block and must not panic.
pub trait Reporter: Send + Sync {
    fn report(&self, report: Report);
}

/// Reporter that emits each report as a `tracing` warning
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, report: Report) {
        let details = serde_json::to_string(&report.details).unwrap_or_default();
        tracing::warn!(
            code = %report.code,
            category = %report.category(),
            context = report.context,
            details = %details,
            "{}",
            report.message
        );
    }
}
