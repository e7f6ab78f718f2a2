//! Outbound key verification
//!
//! Before a message is encrypted to a recipient, their published keys are
//! checked against the transparency log. When the log has not yet included
//! the recipient's signed key list, the keys are stashed locally so the
//! next self-audit can check them once the epoch lands.

use std::sync::Arc;

use kt_crypto::VerificationStatus;
use shared::error::ErrorCode;
use shared::models::{ApiKey, KtStatus, SignedKeyList, StashedKeyRecord};

use crate::context::KtContext;
use crate::error::{KtError, KtResult};
use crate::provider::PublicKeyHandle;
use crate::telemetry::Report;

const REPORT_CONTEXT: &str = "verifyOutboundPublicKeys";

/// Outcome of [`OutboundKeyVerifier::verify`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Keys are consistent with the log
    Verified,
    /// Verification was skipped on request
    Skipped,
    /// The log has not caught up; `stashed` is the identifier of the record
    /// written for later replay, or `None` if deferral was abandoned
    Pending { stashed: Option<String> },
}

/// Checks recipient keys and defers verification when needed
#[derive(Debug, Clone)]
pub struct OutboundKeyVerifier {
    ctx: Arc<KtContext>,
}

impl OutboundKeyVerifier {
    pub fn new(ctx: Arc<KtContext>) -> Self {
        Self { ctx }
    }

    /// Verify `key_list` for `email`
    ///
    /// A mismatch with the log is returned as [`KtError::KeyMismatch`];
    /// errors from the log client propagate. Failures while deferring are
    /// reported and never fail the call.
    pub async fn verify(
        &self,
        key_list: &[ApiKey],
        email: &str,
        signed_key_list: Option<&SignedKeyList>,
        ignore_kt: bool,
    ) -> KtResult<VerifyOutcome> {
        let status = self
            .ctx
            .log
            .verify_public_keys(key_list, email, signed_key_list, ignore_kt)
            .await?;

        match status {
            KtStatus::Verified => Ok(VerifyOutcome::Verified),
            KtStatus::Skipped => Ok(VerifyOutcome::Skipped),
            KtStatus::Mismatch => {
                tracing::warn!(keys = key_list.len(), "Recipient keys contradict the transparency log");
                Err(KtError::KeyMismatch)
            }
            KtStatus::MinEpochUnresolved => {
                let stashed = match signed_key_list {
                    Some(skl) => match self.stash(key_list, email, skl).await {
                        Ok(identifier) => Some(identifier),
                        Err(report) => {
                            self.ctx.reporter.report(report);
                            None
                        }
                    },
                    None => None,
                };
                Ok(VerifyOutcome::Pending { stashed })
            }
        }
    }

    /// Build and commit a stash record; any failure becomes a [`Report`]
    async fn stash(
        &self,
        key_list: &[ApiKey],
        email: &str,
        skl: &SignedKeyList,
    ) -> Result<String, Report> {
        let ctx = &self.ctx;

        let Some(expected_min_epoch_id) = skl.expected_min_epoch() else {
            return Err(Report::new(ErrorCode::MissingExpectedMinEpoch, REPORT_CONTEXT)
                .with_message("SKL with null MinEpochID has no ExpectedMinEpochID"));
        };

        let email_identifier = ctx
            .stash
            .email_identifier(&ctx.user_id, email)
            .await
            .map_err(|e| Report::from_error(&e, REPORT_CONTEXT))?;

        let creation_timestamp = match (&skl.data, &skl.signature) {
            (Some(data), Some(signature)) => {
                self.signature_timestamp(key_list, data, signature).await?
            }
            _ => ctx.clock.now_millis(),
        };

        let record = StashedKeyRecord {
            public_keys: key_list.iter().map(|key| key.public_key.clone()).collect(),
            expected_min_epoch_id,
            creation_timestamp,
            email_identifier: email_identifier.clone(),
            is_obsolete: !skl.is_active(),
        };

        let user_keys = ctx.account.user_keys().await.map_err(|e| {
            Report::new(ErrorCode::AccountUnavailable, REPORT_CONTEXT)
                .with_detail("errorMessage", e.to_string())
        })?;
        let mut verification_keys = Vec::with_capacity(user_keys.len());
        for user_key in &user_keys {
            let handle = ctx
                .crypto
                .import_public_key(&user_key.public_key)
                .await
                .map_err(|e| {
                    Report::new(ErrorCode::KeyImportFailed, REPORT_CONTEXT)
                        .with_detail("keyId", user_key.id.clone())
                        .with_detail("errorMessage", e.to_string())
                })?;
            verification_keys.push(handle);
        }

        ctx.stash
            .commit(
                &record,
                &verification_keys,
                &ctx.storage,
                &ctx.user_id,
                &email_identifier,
            )
            .await
            .map_err(|e| {
                Report::new(ErrorCode::StashCommitFailed, REPORT_CONTEXT)
                    .with_detail("errorMessage", e.to_string())
            })?;

        tracing::info!(
            identifier = %email_identifier,
            expected_min_epoch_id,
            obsolete = record.is_obsolete,
            "Deferred key verification until log inclusion"
        );
        Ok(email_identifier)
    }

    /// Verify the SKL signature with the recipient's keys and return its creation time
    async fn signature_timestamp(
        &self,
        key_list: &[ApiKey],
        data: &str,
        signature: &str,
    ) -> Result<i64, Report> {
        let crypto = &self.ctx.crypto;

        let mut keys: Vec<PublicKeyHandle> = Vec::with_capacity(key_list.len());
        for key in key_list {
            let handle = crypto.import_public_key(&key.public_key).await.map_err(|e| {
                Report::new(ErrorCode::KeyImportFailed, REPORT_CONTEXT)
                    .with_detail("errorMessage", e.to_string())
            })?;
            keys.push(handle);
        }

        let verification = crypto
            .verify_message(data, signature, &keys)
            .await
            .map_err(|e| {
                Report::new(ErrorCode::SignatureInvalid, REPORT_CONTEXT)
                    .with_detail("errorMessage", e.to_string())
            })?;

        if verification.status != VerificationStatus::SignedAndValid {
            let errors = serde_json::to_string(&verification.errors).unwrap_or_default();
            return Err(Report::new(ErrorCode::SignatureInvalid, REPORT_CONTEXT)
                .with_message("SKL signature verification failed")
                .with_detail("errors", errors));
        }

        verification
            .signature_timestamp
            .ok_or_else(|| Report::new(ErrorCode::MissingSignatureTimestamp, REPORT_CONTEXT))
    }
}
