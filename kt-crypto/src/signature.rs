//! Timestamped detached signatures
//!
//! Envelope: PEM `SIGNATURE` whose contents are the 8-byte big-endian creation
//! time (unix millis) followed by the raw signature. The signed message is
//! `creation_time || data`, so the timestamp cannot be altered independently.

use crate::error::{CryptoError, Result};
use crate::keys::{KeyAlgorithm, PublicKey, decode_pem};
use ring::{rand as ring_rand, signature};

const SIGNATURE_TAG: &str = "SIGNATURE";
const TIMESTAMP_LEN: usize = 8;

/// Outcome category of a signature check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    NotSigned,
    SignedAndValid,
    SignedAndInvalid,
}

/// Result of [`verify_message`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageVerification {
    pub status: VerificationStatus,
    /// Creation time of the valid signature (unix millis)
    pub signature_timestamp: Option<i64>,
    pub errors: Vec<String>,
}

impl MessageVerification {
    fn failed(status: VerificationStatus, errors: Vec<String>) -> Self {
        Self {
            status,
            signature_timestamp: None,
            errors,
        }
    }
}

/// Sign `data` with a PKCS#8 private key (ECDSA P-256, Ed25519 or RSA)
pub fn sign_message(priv_key_pem: &str, data: &[u8], created_at: i64) -> Result<String> {
    let der = decode_pem(priv_key_pem, "PRIVATE KEY")?;
    let message = signed_bytes(created_at, data);

    let rng = ring_rand::SystemRandom::new();
    let sig = if let Ok(key_pair) = signature::EcdsaKeyPair::from_pkcs8(
        &signature::ECDSA_P256_SHA256_ASN1_SIGNING,
        &der,
        &rng,
    ) {
        key_pair
            .sign(&rng, &message)
            .map_err(|e| CryptoError::Signing(e.to_string()))?
            .as_ref()
            .to_vec()
    } else if let Ok(key_pair) = signature::Ed25519KeyPair::from_pkcs8_maybe_unchecked(&der) {
        key_pair.sign(&message).as_ref().to_vec()
    } else if let Ok(key_pair) = signature::RsaKeyPair::from_pkcs8(&der) {
        let mut sig = vec![0; key_pair.public().modulus_len()];
        key_pair
            .sign(&signature::RSA_PKCS1_SHA256, &rng, &message, &mut sig)
            .map_err(|e| CryptoError::Signing(e.to_string()))?;
        sig
    } else {
        return Err(CryptoError::Signing(
            "Unsupported or invalid private key format".into(),
        ));
    };

    let mut contents = created_at.to_be_bytes().to_vec();
    contents.extend_from_slice(&sig);
    Ok(::pem::encode(&::pem::Pem::new(SIGNATURE_TAG, contents)))
}

/// Verify an armored signature against any of `keys`
///
/// Never fails: problems are reported through `status` and `errors`.
pub fn verify_message(data: &[u8], armored_signature: &str, keys: &[PublicKey]) -> MessageVerification {
    let contents = match decode_pem(armored_signature, SIGNATURE_TAG) {
        Ok(c) => c,
        Err(e) => return MessageVerification::failed(VerificationStatus::NotSigned, vec![e.to_string()]),
    };
    if contents.len() <= TIMESTAMP_LEN {
        return MessageVerification::failed(
            VerificationStatus::NotSigned,
            vec!["signature packet too short".into()],
        );
    }

    let (ts_bytes, sig) = contents.split_at(TIMESTAMP_LEN);
    let mut ts = [0u8; TIMESTAMP_LEN];
    ts.copy_from_slice(ts_bytes);
    let created_at = i64::from_be_bytes(ts);
    let message = signed_bytes(created_at, data);

    if keys.is_empty() {
        return MessageVerification::failed(
            VerificationStatus::SignedAndInvalid,
            vec!["no verification keys".into()],
        );
    }

    let mut errors = Vec::new();
    for key in keys {
        let alg: &'static dyn signature::VerificationAlgorithm = match key.algorithm() {
            KeyAlgorithm::EcdsaP256 => &signature::ECDSA_P256_SHA256_ASN1,
            KeyAlgorithm::Ed25519 => &signature::ED25519,
            KeyAlgorithm::Rsa => &signature::RSA_PKCS1_2048_8192_SHA256,
        };
        let peer = signature::UnparsedPublicKey::new(alg, key.key_bytes());
        match peer.verify(&message, sig) {
            Ok(()) => {
                return MessageVerification {
                    status: VerificationStatus::SignedAndValid,
                    signature_timestamp: Some(created_at),
                    errors: Vec::new(),
                };
            }
            Err(_) => errors.push(format!("signature does not verify with key {}", key.fingerprint())),
        }
    }

    tracing::debug!(keys = keys.len(), "Signature did not verify with any key");
    MessageVerification::failed(VerificationStatus::SignedAndInvalid, errors)
}

fn signed_bytes(created_at: i64, data: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(TIMESTAMP_LEN + data.len());
    message.extend_from_slice(&created_at.to_be_bytes());
    message.extend_from_slice(data);
    message
}
