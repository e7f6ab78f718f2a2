use crate::error::{CryptoError, Result};
use sha2::{Digest, Sha256};
use x509_parser::prelude::*;

const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
const OID_CURVE_P256: &str = "1.2.840.10045.3.1.7";
const OID_ED25519: &str = "1.3.101.112";
const OID_RSA: &str = "1.2.840.113549.1.1.1";

/// Public key algorithm, taken from the SPKI algorithm identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    EcdsaP256,
    Ed25519,
    Rsa,
}

/// Imported public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    algorithm: KeyAlgorithm,
    /// Raw key material (EC point, Ed25519 bytes, or PKCS#1 RSAPublicKey)
    key_bytes: Vec<u8>,
    /// Hex SHA-256 over the SPKI DER
    fingerprint: String,
}

impl PublicKey {
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    pub fn key_bytes(&self) -> &[u8] {
        &self.key_bytes
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// Parse an armored `PUBLIC KEY` (SPKI) block
pub fn parse_public_key(armored: &str) -> Result<PublicKey> {
    let der = decode_pem(armored, "PUBLIC KEY")?;

    let (_, spki) = SubjectPublicKeyInfo::from_der(&der)
        .map_err(|e| CryptoError::InvalidKey(format!("SPKI parse error: {}", e)))?;

    let oid = spki.algorithm.algorithm.to_id_string();
    let algorithm = match oid.as_str() {
        OID_EC_PUBLIC_KEY => {
            let curve = spki
                .algorithm
                .parameters
                .as_ref()
                .and_then(|params| params.as_oid().ok())
                .map(|curve| curve.to_id_string())
                .unwrap_or_default();
            if curve != OID_CURVE_P256 {
                return Err(CryptoError::UnsupportedAlgorithm(format!(
                    "EC curve {}",
                    if curve.is_empty() { "<missing>" } else { &curve }
                )));
            }
            KeyAlgorithm::EcdsaP256
        }
        OID_ED25519 => KeyAlgorithm::Ed25519,
        OID_RSA => KeyAlgorithm::Rsa,
        _ => return Err(CryptoError::UnsupportedAlgorithm(oid)),
    };

    Ok(PublicKey {
        algorithm,
        key_bytes: spki.subject_public_key.data.to_vec(),
        fingerprint: hex::encode(Sha256::digest(&der)),
    })
}

pub(crate) fn decode_pem(pem_str: &str, tag: &str) -> Result<Vec<u8>> {
    let pems =
        ::pem::parse_many(pem_str).map_err(|e| CryptoError::Pem(format!("parse error: {}", e)))?;

    for p in pems {
        if p.tag() == tag {
            return Ok(p.into_contents());
        }
    }

    Err(CryptoError::Pem(format!("tag '{}' not found", tag)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tag() {
        let pem = ::pem::encode(&::pem::Pem::new("CERTIFICATE", vec![1, 2, 3]));
        let err = parse_public_key(&pem).unwrap_err();
        assert!(matches!(err, CryptoError::Pem(_)));
    }

    #[test]
    fn test_garbage_der() {
        let pem = ::pem::encode(&::pem::Pem::new("PUBLIC KEY", vec![0xde, 0xad]));
        let err = parse_public_key(&pem).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKey(_)));
    }
}
