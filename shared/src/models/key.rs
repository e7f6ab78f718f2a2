//! Published keys and signed key lists

use serde::{Deserialize, Serialize};

/// A public key as returned by the key directory for a recipient address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiKey {
    /// Armored public key
    pub public_key: String,
    /// Key flags bitmask (encrypt / verify / obsolete)
    #[serde(default)]
    pub flags: u32,
}

impl ApiKey {
    pub fn new(public_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            flags: 0,
        }
    }
}

/// Signed statement of which public keys are currently valid for an address
///
/// `data` and `signature` are both absent for an obsolescent list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignedKeyList {
    pub data: Option<String>,
    /// Armored detached signature over `data`
    pub signature: Option<String>,
    #[serde(rename = "MinEpochID")]
    pub min_epoch_id: Option<u64>,
    #[serde(rename = "MaxEpochID")]
    pub max_epoch_id: Option<u64>,
    /// Epoch the server promises the list will be included from
    #[serde(rename = "ExpectedMinEpochID")]
    pub expected_min_epoch_id: Option<u64>,
    pub obsolescence_token: Option<String>,
}

impl SignedKeyList {
    /// An SKL is active when it carries both data and signature
    pub fn is_active(&self) -> bool {
        self.data.is_some() && self.signature.is_some()
    }

    /// Expected epoch, treating a zero ID as absent
    pub fn expected_min_epoch(&self) -> Option<u64> {
        self.expected_min_epoch_id.filter(|id| *id != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_directory_payload() {
        let json = r#"{
            "Data": "[{\"Fingerprint\":\"abc\"}]",
            "Signature": "-----BEGIN SIGNATURE-----",
            "MinEpochID": null,
            "MaxEpochID": null,
            "ExpectedMinEpochID": 42
        }"#;
        let skl: SignedKeyList = serde_json::from_str(json).unwrap();
        assert!(skl.is_active());
        assert_eq!(skl.expected_min_epoch(), Some(42));
        assert!(skl.obsolescence_token.is_none());
    }

    #[test]
    fn test_obsolescent_and_zero_epoch() {
        let skl = SignedKeyList {
            expected_min_epoch_id: Some(0),
            ..Default::default()
        };
        assert!(!skl.is_active());
        assert_eq!(skl.expected_min_epoch(), None);
    }

    #[test]
    fn test_api_key_flags_default() {
        let key: ApiKey = serde_json::from_str(r#"{"PublicKey":"armored"}"#).unwrap();
        assert_eq!(key, ApiKey::new("armored"));
    }
}
