//! # kt-crypto
//!
//! Default crypto backend for key transparency verification.
//!
//! ## Scope
//!
//! This crate wires existing primitives (ring, sha2, rsa, x509-parser)
//! into the handful of operations the verification engine needs:
//! - Digest computation (SHA-256 / SHA-512)
//! - Importing armored SPKI public keys (ECDSA P-256, Ed25519, RSA)
//! - Timestamped detached signatures over signed key list data
//! - Hybrid encryption of local blobs to a set of RSA keys
//!
//! ## Example
//!
//! ```ignore
//! use kt_crypto::{parse_public_key, sign_message, verify_message, VerificationStatus};
//!
//! let armored = sign_message(&private_key_pem, b"skl data", created_at)?;
//! let key = parse_public_key(&public_key_pem)?;
//! let result = verify_message(b"skl data", &armored, &[key]);
//! assert_eq!(result.status, VerificationStatus::SignedAndValid);
//! ```

mod error;
mod hash;
mod keys;
mod seal;
mod signature;

pub use error::{CryptoError, Result};
pub use hash::{HashAlgorithm, compute_hash};
pub use keys::{KeyAlgorithm, PublicKey, parse_public_key};
pub use seal::{decrypt_message, encrypt_message};
pub use signature::{MessageVerification, VerificationStatus, sign_message, verify_message};
