//! Hybrid encryption of local blobs
//!
//! The payload is sealed with AES-256-GCM under a fresh content key; the
//! content key is wrapped for every recipient with RSA PKCS#1 v1.5.
//!
//! Packet layout (inside PEM `KT MESSAGE`):
//!
//! ```text
//! u16 recipient_count
//! repeat recipient_count: u16 len | wrapped content key
//! 12-byte nonce
//! ciphertext || tag
//! ```

use crate::error::{CryptoError, Result};
use crate::keys::{KeyAlgorithm, PublicKey, decode_pem};
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

const MESSAGE_TAG: &str = "KT MESSAGE";
const CONTENT_KEY_LEN: usize = 32;

/// Encrypt `data` so that any of `recipients` can decrypt it
pub fn encrypt_message(data: &[u8], recipients: &[PublicKey]) -> Result<String> {
    if recipients.is_empty() {
        return Err(CryptoError::Encryption("no recipients".into()));
    }
    let count = u16::try_from(recipients.len())
        .map_err(|_| CryptoError::Encryption("too many recipients".into()))?;

    let rng = SystemRandom::new();
    let mut content_key = [0u8; CONTENT_KEY_LEN];
    rng.fill(&mut content_key).map_err(|_| CryptoError::Random)?;
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes).map_err(|_| CryptoError::Random)?;

    let mut packet = count.to_be_bytes().to_vec();
    let mut os_rng = rand::thread_rng();
    for recipient in recipients {
        if recipient.algorithm() != KeyAlgorithm::Rsa {
            return Err(CryptoError::Encryption(
                "Encryption is only supported for RSA keys".into(),
            ));
        }
        let public_key = RsaPublicKey::from_pkcs1_der(recipient.key_bytes())
            .map_err(|e| CryptoError::InvalidKey(format!("Invalid RSA public key: {}", e)))?;
        let wrapped = public_key
            .encrypt(&mut os_rng, Pkcs1v15Encrypt, &content_key)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;
        let len = u16::try_from(wrapped.len())
            .map_err(|_| CryptoError::Encryption("wrapped key too large".into()))?;
        packet.extend_from_slice(&len.to_be_bytes());
        packet.extend_from_slice(&wrapped);
    }

    let key = LessSafeKey::new(
        UnboundKey::new(&AES_256_GCM, &content_key)
            .map_err(|_| CryptoError::Encryption("invalid content key".into()))?,
    );
    let mut in_out = data.to_vec();
    key.seal_in_place_append_tag(
        Nonce::assume_unique_for_key(nonce_bytes),
        Aad::empty(),
        &mut in_out,
    )
    .map_err(|_| CryptoError::Encryption("seal failed".into()))?;

    packet.extend_from_slice(&nonce_bytes);
    packet.extend_from_slice(&in_out);
    Ok(::pem::encode(&::pem::Pem::new(MESSAGE_TAG, packet)))
}

/// Decrypt a message produced by [`encrypt_message`] with a PKCS#8 RSA key
pub fn decrypt_message(armored: &str, priv_key_pem: &str) -> Result<Vec<u8>> {
    let packet = decode_pem(armored, MESSAGE_TAG)?;
    let private_key = RsaPrivateKey::from_pkcs8_pem(priv_key_pem)
        .map_err(|e| CryptoError::InvalidKey(format!("Invalid RSA private key: {}", e)))?;

    let mut cursor = Cursor::new(&packet);
    let count = cursor.read_u16()?;
    let mut content_key = None;
    for _ in 0..count {
        let len = cursor.read_u16()? as usize;
        let wrapped = cursor.take(len)?;
        if content_key.is_none()
            && let Ok(key) = private_key.decrypt(Pkcs1v15Encrypt, wrapped)
        {
            content_key = Some(key);
        }
    }
    let content_key = content_key
        .ok_or_else(|| CryptoError::Decryption("no wrapped key matches the private key".into()))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    nonce_bytes.copy_from_slice(cursor.take(NONCE_LEN)?);
    let mut in_out = cursor.rest().to_vec();

    let key = LessSafeKey::new(
        UnboundKey::new(&AES_256_GCM, &content_key)
            .map_err(|_| CryptoError::Decryption("invalid content key".into()))?,
    );
    let plaintext = key
        .open_in_place(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| CryptoError::Decryption("authentication failed".into()))?;
    Ok(plaintext.to_vec())
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| CryptoError::Decryption("truncated packet".into()))?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }
}
