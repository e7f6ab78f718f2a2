use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("PEM error: {0}")]
    Pem(String),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Unsupported algorithm OID: {0}")]
    UnsupportedAlgorithm(String),
    #[error("Signing failed: {0}")]
    Signing(String),
    #[error("Encryption failed: {0}")]
    Encryption(String),
    #[error("Decryption failed: {0}")]
    Decryption(String),
    #[error("Random generation failed")]
    Random,
}

pub type Result<T> = std::result::Result<T, CryptoError>;
