//! Error types for seedkeep

use thiserror::Error;

/// Main error type for seedkeep operations
#[derive(Error, Debug)]
pub enum SeedKeepError {
    // Input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bad parameters: {0}")]
    BadParameters(String),

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    // Chunked storage errors
    #[error("No chunked data for prefix {0}")]
    NoData(String),

    // Seed store errors
    #[error("Account does not hold encrypted seed in data: {0}")]
    AccountNoSeedData(String),

    #[error("Bad credentials for account {0}")]
    InvalidPassword(String),

    #[error("Account does not exist: {0}")]
    AccountNotExist(String),

    // Cryptographic errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    // External collaborator errors
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Internal errors
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl SeedKeepError {
    /// HTTP-style status code for API layers built on top of this crate
    pub fn status_code(&self) -> u16 {
        match self {
            SeedKeepError::InvalidInput(_)
            | SeedKeepError::BadParameters(_)
            | SeedKeepError::InvalidKeyFormat(_) => 400,
            SeedKeepError::InvalidPassword(_) => 401,
            SeedKeepError::Unauthorized(_) => 403,
            SeedKeepError::AccountNotExist(_) | SeedKeepError::NotFound(_) => 404,
            SeedKeepError::NoData(_) | SeedKeepError::AccountNoSeedData(_) => 422,
            SeedKeepError::Timeout(_) => 504,
            _ => 500,
        }
    }

    /// Whether this error reports an unknown entity on the external side
    pub fn is_not_found(&self) -> bool {
        matches!(self, SeedKeepError::NotFound(_))
    }
}

impl From<serde_json::Error> for SeedKeepError {
    fn from(err: serde_json::Error) -> Self {
        SeedKeepError::InvalidInput(format!("JSON error: {}", err))
    }
}

impl From<hex::FromHexError> for SeedKeepError {
    fn from(err: hex::FromHexError) -> Self {
        SeedKeepError::InvalidKeyFormat(format!("Hex decode error: {}", err))
    }
}

impl From<bs58::decode::Error> for SeedKeepError {
    fn from(err: bs58::decode::Error) -> Self {
        SeedKeepError::InvalidKeyFormat(format!("Base58 decode error: {}", err))
    }
}

impl From<base64::DecodeError> for SeedKeepError {
    fn from(err: base64::DecodeError) -> Self {
        SeedKeepError::InvalidInput(format!("Base64 decode error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, SeedKeepError>;
