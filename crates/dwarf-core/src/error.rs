use thiserror::Error;

/// Errors related to the core types of the shortlink engine.
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
}

/// Errors reported by record store backends.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("short code already exists: {0}")]
    Conflict(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

/// Errors from sealing or opening an encrypted target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    #[error("authentication failed: wrong passphrase or tampered payload")]
    AuthenticationFailed,
    #[error("encryption failed: {0}")]
    Encryption(String),
    #[error("malformed encrypted payload: {0}")]
    MalformedPayload(String),
}

/// Errors surfaced to callers of the [`Shortener`](crate::Shortener) operations.
///
/// `NotFound` deliberately covers missing, expired, exhausted and malformed
/// codes alike.
#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid short code: {0}")]
    InvalidCode(String),
    #[error("invalid use count: {0}")]
    InvalidUses(String),
    #[error("invalid expiration: {0}")]
    InvalidExpiration(String),
    #[error("short code already taken: {0}")]
    CodeTaken(String),
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("no free short code after {attempts} attempts")]
    AllocationExhausted { attempts: u32 },
    #[error("short link not found")]
    NotFound,
    #[error("short link is protected by a passphrase")]
    PasswordRequired,
    #[error("wrong passphrase or tampered link")]
    AuthenticationFailed,
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<CoreError> for ShortenerError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::InvalidShortCode(message) => Self::InvalidCode(message),
        }
    }
}

impl From<StorageError> for ShortenerError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::Conflict(code) => Self::CodeTaken(code),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<CipherError> for ShortenerError {
    fn from(value: CipherError) -> Self {
        match value {
            CipherError::AuthenticationFailed => Self::AuthenticationFailed,
            CipherError::Encryption(message) => Self::EncryptionFailed(message),
            // an unreadable payload cannot be told apart from a tampered one
            CipherError::MalformedPayload(_) => Self::AuthenticationFailed,
        }
    }
}
