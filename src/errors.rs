use thiserror::Error;

/// Every failure this crate surfaces to callers.
///
/// Codec and crypto failures are deliberately coarse: a tampered, truncated
/// or structurally invalid token must never decode to a partially populated
/// value, only to one of these kinds.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token")]
    InvalidToken,

    #[error("sealed bytes shorter than nonce")]
    RawTooShort,

    #[error("invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed")]
    Decrypt,

    #[error("token not found")]
    TokenNotFound,

    #[error("token is empty")]
    TokenIsEmpty,

    #[error("token is expired")]
    TokenIsExpired,

    #[error("remote store rejected write: status {status}")]
    StoreFailed { status: u16 },

    #[error("snapshot i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("token serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("remote request failed: {0}")]
    Http(#[from] reqwest::Error),
}
