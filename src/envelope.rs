use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes128Gcm, Nonce,
};
use rand::RngCore;

use crate::errors::TokenError;

/// AES-128-GCM key length in bytes.
pub const KEY_SIZE: usize = 16;
/// GCM nonce length in bytes.
pub const NONCE_SIZE: usize = 12;

/// Authenticated-encryption envelope around a single symmetric key.
///
/// `seal` draws a fresh random nonce per call and emits
/// `nonce || ciphertext || tag` as one opaque blob; `open` is the exact
/// inverse. Key material is passed in explicitly by the caller, never read
/// from ambient state.
pub struct Envelope {
    cipher: Aes128Gcm,
}

impl Envelope {
    /// Build an envelope from raw key material. The key must be exactly
    /// [`KEY_SIZE`] bytes.
    pub fn new(key: &[u8]) -> Result<Self, TokenError> {
        if key.len() != KEY_SIZE {
            return Err(TokenError::InvalidKeyLength {
                expected: KEY_SIZE,
                got: key.len(),
            });
        }
        let cipher = Aes128Gcm::new_from_slice(key).map_err(|_| TokenError::InvalidKeyLength {
            expected: KEY_SIZE,
            got: key.len(),
        })?;
        Ok(Self { cipher })
    }

    /// Encrypt-and-authenticate `plaintext` under a fresh random nonce.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, TokenError> {
        let nonce_bytes = generate_nonce();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| TokenError::Encrypt)?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypt-and-verify a blob produced by [`Envelope::seal`].
    ///
    /// Any authentication failure (wrong key, flipped bit, truncated tag)
    /// surfaces as [`TokenError::Decrypt`]; there is no lenient mode.
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, TokenError> {
        if sealed.len() < NONCE_SIZE {
            return Err(TokenError::RawTooShort);
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| TokenError::Decrypt)
    }
}

fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}
