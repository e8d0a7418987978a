//! Credential cipher for provider API tokens at rest.
//!
//! Every call derives a fresh 256-bit key from the process secret and a random
//! 16-byte salt (Argon2id), then seals with AES-256-GCM under a random 96-bit
//! nonce. The stored form is `salt:nonce:tag:ciphertext`, each field lowercase hex.

use std::sync::Arc;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::error::TrackerError;

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    /// Payload is malformed or failed authentication.
    #[error("corrupt credential")]
    Corrupt,
    #[error("key derivation failed: {0}")]
    KeyDerivation(argon2::Error),
    #[error("encryption failed")]
    Encrypt,
    #[error("cipher worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl From<CipherError> for TrackerError {
    fn from(e: CipherError) -> Self {
        match e {
            CipherError::Corrupt => TrackerError::CorruptCredential,
            other => TrackerError::Internal(anyhow::Error::new(other).context("credential cipher")),
        }
    }
}

#[derive(Clone)]
pub struct CredentialCipher {
    secret: Arc<[u8]>,
    params: Params,
}

impl CredentialCipher {
    /// Cipher with Argon2id default cost parameters.
    pub fn new(secret: &str) -> Self {
        Self::with_params(secret, Params::default())
    }

    /// Cipher with explicit Argon2 cost parameters. Ciphertext only opens under
    /// the parameters it was sealed with.
    pub fn with_params(secret: &str, params: Params) -> Self {
        Self {
            secret: Arc::from(secret.as_bytes()),
            params,
        }
    }

    fn derive_key(&self, salt: &[u8]) -> Result<[u8; KEY_LEN], CipherError> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        let mut key = [0u8; KEY_LEN];
        argon2
            .hash_password_into(&self.secret, salt, &mut key)
            .map_err(CipherError::KeyDerivation)?;
        Ok(key)
    }

    /// Encrypt on the calling thread. Prefer [`CredentialCipher::encrypt`] from async code.
    pub fn seal(&self, plaintext: &str) -> Result<String, CipherError> {
        let salt: [u8; SALT_LEN] = rand::random();
        let nonce: [u8; NONCE_LEN] = rand::random();
        let key = self.derive_key(&salt)?;
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CipherError::Encrypt)?;
        let mut sealed = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| CipherError::Encrypt)?;
        // aes-gcm appends the tag to the ciphertext.
        let tag = sealed.split_off(sealed.len() - TAG_LEN);
        Ok(format!(
            "{}:{}:{}:{}",
            hex::encode(salt),
            hex::encode(nonce),
            hex::encode(tag),
            hex::encode(sealed)
        ))
    }

    /// Decrypt on the calling thread. Prefer [`CredentialCipher::decrypt`] from async code.
    pub fn open(&self, payload: &str) -> Result<String, CipherError> {
        let fields: Vec<&str> = payload.split(':').collect();
        let [salt, nonce, tag, ciphertext] = fields.as_slice() else {
            return Err(CipherError::Corrupt);
        };
        let salt = decode_exact(salt, Some(SALT_LEN))?;
        let nonce = decode_exact(nonce, Some(NONCE_LEN))?;
        let tag = decode_exact(tag, Some(TAG_LEN))?;
        let mut sealed = decode_exact(ciphertext, None)?;
        sealed.extend_from_slice(&tag);

        let key = self.derive_key(&salt)?;
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CipherError::Corrupt)?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce), sealed.as_slice())
            .map_err(|_| CipherError::Corrupt)?;
        String::from_utf8(plaintext).map_err(|_| CipherError::Corrupt)
    }

    /// Encrypt on the blocking pool; key derivation is memory-hard.
    pub async fn encrypt(&self, plaintext: String) -> Result<String, CipherError> {
        let cipher = self.clone();
        tokio::task::spawn_blocking(move || cipher.seal(&plaintext)).await?
    }

    /// Decrypt on the blocking pool.
    pub async fn decrypt(&self, payload: String) -> Result<String, CipherError> {
        let cipher = self.clone();
        tokio::task::spawn_blocking(move || cipher.open(&payload)).await?
    }
}

fn decode_exact(field: &str, len: Option<usize>) -> Result<Vec<u8>, CipherError> {
    // Stored form is lowercase; anything else was not produced by `seal`.
    if field.bytes().any(|b| b.is_ascii_uppercase()) {
        return Err(CipherError::Corrupt);
    }
    let bytes = hex::decode(field).map_err(|_| CipherError::Corrupt)?;
    match len {
        Some(n) if bytes.len() != n => Err(CipherError::Corrupt),
        _ => Ok(bytes),
    }
}
