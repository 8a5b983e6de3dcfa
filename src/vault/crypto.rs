//! Authenticated encryption for the credential store.
//!
//! Blob layout: `nonce (12) || ciphertext || tag (16)`, ChaCha20-Poly1305.
//! On disk the blob is stored as standard base64 text.

use base64::{
    engine::general_purpose::{STANDARD as BASE64, URL_SAFE},
    Engine,
};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use std::fmt;
use zeroize::Zeroizing;

use super::VaultError;

/// Symmetric key size in bytes.
pub const KEY_SIZE: usize = 32;

/// Nonce size in bytes.
pub const NONCE_SIZE: usize = 12;

/// Poly1305 tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Key that seals and opens the credential store. Wiped on drop.
pub struct SymmetricKey(Zeroizing<[u8; KEY_SIZE]>);

impl SymmetricKey {
    /// Accept either the raw key bytes or base64 text of them.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() == KEY_SIZE {
            let mut key = Zeroizing::new([0u8; KEY_SIZE]);
            key.copy_from_slice(bytes);
            return Some(Self(key));
        }

        let text = bytes.trim_ascii();
        let decoded = BASE64
            .decode(text)
            .or_else(|_| URL_SAFE.decode(text))
            .ok()
            .map(Zeroizing::new)?;
        if decoded.len() != KEY_SIZE {
            return None;
        }
        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        key.copy_from_slice(&decoded);
        Some(Self(key))
    }

    fn cipher(&self) -> Result<ChaCha20Poly1305, VaultError> {
        ChaCha20Poly1305::new_from_slice(self.0.as_slice()).map_err(|_| VaultError::DecryptionFailed)
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

/// Encrypt `plaintext` under a fresh random nonce.
pub fn seal(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = key
        .cipher()?
        .encrypt(nonce, plaintext)
        .map_err(|_| VaultError::EncryptionFailed)?;

    let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Authenticate and decrypt a blob produced by [`seal`].
pub fn unseal(key: &SymmetricKey, blob: &[u8]) -> Result<Zeroizing<Vec<u8>>, VaultError> {
    if blob.len() < NONCE_SIZE + TAG_SIZE {
        return Err(VaultError::DecryptionFailed);
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_SIZE);

    key.cipher()?
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| VaultError::DecryptionFailed)
}

/// Base64 text form of a blob, as written to disk.
pub fn encode_blob(blob: &[u8]) -> String {
    BASE64.encode(blob)
}

/// Decode the on-disk text form. Surrounding whitespace is ignored.
pub fn decode_blob(text: &[u8]) -> Result<Vec<u8>, VaultError> {
    Ok(BASE64.decode(text.trim_ascii())?)
}
