//! Encrypted-at-rest broker credentials.
//!
//! The secrets file holds one authenticated ciphertext wrapping the record
//! `host:port:username:password`. The key lives in a separate local file.
//! Decryption fails closed: a wrong key, a modified blob or a malformed
//! record all yield no credentials at all.
//!
//! ## Usage
//!
//! ```ignore
//! let vault = CredentialVault::new("config/key.bin", "config/credentials.bin");
//! match vault.load() {
//!     Ok(descriptor) => connect(&descriptor.host, descriptor.port),
//!     Err(e) if e.is_key_unavailable() => eprintln!("could not load key: {e}"),
//!     Err(e) => eprintln!("could not decrypt credentials: {e}"),
//! }
//! ```

pub mod credentials;
pub mod crypto;
pub mod storage;

pub use credentials::{ConnectionDescriptor, RecordError};
pub use crypto::{decode_blob, encode_blob, SymmetricKey, KEY_SIZE};

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Why no credentials could be produced.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("could not load symmetric key from {}: {source}", .path.display())]
    KeyUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} does not contain a {}-byte symmetric key", .path.display(), KEY_SIZE)]
    InvalidKey { path: PathBuf },

    #[error("secrets blob {} is missing or unreadable: {source}", .path.display())]
    BlobUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("secrets blob is not valid base64")]
    Encoding(#[from] base64::DecodeError),

    #[error("decryption failed - invalid ciphertext or wrong key")]
    DecryptionFailed,

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decrypted record is malformed: {0}")]
    MalformedRecord(#[from] RecordError),
}

impl VaultError {
    /// The key itself could not be obtained, as opposed to a bad blob.
    pub fn is_key_unavailable(&self) -> bool {
        matches!(self, Self::KeyUnavailable { .. } | Self::InvalidKey { .. })
    }
}

/// A source of broker credentials for the bootstrap gate.
pub trait SecretSource {
    fn load(&self) -> Result<ConnectionDescriptor, VaultError>;
}

/// Decrypt a raw blob into a descriptor, reporting why on failure.
pub fn open(key: &SymmetricKey, blob: &[u8]) -> Result<ConnectionDescriptor, VaultError> {
    let plaintext = crypto::unseal(key, blob)?;
    Ok(ConnectionDescriptor::parse_bytes(&plaintext)?)
}

/// Decrypt a raw blob into a descriptor, or nothing.
pub fn decrypt(key: &SymmetricKey, blob: &[u8]) -> Option<ConnectionDescriptor> {
    open(key, blob).ok()
}

/// Encrypt a descriptor into a raw blob.
pub fn seal(key: &SymmetricKey, descriptor: &ConnectionDescriptor) -> Result<Vec<u8>, VaultError> {
    crypto::seal(key, descriptor.to_record().as_bytes())
}

/// File-backed credential store: a key file and a base64 secrets blob.
#[derive(Debug, Clone)]
pub struct CredentialVault {
    key_path: PathBuf,
    blob_path: PathBuf,
}

impl CredentialVault {
    pub fn new(key_path: impl Into<PathBuf>, blob_path: impl Into<PathBuf>) -> Self {
        Self {
            key_path: key_path.into(),
            blob_path: blob_path.into(),
        }
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    pub fn blob_path(&self) -> &Path {
        &self.blob_path
    }

    /// Read the symmetric key file.
    pub fn load_key(&self) -> Result<SymmetricKey, VaultError> {
        let bytes = storage::read_secret(&self.key_path).map_err(|source| VaultError::KeyUnavailable {
            path: self.key_path.clone(),
            source,
        })?;
        SymmetricKey::from_bytes(&bytes).ok_or_else(|| VaultError::InvalidKey {
            path: self.key_path.clone(),
        })
    }

    /// Read and decode the secrets blob.
    pub fn read_blob(&self) -> Result<Vec<u8>, VaultError> {
        let text = storage::read_secret(&self.blob_path).map_err(|source| VaultError::BlobUnavailable {
            path: self.blob_path.clone(),
            source,
        })?;
        decode_blob(&text)
    }
}

impl SecretSource for CredentialVault {
    fn load(&self) -> Result<ConnectionDescriptor, VaultError> {
        // No blob, nothing to decrypt: the key is never touched.
        let blob = self.read_blob()?;
        let key = self.load_key()?;
        let descriptor = open(&key, &blob)?;
        debug!(blob = %self.blob_path.display(), "credentials decrypted");
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn key(byte: u8) -> SymmetricKey {
        SymmetricKey::from_bytes(&[byte; KEY_SIZE]).unwrap()
    }

    fn sealed_record(key: &SymmetricKey, record: &str) -> Vec<u8> {
        crypto::seal(key, record.as_bytes()).unwrap()
    }

    #[test]
    fn test_decrypt_round_trip() {
        let k = key(1);
        let blob = sealed_record(&k, "h:1883:u:p");
        let descriptor = decrypt(&k, &blob).unwrap();
        assert_eq!(descriptor.to_record().as_str(), "h:1883:u:p");
    }

    #[test]
    fn test_seal_descriptor() {
        let k = key(1);
        let original = ConnectionDescriptor::new("broker.example.com", 8883, "alice", "secret");
        let blob = seal(&k, &original).unwrap();
        assert_eq!(decrypt(&k, &blob).unwrap(), original);
    }

    #[test]
    fn test_wrong_key_yields_nothing() {
        let blob = sealed_record(&key(1), "h:1883:u:p");
        assert!(decrypt(&key(2), &blob).is_none());
        assert!(matches!(open(&key(2), &blob).unwrap_err(), VaultError::DecryptionFailed));
    }

    #[test]
    fn test_wrong_field_count_yields_nothing() {
        let k = key(1);
        let blob = sealed_record(&k, "h:1883:u");
        assert!(matches!(
            open(&k, &blob).unwrap_err(),
            VaultError::MalformedRecord(RecordError::FieldCount(3))
        ));
    }

    #[test]
    fn test_vault_from_files() {
        let dir = TempDir::new().unwrap();
        let vault = CredentialVault::new(dir.path().join("key.bin"), dir.path().join("credentials.bin"));
        let k = key(5);
        storage::write_secret(vault.key_path(), &[5u8; KEY_SIZE]).unwrap();
        storage::write_secret(
            vault.blob_path(),
            encode_blob(&sealed_record(&k, "broker.example.com:8883:alice:secret")).as_bytes(),
        )
        .unwrap();

        let descriptor = vault.load().unwrap();
        assert_eq!(descriptor.host, "broker.example.com");
        assert_eq!(descriptor.port, 8883);
    }

    #[test]
    fn test_missing_blob_is_not_a_key_error() {
        let dir = TempDir::new().unwrap();
        let vault = CredentialVault::new(dir.path().join("key.bin"), dir.path().join("credentials.bin"));
        fs::write(vault.key_path(), [5u8; KEY_SIZE]).unwrap();

        let err = vault.load().unwrap_err();
        assert!(matches!(err, VaultError::BlobUnavailable { .. }));
        assert!(!err.is_key_unavailable());
    }

    #[test]
    fn test_missing_key_is_reported_distinctly() {
        let dir = TempDir::new().unwrap();
        let vault = CredentialVault::new(dir.path().join("key.bin"), dir.path().join("credentials.bin"));
        fs::write(vault.blob_path(), encode_blob(&sealed_record(&key(5), "h:1:u:p"))).unwrap();

        let err = vault.load().unwrap_err();
        assert!(matches!(err, VaultError::KeyUnavailable { .. }));
        assert!(err.is_key_unavailable());
    }

    #[test]
    fn test_short_key_file_is_invalid_key() {
        let dir = TempDir::new().unwrap();
        let vault = CredentialVault::new(dir.path().join("key.bin"), dir.path().join("credentials.bin"));
        fs::write(vault.key_path(), b"too short").unwrap();
        fs::write(vault.blob_path(), encode_blob(&sealed_record(&key(5), "h:1:u:p"))).unwrap();

        let err = vault.load().unwrap_err();
        assert!(matches!(err, VaultError::InvalidKey { .. }));
        assert!(err.is_key_unavailable());
    }

    #[test]
    fn test_error_messages_never_contain_secrets() {
        let k = key(1);
        let blob = sealed_record(&k, "h:notaport:alice:topsecret");
        let message = open(&k, &blob).unwrap_err().to_string();
        assert!(!message.contains("topsecret"));
        assert!(!message.contains("alice"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_any_flipped_byte_fails_closed(index in 0usize..(12 + 10 + 16), flip in 1u8..=255) {
            let k = key(9);
            let mut blob = sealed_record(&k, "h:1883:u:p");
            prop_assert_eq!(blob.len(), 12 + 10 + 16);
            blob[index] ^= flip;
            prop_assert!(decrypt(&k, &blob).is_none());
        }
    }
}
