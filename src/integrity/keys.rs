//! Trusted public keys for artifact verification.
//!
//! The key file is PEM. The algorithm is taken from the key itself:
//! - RSA (SubjectPublicKeyInfo or PKCS#1) selects RSASSA-PSS over SHA-256
//! - Ed25519 (SubjectPublicKeyInfo) selects plain Ed25519

use rsa::pss;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading a trusted key.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("could not read public key {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("public key is not a supported PEM key (RSA or Ed25519)")]
    UnsupportedFormat,
}

/// A public key the device trusts to sign its artifacts.
pub enum TrustedKey {
    RsaPss {
        key: pss::VerifyingKey<Sha256>,
        modulus_bits: usize,
    },
    Ed25519(ed25519_dalek::VerifyingKey),
}

impl TrustedKey {
    /// Parse a PEM-encoded public key.
    pub fn from_pem(pem: &str) -> Result<Self, KeyError> {
        if let Ok(key) = <RsaPublicKey as rsa::pkcs8::DecodePublicKey>::from_public_key_pem(pem) {
            return Ok(Self::rsa(key));
        }
        if let Ok(key) = <RsaPublicKey as rsa::pkcs1::DecodeRsaPublicKey>::from_pkcs1_pem(pem) {
            return Ok(Self::rsa(key));
        }
        if let Ok(key) =
            <ed25519_dalek::VerifyingKey as ed25519_dalek::pkcs8::DecodePublicKey>::from_public_key_pem(pem)
        {
            return Ok(Self::Ed25519(key));
        }
        Err(KeyError::UnsupportedFormat)
    }

    /// Read and parse the PEM key at `path`.
    pub fn load(path: &Path) -> Result<Self, KeyError> {
        let pem = fs::read_to_string(path).map_err(|source| KeyError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_pem(&pem)
    }

    /// Wrap an RSA key for PSS verification with the maximum salt length.
    pub fn rsa(key: RsaPublicKey) -> Self {
        let modulus_bits = key.n().bits();
        let salt_len = max_pss_salt_len(&key);
        Self::RsaPss {
            key: pss::VerifyingKey::new_with_salt_len(key, salt_len),
            modulus_bits,
        }
    }

    /// Short algorithm name for diagnostics.
    pub fn algorithm(&self) -> &'static str {
        match self {
            Self::RsaPss { .. } => "rsa-pss-sha256",
            Self::Ed25519(_) => "ed25519",
        }
    }
}

impl fmt::Debug for TrustedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RsaPss { modulus_bits, .. } => f
                .debug_struct("TrustedKey::RsaPss")
                .field("modulus_bits", modulus_bits)
                .finish(),
            Self::Ed25519(_) => f.debug_struct("TrustedKey::Ed25519").finish(),
        }
    }
}

/// Largest PSS salt the key admits: `emLen - hLen - 2`.
pub fn max_pss_salt_len(key: &RsaPublicKey) -> usize {
    let em_bits = key.n().bits().saturating_sub(1);
    let em_len = em_bits.div_ceil(8);
    em_len.saturating_sub(<Sha256 as Digest>::output_size() + 2)
}
