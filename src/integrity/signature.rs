//! Detached signature verification of artifacts on disk.
//!
//! Every failure mode (mismatch, malformed signature, unreadable file)
//! collapses to `false` at [`verify`] and [`verify_artifact`]. The typed
//! reason from [`check`] is only used for diagnostics.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::Verifier as _;
use rsa::pss;
use rsa::signature::Verifier as _;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use super::keys::TrustedKey;

/// Why an artifact failed verification.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("could not read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("signature file is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("malformed signature")]
    MalformedSignature,

    #[error("signature does not match artifact contents")]
    Mismatch,
}

/// Locations of a protected artifact and its detached signature.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArtifactPaths {
    /// The artifact, hashed byte-for-byte.
    pub path: PathBuf,
    /// Base64-encoded signature over the artifact.
    pub signature: PathBuf,
}

impl ArtifactPaths {
    pub fn new(path: impl Into<PathBuf>, signature: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            signature: signature.into(),
        }
    }
}

/// An artifact's bytes paired with its decoded signature.
#[derive(Debug, Clone)]
pub struct SignedArtifact {
    pub bytes: Vec<u8>,
    pub signature: Vec<u8>,
}

impl SignedArtifact {
    /// Read both files. Surrounding whitespace in the signature file is ignored;
    /// the artifact is taken exactly as stored.
    pub fn read(paths: &ArtifactPaths) -> Result<Self, VerifyError> {
        let bytes = read_file(&paths.path)?;
        let encoded = read_file(&paths.signature)?;
        let signature = BASE64.decode(encoded.trim_ascii())?;
        Ok(Self { bytes, signature })
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, VerifyError> {
    fs::read(path).map_err(|source| VerifyError::Unreadable {
        path: path.to_path_buf(),
        source,
    })
}

/// Check `signature` over `artifact` and report the reason on failure.
pub fn check(key: &TrustedKey, artifact: &[u8], signature: &[u8]) -> Result<(), VerifyError> {
    match key {
        TrustedKey::RsaPss { key, .. } => {
            let signature =
                pss::Signature::try_from(signature).map_err(|_| VerifyError::MalformedSignature)?;
            key.verify(artifact, &signature)
                .map_err(|_| VerifyError::Mismatch)
        }
        TrustedKey::Ed25519(key) => {
            let signature = ed25519_dalek::Signature::from_slice(signature)
                .map_err(|_| VerifyError::MalformedSignature)?;
            key.verify(artifact, &signature)
                .map_err(|_| VerifyError::Mismatch)
        }
    }
}

/// `true` only if `signature` is a valid signature over exactly `artifact`.
pub fn verify(key: &TrustedKey, artifact: &[u8], signature: &[u8]) -> bool {
    check(key, artifact, signature).is_ok()
}

/// Read an artifact and its signature from disk and verify them.
pub fn verify_artifact(key: &TrustedKey, paths: &ArtifactPaths) -> bool {
    let outcome = SignedArtifact::read(paths)
        .and_then(|artifact| check(key, &artifact.bytes, &artifact.signature));

    match outcome {
        Ok(()) => {
            debug!(artifact = %paths.path.display(), algorithm = key.algorithm(), "signature verified");
            true
        }
        Err(e) => {
            warn!(artifact = %paths.path.display(), reason = %e, "signature verification failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{other_rsa_key, rsa_key, sign_pss, trusted_rsa};
    use ed25519_dalek::Signer;
    use proptest::prelude::*;
    use tempfile::TempDir;

    const ARTIFACT: &[u8] = b"fn main() { publish_temperature(); }\n";

    #[test]
    fn test_valid_signature_passes() {
        let signature = sign_pss(rsa_key(), ARTIFACT);
        assert!(verify(&trusted_rsa(rsa_key()), ARTIFACT, &signature));
    }

    #[test]
    fn test_signatures_are_randomized_but_both_verify() {
        let first = sign_pss(rsa_key(), ARTIFACT);
        let second = sign_pss(rsa_key(), ARTIFACT);
        assert_ne!(first, second);

        let key = trusted_rsa(rsa_key());
        assert!(verify(&key, ARTIFACT, &first));
        assert!(verify(&key, ARTIFACT, &second));
    }

    #[test]
    fn test_trailing_whitespace_rejected() {
        let signature = sign_pss(rsa_key(), ARTIFACT);
        let mut padded = ARTIFACT.to_vec();
        padded.push(b' ');
        assert!(!verify(&trusted_rsa(rsa_key()), &padded, &signature));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let signature = sign_pss(rsa_key(), ARTIFACT);
        let err = check(&trusted_rsa(other_rsa_key()), ARTIFACT, &signature).unwrap_err();
        assert!(matches!(err, VerifyError::Mismatch));
    }

    #[test]
    fn test_truncated_signature_rejected() {
        let signature = sign_pss(rsa_key(), ARTIFACT);
        assert!(!verify(&trusted_rsa(rsa_key()), ARTIFACT, &signature[..signature.len() - 1]));
        assert!(!verify(&trusted_rsa(rsa_key()), ARTIFACT, &[]));
    }

    #[test]
    fn test_ed25519_signature() {
        let signing = ed25519_dalek::SigningKey::from_bytes(&[3u8; 32]);
        let key = TrustedKey::Ed25519(signing.verifying_key());
        let signature = signing.sign(ARTIFACT).to_bytes();

        assert!(verify(&key, ARTIFACT, &signature));
        assert!(!verify(&key, b"something else", &signature));
        assert!(matches!(
            check(&key, ARTIFACT, &signature[..10]).unwrap_err(),
            VerifyError::MalformedSignature
        ));
    }

    #[test]
    fn test_verify_artifact_from_disk() {
        let dir = TempDir::new().unwrap();
        let paths = ArtifactPaths::new(dir.path().join("main.bin"), dir.path().join("main.sig"));
        fs::write(&paths.path, ARTIFACT).unwrap();
        let encoded = BASE64.encode(sign_pss(rsa_key(), ARTIFACT));
        fs::write(&paths.signature, format!("{encoded}\n")).unwrap();

        let key = trusted_rsa(rsa_key());
        assert!(verify_artifact(&key, &paths));

        // Tamper after signing.
        fs::write(&paths.path, b"fn main() { exfiltrate(); }\n").unwrap();
        assert!(!verify_artifact(&key, &paths));
    }

    #[test]
    fn test_missing_artifact_is_failure() {
        let dir = TempDir::new().unwrap();
        let paths = ArtifactPaths::new(dir.path().join("gone.bin"), dir.path().join("gone.sig"));
        fs::write(&paths.signature, BASE64.encode(sign_pss(rsa_key(), ARTIFACT))).unwrap();

        assert!(!verify_artifact(&trusted_rsa(rsa_key()), &paths));
        assert!(matches!(
            SignedArtifact::read(&paths).unwrap_err(),
            VerifyError::Unreadable { .. }
        ));
    }

    #[test]
    fn test_invalid_base64_signature_is_failure() {
        let dir = TempDir::new().unwrap();
        let paths = ArtifactPaths::new(dir.path().join("main.bin"), dir.path().join("main.sig"));
        fs::write(&paths.path, ARTIFACT).unwrap();
        fs::write(&paths.signature, "not*base64!").unwrap();

        assert!(!verify_artifact(&trusted_rsa(rsa_key()), &paths));
        assert!(matches!(
            SignedArtifact::read(&paths).unwrap_err(),
            VerifyError::Encoding(_)
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_single_byte_mutation_rejected(index in 0..ARTIFACT.len(), flip in 1u8..=255) {
            let signature = sign_pss(rsa_key(), ARTIFACT);
            let mut mutated = ARTIFACT.to_vec();
            mutated[index] ^= flip;
            prop_assert!(!verify(&trusted_rsa(rsa_key()), &mutated, &signature));
        }
    }
}
