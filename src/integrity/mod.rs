//! Code-integrity verification.
//!
//! A device refuses to start unless each of its protected artifacts matches a
//! detached signature made by the offline signing key.
//!
//! ## Formats
//!
//! - Public key: PEM (RSA SubjectPublicKeyInfo / PKCS#1, or Ed25519)
//! - Signature file: base64 of the raw signature bytes
//! - RSA signatures: RSASSA-PSS, SHA-256, MGF1(SHA-256), maximum salt length

pub mod keys;
pub mod signature;

pub use keys::{max_pss_salt_len, KeyError, TrustedKey};
pub use signature::{check, verify, verify_artifact, ArtifactPaths, SignedArtifact, VerifyError};
