use std::fmt::Write as _;
use std::path::PathBuf;
use thiserror::Error;

use crate::device::LabelError;
use crate::vault::VaultError;

/// Which piece of key material could not be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    PublicKey,
    SymmetricKey,
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PublicKey => f.write_str("public key"),
            Self::SymmetricKey => f.write_str("symmetric key"),
        }
    }
}

/// Reasons the bootstrap gate refuses startup. Every variant is terminal.
#[derive(Error, Debug)]
pub enum Halt {
    #[error("tampering detected: {}", describe_failed(.failed))]
    IntegrityViolation { failed: Vec<PathBuf> },

    #[error("could not load {kind} from {}: {reason}", .path.display())]
    KeyMaterialUnavailable {
        kind: KeyKind,
        path: PathBuf,
        reason: String,
    },

    #[error("unable to decrypt broker credentials: {0}")]
    CredentialDecryptionFailure(#[source] VaultError),
}

fn describe_failed(failed: &[PathBuf]) -> String {
    if failed.is_empty() {
        return "no protected artifacts registered".to_string();
    }
    let mut out = String::from("signature mismatch for ");
    for (i, path) in failed.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}", path.display());
    }
    out
}

impl Halt {
    /// Process exit status for this halt.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::IntegrityViolation { .. } => 2,
            Self::KeyMaterialUnavailable { .. } => 3,
            Self::CredentialDecryptionFailure(_) => 4,
        }
    }
}

impl From<VaultError> for Halt {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::KeyUnavailable { path, source } => Self::KeyMaterialUnavailable {
                kind: KeyKind::SymmetricKey,
                path,
                reason: source.to_string(),
            },
            VaultError::InvalidKey { path } => Self::KeyMaterialUnavailable {
                kind: KeyKind::SymmetricKey,
                path,
                reason: format!("not a {}-byte key", crate::vault::KEY_SIZE),
            },
            other => Self::CredentialDecryptionFailure(other),
        }
    }
}

/// Application-wide error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid device label: {0}")]
    Device(#[from] LabelError),

    #[error(transparent)]
    Halt(#[from] Halt),
}

impl AppError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Halt(halt) => halt.exit_code(),
            Self::Config(_) | Self::Device(_) => 1,
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
