//! Two-stage startup gate.
//!
//! 1. Every protected artifact must verify against the trusted public key.
//! 2. Only then is the credential store opened.
//!
//! A failure at either stage is terminal. There is no retry: a tampered
//! artifact or a bad credential blob stays bad until an operator fixes it.

use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::config::GateConfig;
use crate::error::{Halt, KeyKind};
use crate::integrity::{verify_artifact, ArtifactPaths, TrustedKey};
use crate::vault::{ConnectionDescriptor, CredentialVault, SecretSource};

/// Verifies artifacts, then releases credentials from `S`.
#[derive(Debug)]
pub struct BootstrapGate<S> {
    public_key: PathBuf,
    artifacts: Vec<ArtifactPaths>,
    secrets: S,
}

impl<S: SecretSource> BootstrapGate<S> {
    pub fn new(public_key: impl Into<PathBuf>, secrets: S) -> Self {
        Self {
            public_key: public_key.into(),
            artifacts: Vec::new(),
            secrets,
        }
    }

    /// Register an artifact that must verify before startup.
    pub fn protect(mut self, artifact: ArtifactPaths) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn artifacts(&self) -> &[ArtifactPaths] {
        &self.artifacts
    }

    /// Run both stages and hand back the broker credentials.
    pub fn bootstrap(&self) -> Result<ConnectionDescriptor, Halt> {
        self.check_integrity()?;

        match self.secrets.load() {
            Ok(descriptor) => {
                info!("bootstrap approved");
                Ok(descriptor)
            }
            Err(e) => {
                let halt = Halt::from(e);
                error!(reason = %halt, "credentials unavailable, refusing to start");
                Err(halt)
            }
        }
    }

    /// Stage one: AND over every artifact verdict.
    ///
    /// All artifacts are checked even after a failure so the halt names each
    /// one that was modified. The key is dropped before this returns.
    fn check_integrity(&self) -> Result<(), Halt> {
        let key = TrustedKey::load(&self.public_key).map_err(|e| {
            error!(path = %self.public_key.display(), reason = %e, "public key unavailable");
            Halt::KeyMaterialUnavailable {
                kind: KeyKind::PublicKey,
                path: self.public_key.clone(),
                reason: e.to_string(),
            }
        })?;

        if self.artifacts.is_empty() {
            warn!("no protected artifacts registered");
            return Err(Halt::IntegrityViolation { failed: Vec::new() });
        }

        let failed: Vec<PathBuf> = self
            .artifacts
            .iter()
            .filter(|artifact| !verify_artifact(&key, artifact))
            .map(|artifact| artifact.path.clone())
            .collect();

        if !failed.is_empty() {
            let halt = Halt::IntegrityViolation { failed };
            error!(reason = %halt, "integrity check failed, refusing to start");
            return Err(halt);
        }

        info!(count = self.artifacts.len(), algorithm = key.algorithm(), "all artifacts verified");
        Ok(())
    }
}

impl BootstrapGate<CredentialVault> {
    /// Build the gate described by `config`.
    pub fn from_config(config: &GateConfig) -> std::io::Result<Self> {
        let vault = CredentialVault::new(config.symmetric_key_path(), config.secrets_path());
        let gate = config
            .protected_artifacts()?
            .into_iter()
            .fold(Self::new(config.public_key_path(), vault), Self::protect);
        Ok(gate)
    }
}

/// Verify and decrypt per `config`; the single entry point for device binaries.
pub fn bootstrap(config: &GateConfig) -> Result<ConnectionDescriptor, Halt> {
    let gate = BootstrapGate::from_config(config).map_err(|e| {
        // Without the executable path the self-check cannot run.
        error!(reason = %e, "could not locate the running executable");
        Halt::IntegrityViolation {
            failed: vec![PathBuf::from("<current executable>")],
        }
    })?;
    gate.bootstrap()
}
