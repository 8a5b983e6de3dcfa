use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::integrity::ArtifactPaths;

/// Key material locations
#[derive(Debug, Deserialize, Clone)]
pub struct KeysConfig {
    /// PEM public key that artifact signatures must verify against
    #[serde(default = "default_public_key")]
    pub public_key: PathBuf,
    /// Symmetric key that opens the secrets blob
    #[serde(default = "default_symmetric_key")]
    pub symmetric_key: PathBuf,
}

fn default_public_key() -> PathBuf {
    PathBuf::from("config/public.pem")
}

fn default_symmetric_key() -> PathBuf {
    PathBuf::from("config/key.bin")
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            public_key: default_public_key(),
            symmetric_key: default_symmetric_key(),
        }
    }
}

/// Encrypted credential store
#[derive(Debug, Deserialize, Clone)]
pub struct SecretsConfig {
    #[serde(default = "default_secrets_path")]
    pub path: PathBuf,
}

fn default_secrets_path() -> PathBuf {
    PathBuf::from("config/credentials.bin")
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            path: default_secrets_path(),
        }
    }
}

/// Artifacts that must verify before startup
#[derive(Debug, Deserialize, Clone, Default)]
pub struct IntegrityConfig {
    /// Signature over the running executable itself
    #[serde(default)]
    pub self_signature: Option<PathBuf>,
    #[serde(default)]
    pub artifacts: Vec<ArtifactPaths>,
}

/// Device identity (optional)
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DeviceConfig {
    #[serde(default)]
    pub label: Option<String>,
}

/// Root gate configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct GateConfig {
    /// Relative paths below resolve against this directory
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    #[serde(default)]
    pub keys: KeysConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
    #[serde(default)]
    pub integrity: IntegrityConfig,
    #[serde(default)]
    pub device: DeviceConfig,
}

impl GateConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default config file
            .add_source(File::with_name("config/default").required(false))
            // Override with local config if present
            .add_source(File::with_name("config/local").required(false))
            // e.g., SENSORGATE__KEYS__SYMMETRIC_KEY, SENSORGATE__SECRETS__PATH
            .add_source(env_source())
            .build()?;

        config.try_deserialize()
    }

    /// Load one explicit configuration file, still honouring the environment.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()
    }

    /// Reject configurations that protect nothing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.integrity.artifacts.is_empty() && self.integrity.self_signature.is_none() {
            return Err(ConfigError::Message(
                "no protected artifacts: set integrity.self_signature or integrity.artifacts".into(),
            ));
        }
        Ok(())
    }

    /// Resolve a configured path against `base_dir`.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn public_key_path(&self) -> PathBuf {
        self.resolve(&self.keys.public_key)
    }

    pub fn symmetric_key_path(&self) -> PathBuf {
        self.resolve(&self.keys.symmetric_key)
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.resolve(&self.secrets.path)
    }

    /// Every artifact the gate must verify, with resolved paths.
    ///
    /// With `self_signature` set, the running executable comes first.
    pub fn protected_artifacts(&self) -> std::io::Result<Vec<ArtifactPaths>> {
        let mut artifacts = Vec::with_capacity(self.integrity.artifacts.len() + 1);
        if let Some(signature) = &self.integrity.self_signature {
            artifacts.push(ArtifactPaths::new(std::env::current_exe()?, self.resolve(signature)));
        }
        artifacts.extend(self.integrity.artifacts.iter().map(|a| {
            ArtifactPaths::new(self.resolve(&a.path), self.resolve(&a.signature))
        }));
        Ok(artifacts)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("SENSORGATE")
        .separator("__")
        .try_parsing(true)
}
