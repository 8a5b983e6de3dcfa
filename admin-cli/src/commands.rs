use anyhow::{anyhow, bail, Context};
use clap::Args;
use sensorgate::integrity::{verify_artifact, ArtifactPaths, TrustedKey};
use sensorgate::vault::{self, storage, ConnectionDescriptor, CredentialVault, SecretSource};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

#[derive(Args)]
pub struct SealArgs {
    /// Symmetric key file (32 raw bytes or base64)
    #[arg(long)]
    pub key: PathBuf,

    /// Where to write the encrypted blob
    #[arg(long, default_value = "credentials.bin")]
    pub output: PathBuf,

    /// Cleartext record file containing host:port:username:password
    #[arg(long, conflicts_with_all = ["host", "port", "username"])]
    pub input: Option<PathBuf>,

    /// Broker host (password is prompted for)
    #[arg(long, required_unless_present = "input")]
    pub host: Option<String>,

    #[arg(long, required_unless_present = "input")]
    pub port: Option<u16>,

    #[arg(long, required_unless_present = "input")]
    pub username: Option<String>,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// PEM public key
    #[arg(long)]
    pub public_key: PathBuf,

    /// Artifact to check
    #[arg(long)]
    pub artifact: PathBuf,

    /// Base64 detached signature
    #[arg(long)]
    pub signature: PathBuf,
}

/// Encrypt a credential record and write it where the device expects it.
///
/// The blob is staged next to the output and decrypted again before it
/// replaces anything, so a bad key file is caught here rather than on the
/// device and an existing blob survives a failed run. Returns a summary
/// without secrets.
pub fn seal(args: &SealArgs) -> anyhow::Result<String> {
    let key = CredentialVault::new(&args.key, &args.output).load_key()?;

    let descriptor = match &args.input {
        Some(path) => read_record(path)?,
        None => prompt_record(args)?,
    };

    let blob = vault::seal(&key, &descriptor)?;
    let staged = staging_path(&args.output);
    storage::write_secret(&staged, vault::encode_blob(&blob).as_bytes())
        .with_context(|| format!("writing {}", staged.display()))?;

    if let Err(e) = check_staged(&args.key, &staged, &descriptor) {
        let _ = fs::remove_file(&staged);
        return Err(e);
    }
    fs::rename(&staged, &args.output)
        .with_context(|| format!("moving {} into place", staged.display()))?;

    Ok(format!(
        "Wrote encrypted credentials for {}:{} to {}",
        descriptor.host,
        descriptor.port,
        args.output.display()
    ))
}

/// Sibling path the new blob is written to before it replaces `output`.
fn staging_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("credentials.bin"));
    name.push(".tmp");
    output.with_file_name(name)
}

fn check_staged(key: &Path, staged: &Path, expected: &ConnectionDescriptor) -> anyhow::Result<()> {
    if CredentialVault::new(key, staged).load()? != *expected {
        bail!("written blob does not decrypt to the input record");
    }
    Ok(())
}

fn read_record(path: &Path) -> anyhow::Result<ConnectionDescriptor> {
    let record = Zeroizing::new(
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?,
    );
    Ok(ConnectionDescriptor::parse_record(&record)?)
}

fn prompt_record(args: &SealArgs) -> anyhow::Result<ConnectionDescriptor> {
    let host = args.host.as_deref().ok_or_else(|| anyhow!("--host is required"))?;
    let port = args.port.ok_or_else(|| anyhow!("--port is required"))?;
    let username = args.username.as_deref().ok_or_else(|| anyhow!("--username is required"))?;

    let password = Zeroizing::new(rpassword::read_password_from_tty(Some("Broker password: "))?);
    // Checks the combined fields the same way the device will.
    let record = Zeroizing::new(format!("{host}:{port}:{username}:{}", password.as_str()));
    Ok(ConnectionDescriptor::parse_record(&record)?)
}

pub fn verify(args: &VerifyArgs) -> anyhow::Result<bool> {
    let key = TrustedKey::load(&args.public_key)?;
    Ok(verify_artifact(
        &key,
        &ArtifactPaths::new(&args.artifact, &args.signature),
    ))
}
