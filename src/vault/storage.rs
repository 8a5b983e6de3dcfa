//! Reading and writing secret files.
//!
//! On Unix, secret files are written with mode 0600 and reading a file that
//! group or others can access logs a warning.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::warn;
use zeroize::Zeroizing;

/// Owner read/write only.
#[cfg(unix)]
pub const SECRET_FILE_MODE: u32 = 0o600;

/// Warn when a secret file is readable beyond its owner.
#[cfg(unix)]
pub fn check_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let Ok(metadata) = fs::metadata(path) else {
        return;
    };
    let perm_bits = metadata.permissions().mode() & 0o777;
    if perm_bits & 0o077 != 0 {
        warn!(
            file = %path.display(),
            mode = format!("{:o}", perm_bits),
            "secret file is accessible to group or others; consider chmod 600"
        );
    }
}

#[cfg(not(unix))]
pub fn check_permissions(_path: &Path) {}

/// Read a secret file into a buffer that is wiped on drop.
pub fn read_secret(path: &Path) -> io::Result<Zeroizing<Vec<u8>>> {
    let data = Zeroizing::new(fs::read(path)?);
    check_permissions(path);
    Ok(data)
}

/// Write a secret file, creating it owner-only on Unix.
pub fn write_secret(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(SECRET_FILE_MODE);
    }

    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()?;

    // `mode` only applies on create; an existing file keeps its old bits.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(SECRET_FILE_MODE))?;
    }

    Ok(())
}
