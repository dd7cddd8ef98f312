use crate::crypto::{generate_key, KEY_LEN};
use anyhow::Result;
use std::fs;
use std::path::Path;
use tracing::warn;
use zeroize::Zeroizing;

/// Loads the symmetric key from `path`, or generates and persists a new one.
///
/// A key file that exists but is structurally invalid (wrong length,
/// unreadable) is silently replaced; anything sealed under the old key
/// becomes undecryptable, which callers must treat as "no saved value".
pub fn load_or_create(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    if path.exists() {
        match fs::read(path) {
            Ok(bytes) if bytes.len() == KEY_LEN => return Ok(Zeroizing::new(bytes)),
            Ok(bytes) => {
                warn!(len = bytes.len(), "key file has invalid length, regenerating");
            }
            Err(err) => {
                warn!(error = %err, "key file unreadable, regenerating");
            }
        }
    }

    let key = Zeroizing::new(generate_key().to_vec());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        restrict_dir(parent)?;
    }
    fs::write(path, key.as_slice())?;
    restrict_file(path)?;
    Ok(key)
}

#[cfg(unix)]
fn restrict_dir(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;
    Ok(())
}

#[cfg(unix)]
fn restrict_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_dir(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(not(unix))]
fn restrict_file(_path: &Path) -> Result<()> {
    Ok(())
}
