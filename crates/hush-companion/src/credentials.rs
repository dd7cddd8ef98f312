//! Remember-me persistence: credentials are sealed through the vault before
//! they touch disk, and any corruption loads as "nothing saved".

use anyhow::Result;
use hush_core::vault::CredentialVault;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub operator_id: String,
    pub remember: bool,
}

#[derive(Serialize, Deserialize)]
struct StoredCredentials {
    api_key: String,
    operator_id: String,
    remember: bool,
}

/// Never fails: an unreadable file, bad JSON or undecryptable tokens all
/// degrade to empty credentials so the caller re-prompts.
pub fn load(vault: &CredentialVault, path: &Path) -> Credentials {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(_) => return Credentials::default(),
    };
    let stored: StoredCredentials = match serde_json::from_str(&data) {
        Ok(stored) => stored,
        Err(err) => {
            debug!(error = %err, "credentials file unreadable, ignoring");
            return Credentials::default();
        }
    };
    if !stored.remember {
        return Credentials::default();
    }
    Credentials {
        api_key: vault.open(&stored.api_key).unwrap_or_default(),
        operator_id: vault.open(&stored.operator_id).unwrap_or_default(),
        remember: true,
    }
}

pub fn save(vault: &CredentialVault, path: &Path, credentials: &Credentials) -> Result<()> {
    let stored = StoredCredentials {
        api_key: vault.seal(&credentials.api_key)?,
        operator_id: vault.seal(&credentials.operator_id)?,
        remember: credentials.remember,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_vec_pretty(&stored)?)?;
    Ok(())
}

pub fn clear(path: &Path) {
    let _ = fs::remove_file(path);
}
