use directories::ProjectDirs;
use std::path::PathBuf;

pub const APP_QUALIFIER: &str = "io";
pub const APP_ORG: &str = "hush";
pub const APP_NAME: &str = "hush";

pub fn data_dir() -> anyhow::Result<PathBuf> {
    let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("cannot determine data directory"))?;
    Ok(dirs.data_dir().to_path_buf())
}

pub fn key_file_path() -> anyhow::Result<PathBuf> {
    if let Ok(override_path) = std::env::var("HUSH_KEY_FILE") {
        return Ok(PathBuf::from(override_path));
    }
    Ok(data_dir()?.join("hush.key"))
}

pub fn credentials_path() -> anyhow::Result<PathBuf> {
    Ok(data_dir()?.join("credentials.json"))
}

pub fn default_database_path() -> anyhow::Result<PathBuf> {
    Ok(data_dir()?.join("messages.db"))
}
