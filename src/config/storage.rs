use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory of the embedded notification/counter database
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Directory receiving the rolling log file
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_dir: default_log_dir(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        validate_directory(&self.db_path, "db_path")?;
        validate_directory(&self.log_dir, "log_dir")?;
        Ok(())
    }
}

/// Ensures directory path is valid and writable
pub(crate) fn validate_directory(
    path: &Path,
    name: &str,
) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::InvalidConfig(format!("{} path cannot be empty", name)));
    }

    #[cfg(not(test))]
    {
        use std::fs;
        if !path.exists() {
            fs::create_dir_all(path).map_err(|e| {
                Error::InvalidConfig(format!(
                    "Failed to create {} directory at {}: {}",
                    name,
                    path.display(),
                    e
                ))
            })?;
        }

        let test_file = path.join(".permission_test");
        fs::write(&test_file, b"test").map_err(|e| {
            Error::InvalidConfig(format!(
                "No write permission in {} directory {}: {}",
                name,
                path.display(),
                e
            ))
        })?;
        fs::remove_file(&test_file).ok();
    }

    Ok(())
}

fn default_db_path() -> PathBuf {
    PathBuf::from("/tmp/branch-hub/db")
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("/tmp/branch-hub/logs")
}
