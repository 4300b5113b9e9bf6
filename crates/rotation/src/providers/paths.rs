//! Shared file locations

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Overrides the shared config file location
pub const CONFIG_FILE_ENV: &str = "AWS_CONFIG_FILE";

/// Overrides the shared credentials file location
pub const CREDENTIALS_FILE_ENV: &str = "AWS_SHARED_CREDENTIALS_FILE";

/// Locations of the shared config and credentials files
///
/// Defaults to `~/.aws/config` and `~/.aws/credentials`; the environment
/// variables [`CONFIG_FILE_ENV`] and [`CREDENTIALS_FILE_ENV`] win when set.
/// Expiration records live next to the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedPaths {
    /// Shared config file
    pub config_file: PathBuf,
    /// Shared credentials file
    pub credentials_file: PathBuf,
}

impl SharedPaths {
    /// Resolve from the process environment and the user's home directory
    pub fn from_env() -> Self {
        Self::resolve(|key| std::env::var_os(key), dirs::home_dir())
    }

    /// Resolve with an explicit environment lookup and home directory
    pub fn resolve<F>(env: F, home: Option<PathBuf>) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let aws_dir = home.unwrap_or_default().join(".aws");
        let pick = |key: &str, default: &str| {
            env(key)
                .filter(|value| !value.is_empty())
                .map_or_else(|| aws_dir.join(default), PathBuf::from)
        };

        Self {
            config_file: pick(CONFIG_FILE_ENV, "config"),
            credentials_file: pick(CREDENTIALS_FILE_ENV, "credentials"),
        }
    }

    /// Directory holding the expiration records: the config file's directory
    pub fn record_dir(&self) -> &Path {
        match self.config_file.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}
