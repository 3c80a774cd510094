use serde::{Deserialize, Serialize};
use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Executable used for `list -e` and `env -json`.
    pub go_tool: String,
    /// Suffix (without the dot) of the files handed to the counter.
    pub source_extension: String,
    pub timeout_seconds: Option<u64>,
    pub goroot: Option<PathBuf>,
    pub gopath: Vec<PathBuf>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            go_tool: "go".to_string(),
            source_extension: "go".to_string(),
            timeout_seconds: None,
            goroot: None,
            gopath: Vec::new(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Get the default config file path (~/.tagcount.toml)
    pub fn default_config_path() -> crate::Result<PathBuf> {
        let home_dir = home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(home_dir.join(".tagcount.toml"))
    }

    /// Load config from the default location, falling back to defaults if
    /// the file doesn't exist
    pub fn load() -> crate::Result<Self> {
        let config_path = match Self::default_config_path() {
            Ok(path) => path,
            Err(_) => return Ok(Self::default()),
        };

        if config_path.exists() {
            Self::from_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific file path
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("could not read config {}: {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }

    /// Source suffix in `.go` form, tolerating a leading dot in the config.
    pub fn suffix(&self) -> String {
        format!(".{}", self.source_extension.trim_start_matches('.'))
    }
}

pub(crate) fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}
