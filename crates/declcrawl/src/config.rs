//! `declcrawl.toml` discovery and loading.
//!
//! Configuration is optional; every knob has a command-line override and a
//! built-in default, so a missing file is never an error.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

const CONFIG_FILENAME: &str = "declcrawl.toml";

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "config {}: {e}", path.display()),
            Self::Parse(path, e) => write!(f, "config {}: {e}", path.display()),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub collect: CollectConfig,
    pub formats: FormatConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path of the store file, relative to the config file's directory
    /// when not absolute.
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("declcrawl.db.json"),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct CollectConfig {
    /// Abort a crawl on the first compiler error instead of recovering
    /// type spellings from source tokens.
    pub strict: bool,
    /// Force C++ parsing regardless of file extension.
    pub cxx: bool,
    /// Extra arguments passed through to clang, e.g. `-I` paths.
    pub clang_args: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Output notation used when `--format` is not given.
    pub default: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            default: "c".to_string(),
        }
    }
}

/// Walks parent directories from `start` looking for `declcrawl.toml`.
/// Returns the path to the first one found, or `None`.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut dir = if start.is_file() {
        start.parent()?
    } else {
        start
    };
    loop {
        let candidate = dir.join(CONFIG_FILENAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
}

/// Read and parse one config file. The database path is anchored at the
/// config file's directory.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
    let mut config: Config =
        toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
    if config.database.path.is_relative() {
        if let Some(dir) = path.parent() {
            config.database.path = dir.join(&config.database.path);
        }
    }
    Ok(config)
}

/// Resolve configuration for the current invocation: the nearest
/// `declcrawl.toml` above the working directory, or built-in defaults.
pub fn resolve(cwd: &Path) -> Result<Config, ConfigError> {
    match find_config(cwd) {
        Some(path) => {
            debug!("using config {}", path.display());
            load(&path)
        },
        None => Ok(Config::default()),
    }
}

#[cfg(test)]
#[path = "../tests/src/config_unit_tests.rs"]
mod tests;
