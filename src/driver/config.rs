use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rewrite::BuildConfig;

pub const CONFIG_FILE: &str = "Captive.toml";

/// A project config file. Namely Captive.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// What the build decorators capture.
    pub capture: BuildConfig,
    pub output: OutputConfig,
}

/// What the driver prints once the entry function returns a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub mode: OutputMode,
    /// Operators the lowered listing accepts. Empty accepts all.
    pub ops: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// The captured program as is.
    #[default]
    Program,
    /// A flat listing of operations.
    Lowered,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Config {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// The config file next to `input`, if there is one.
    pub fn discover(input: &Path) -> Option<PathBuf> {
        let dir = input.parent()?;
        let candidate = dir.join(CONFIG_FILE);
        candidate.is_file().then_some(candidate)
    }
}
