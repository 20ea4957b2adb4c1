//! Configuration schema (dbtgate.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default manifest location inside a dbt project
pub const DEFAULT_MANIFEST_PATH: &str = "target/manifest.json";

/// Default config file name looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "dbtgate.toml";

/// Allowlist rules for specific subjects or patterns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllowlistRules {
    /// Never report violations for these subjects (glob patterns)
    #[serde(default)]
    pub skip: Vec<String>,
}

impl AllowlistRules {
    /// Whether violations for `subject` are suppressed
    pub fn is_skipped(&self, subject: &str) -> bool {
        self.skip.iter().any(|pattern| glob_match(pattern, subject))
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Location of manifest.json
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,

    /// Substring every exposure file path must contain
    #[serde(default)]
    pub exposure_folder: Option<String>,

    /// Substring no source file path may contain
    #[serde(default)]
    pub source_folder: Option<String>,

    /// Minimum number of tests for test-count checks
    #[serde(default = "default_min_tests")]
    pub min_tests: usize,

    /// Allowlist rules
    #[serde(default)]
    pub allowlist: AllowlistRules,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

fn default_manifest() -> PathBuf {
    PathBuf::from(DEFAULT_MANIFEST_PATH)
}

fn default_min_tests() -> usize {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            exposure_folder: None,
            source_folder: None,
            min_tests: default_min_tests(),
            allowlist: AllowlistRules::default(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Manifest path resolved against the project root
    pub fn manifest_path(&self) -> PathBuf {
        if self.manifest.is_relative() && !self.project_root.as_os_str().is_empty() {
            self.project_root.join(&self.manifest)
        } else {
            self.manifest.clone()
        }
    }
}

/// `*` matches any run of characters, including none and including dots
fn glob_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return pattern == text;
    };
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };

    let mut parts: Vec<&str> = parts.collect();
    let Some(last) = parts.pop() else {
        return rest.is_empty();
    };

    for part in parts.into_iter().filter(|p| !p.is_empty()) {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }

    rest.ends_with(last)
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}
