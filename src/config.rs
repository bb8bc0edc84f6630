//! Node configuration: a JSON file with `ZKVOTE_*` environment overrides.

use std::{env, fs, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plonk::{ProofError, VerificationKeyJson};
use crate::tree::DEFAULT_DEPTH;

/// Deepest identity tree a node may be configured with.
pub const MAX_CONFIG_DEPTH: usize = DEFAULT_DEPTH;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    /// A file could not be read.
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    /// The config document is not valid JSON for [`AppConfig`].
    Parse(String),
    #[error("invalid value {value:?} for {var}")]
    /// An environment override could not be parsed.
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },
    #[error("tree depth {0} outside 1..={MAX_CONFIG_DEPTH}")]
    /// The configured depth is unsupported.
    InvalidDepth(usize),
    #[error("admin digest must be 64 hex characters, got {0:?}")]
    /// The pinned digest is malformed.
    InvalidDigest(String),
    #[error("no admin key configured (set admin_digest or admin_vkey_path)")]
    /// Neither a digest nor a key file was configured.
    MissingAdminKey,
    #[error("admin key: {0}")]
    /// The admin key file is not a valid verification key document.
    AdminKey(#[from] ProofError),
}

/// Node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Administrator verification key whose digest is pinned.
    pub admin_vkey_path: Option<PathBuf>,
    /// Pinned digest as hex; wins over `admin_vkey_path`.
    pub admin_digest: Option<String>,
    /// Identity tree depth.
    pub tree_depth: usize,
    /// Default log filter.
    pub log_level: String,
    /// Emit JSON log lines.
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            admin_vkey_path: None,
            admin_digest: None,
            tree_depth: DEFAULT_DEPTH,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

fn parse_env_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl AppConfig {
    /// Parses a config document.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(input).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Reads `path`, applies environment overrides and validates.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json_str(&text)?;
        config.apply_overrides(|var| env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `ZKVOTE_*` overrides fetched through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("ZKVOTE_ADMIN_VKEY") {
            self.admin_vkey_path = Some(PathBuf::from(path));
        }
        if let Some(digest) = lookup("ZKVOTE_ADMIN_DIGEST") {
            self.admin_digest = Some(digest);
        }
        if let Some(depth) = lookup("ZKVOTE_TREE_DEPTH") {
            self.tree_depth = depth.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: "ZKVOTE_TREE_DEPTH",
                value: depth.clone(),
            })?;
        }
        if let Some(level) = lookup("ZKVOTE_LOG") {
            self.log_level = level;
        }
        if let Some(flag) = lookup("ZKVOTE_LOG_JSON") {
            self.log_json = parse_env_flag(&flag);
        }
        Ok(())
    }

    /// Checks ranges and formats.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tree_depth == 0 || self.tree_depth > MAX_CONFIG_DEPTH {
            return Err(ConfigError::InvalidDepth(self.tree_depth));
        }
        if let Some(digest) = &self.admin_digest {
            parse_digest(digest)?;
        }
        Ok(())
    }

    /// Resolves the pinned admin digest from the digest or the key file.
    pub fn admin_digest(&self) -> Result<[u8; 32], ConfigError> {
        if let Some(digest) = &self.admin_digest {
            return parse_digest(digest);
        }
        let path = self
            .admin_vkey_path
            .as_ref()
            .ok_or(ConfigError::MissingAdminKey)?;
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(VerificationKeyJson::parse(&text)?.digest()?)
    }
}

fn parse_digest(value: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = hex::decode(value.trim())
        .map_err(|_| ConfigError::InvalidDigest(value.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| ConfigError::InvalidDigest(value.to_string()))
}
