//! Run and registry configuration.
//!
//! Configuration is two-layered:
//!
//! - [`RunConfig`] is the plain, fully-resolved option set the pipeline
//!   consumes. The CLI builds it; the pipeline never looks at flags or the
//!   environment itself, so the same struct works from tests or another
//!   front-end.
//! - [`RegistryConfig`] is the optional per-repository JSON config file:
//!
//! ```json
//! {
//!   "version": "0.1",
//!   "externalRepositories": ["../extra-servers", {"path": "../more"}]
//! }
//! ```
//!
//! A missing config file means defaults (no external repositories). A config
//! file that exists but is not valid JSON aborts the run — a present config
//! is assumed to be intentional, and silently ignoring a broken one would
//! quietly drop external servers from the registry.

use crate::profiles::HostingProfile;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("external repositories override is not valid JSON: {0}")]
    ExternalParse(serde_json::Error),
    #[error("external repositories override must be a JSON array")]
    ExternalShape,
}

/// Resolved options for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Base directory relative paths (source, output, externals) resolve
    /// against.
    pub workspace_root: PathBuf,
    /// Primary directory of server subdirectories.
    pub source_dir: PathBuf,
    /// Output base directory; the versioned tree lands under it.
    pub output_dir: PathBuf,
    /// Label for the versioned directory (`v<registry_version>`).
    pub registry_version: String,
    pub profile: HostingProfile,
    /// Validate and report instead of writing output.
    pub validate_only: bool,
    /// Extra source roots, in precedence order. Each element is a bare path
    /// string or an object with a `path`/`serversPath` field; other shapes
    /// are skipped with a warning during root resolution.
    pub external_repositories: Vec<Value>,
}

impl RunConfig {
    /// The versioned output directory, `<output>/v<version>`.
    pub fn registry_output_dir(&self) -> PathBuf {
        self.output_dir.join(format!("v{}", self.registry_version))
    }
}

/// The optional registry config file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryConfig {
    /// Registry format version declared by the file. Informational; the
    /// output path label comes from [`RunConfig::registry_version`].
    pub version: Option<String>,
    pub external_repositories: Vec<Value>,
}

impl RegistryConfig {
    /// Load the config file, if one was given and exists.
    ///
    /// Tolerant of shape drift the way deployed registries are: a non-array
    /// `externalRepositories` or a non-string `version` falls back to the
    /// default rather than failing the run. Only unparsable JSON is fatal.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        let raw: Value = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_value(&raw))
    }

    fn from_value(raw: &Value) -> Self {
        let version = raw
            .get("version")
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let external_repositories = raw
            .get("externalRepositories")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Self {
            version,
            external_repositories,
        }
    }
}

/// Parse the `--external-repositories` override: a JSON array literal.
///
/// `["../extra", {"path": "../more"}]` is valid; anything that is not a
/// JSON array is a configuration error.
pub fn parse_external_repositories(raw: &str) -> Result<Vec<Value>, ConfigError> {
    let value: Value = serde_json::from_str(raw).map_err(ConfigError::ExternalParse)?;
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(ConfigError::ExternalShape),
    }
}
