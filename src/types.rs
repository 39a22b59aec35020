//! Shared types used across the pipeline stages.
//!
//! The scan stage produces a [`RegistrySnapshot`]; the generate stage
//! consumes it. Nothing here is mutated after aggregation — each run builds
//! a fresh snapshot from the source tree.

use serde_json::Value;
use std::path::PathBuf;

/// One directory the scanner looks for server subdirectories in.
///
/// The primary source directory is labeled `local`; configured external
/// repositories carry `external:<raw-path>` so diagnostics and the output
/// can say where a server came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRoot {
    pub path: PathBuf,
    pub label: String,
}

impl SourceRoot {
    pub fn local(path: PathBuf) -> Self {
        Self {
            path,
            label: "local".to_string(),
        }
    }

    pub fn external(path: PathBuf, raw: &str) -> Self {
        Self {
            path,
            label: format!("external:{raw}"),
        }
    }
}

/// One release of a server, read from `versions/<semver>.json`.
///
/// `version` is the manifest's own version string; it parsed as a valid
/// semantic version or the file would have been dropped during scan.
#[derive(Debug, Clone)]
pub struct VersionRecord {
    pub version: String,
    pub data: Value,
}

/// One aggregated server: metadata plus every surviving release.
///
/// `versions` is sorted by semantic-version precedence, highest first, and
/// is never empty — servers with zero valid versions are dropped before
/// they reach the snapshot.
#[derive(Debug, Clone)]
pub struct Server {
    /// Registry identifier from the manifest's `name` field.
    pub name: String,
    /// Label of the source root this server was read from.
    pub source: String,
    /// The validated `server.json` document.
    pub server_data: Value,
    pub versions: Vec<VersionRecord>,
}

impl Server {
    /// The highest release. Guaranteed by construction.
    pub fn latest(&self) -> &VersionRecord {
        &self.versions[0]
    }
}

/// The full aggregated registry for one run: de-duplicated, sorted by name.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    pub servers: Vec<Server>,
}

impl RegistrySnapshot {
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn source_root_labels() {
        let local = SourceRoot::local(PathBuf::from("/ws/servers"));
        assert_eq!(local.label, "local");

        let external = SourceRoot::external(PathBuf::from("/ws/extra"), "./extra");
        assert_eq!(external.label, "external:./extra");
    }

    #[test]
    fn latest_is_first_version() {
        let server = Server {
            name: "io.github.acme/tools".to_string(),
            source: "local".to_string(),
            server_data: json!({"name": "io.github.acme/tools", "description": "d"}),
            versions: vec![
                VersionRecord {
                    version: "2.0.0".to_string(),
                    data: json!({"version": "2.0.0"}),
                },
                VersionRecord {
                    version: "1.0.0".to_string(),
                    data: json!({"version": "1.0.0"}),
                },
            ],
        };
        assert_eq!(server.latest().version, "2.0.0");
    }
}
