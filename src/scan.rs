//! Source scanning and aggregation.
//!
//! Stage 1 of the registry pipeline. Walks every source root, reads and
//! validates the server manifests underneath, and produces the
//! [`RegistrySnapshot`] the generate stage projects into the output tree.
//!
//! ## Directory Structure
//!
//! Each source root holds one subdirectory per server:
//!
//! ```text
//! servers/                         # Primary source root ("local")
//! ├── github/
//! │   ├── server.json              # Identity + metadata (schema-validated)
//! │   └── versions/
//! │       ├── 1.0.0.json           # One release per file (schema-validated)
//! │       └── 1.1.0.json
//! ├── memory/
//! │   ├── server.json
//! │   └── versions/
//! │       └── 2.3.0.json
//! └── notes.md                     # Non-directories are ignored
//! ```
//!
//! External repositories from the config file contribute additional roots,
//! resolved relative to the workspace root and labeled `external:<raw-path>`.
//!
//! ## Failure ladder
//!
//! Problems are contained to the smallest scope that can absorb them:
//! a bad version file drops that file, a bad `server.json` drops that
//! server, a missing root drops that root. Only unexpected I/O errors
//! (a readable directory that stops being readable mid-scan) abort the
//! run. Duplicate server names across roots keep the first occurrence in
//! root order; the later one is discarded with a warning, never merged.

use crate::schema::{SchemaSet, log_violations};
use crate::types::{RegistrySnapshot, Server, SourceRoot, VersionRecord};
use log::{error, info, warn};
use rayon::prelude::*;
use semver::Version;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no valid servers found")]
    NoValidServers,
}

/// Resolve the ordered list of source roots for one run.
///
/// The primary source directory always comes first, labeled `local`, even
/// when it does not exist yet — the missing-directory warning belongs to
/// the aggregation walk. External entries are taken in declaration order:
/// a bare path string, or an object carrying `path` or `serversPath`.
/// Anything else is skipped with a warning, as are paths that do not
/// resolve to an existing directory. Order matters: it decides which copy
/// of a duplicated server wins.
pub fn resolve_source_roots(
    source_dir: &Path,
    workspace_root: &Path,
    external_repositories: &[Value],
) -> Vec<SourceRoot> {
    let mut roots = vec![SourceRoot::local(source_dir.to_path_buf())];

    for (index, entry) in external_repositories.iter().enumerate() {
        let Some(raw_path) = normalize_external_path(entry) else {
            warn!("Skipping externalRepositories[{index}]: unsupported format");
            continue;
        };

        let resolved = workspace_root.join(raw_path);
        if !resolved.exists() {
            warn!("Skipping external path not found: {}", resolved.display());
            continue;
        }
        if !resolved.is_dir() {
            warn!(
                "Skipping external path (not a directory): {}",
                resolved.display()
            );
            continue;
        }

        roots.push(SourceRoot::external(resolved, raw_path));
    }

    roots
}

fn normalize_external_path(entry: &Value) -> Option<&str> {
    match entry {
        Value::String(raw) => Some(raw),
        Value::Object(map) => map
            .get("path")
            .and_then(Value::as_str)
            .or_else(|| map.get("serversPath").and_then(Value::as_str)),
        _ => None,
    }
}

/// Walk every root and build the de-duplicated, name-sorted snapshot.
///
/// Sibling server directories within a root are read in parallel; the
/// result is deterministic because duplicate resolution runs afterwards
/// over the sorted directory list, in root order.
pub fn aggregate(roots: &[SourceRoot], schemas: &SchemaSet) -> Result<RegistrySnapshot, ScanError> {
    let mut servers_by_name: BTreeMap<String, Server> = BTreeMap::new();

    for root in roots {
        if !root.path.exists() {
            warn!("Skipping source path not found: {}", root.path.display());
            continue;
        }

        let subdirs = collect_subdirs(&root.path)?;
        let read: Vec<Option<Server>> = subdirs
            .par_iter()
            .map(|dir| read_server_dir(dir, &root.label, schemas))
            .collect::<Result<_, ScanError>>()?;

        for server in read.into_iter().flatten() {
            match servers_by_name.get(&server.name) {
                Some(existing) => {
                    warn!(
                        "Duplicate server \"{}\" from {} ignored; using {}",
                        server.name, server.source, existing.source
                    );
                }
                None => {
                    info!(
                        "Loaded {} ({} version(s), {})",
                        server.name,
                        server.versions.len(),
                        server.source
                    );
                    servers_by_name.insert(server.name.clone(), server);
                }
            }
        }
    }

    Ok(RegistrySnapshot {
        servers: servers_by_name.into_values().collect(),
    })
}

/// Immediate subdirectories of a root, sorted for deterministic order.
fn collect_subdirs(root: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut subdirs: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    subdirs.sort();
    Ok(subdirs)
}

/// Read one candidate server directory.
///
/// Returns `Ok(None)` for every local failure — no `server.json` (not every
/// subdirectory is a server), unparsable or schema-invalid metadata, a
/// missing `versions/` directory, or zero surviving versions. Each skip
/// except the first is logged. Unexpected I/O failures propagate.
pub fn read_server_dir(
    dir: &Path,
    source: &str,
    schemas: &SchemaSet,
) -> Result<Option<Server>, ScanError> {
    let dir_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let manifest_path = dir.join("server.json");
    if !manifest_path.exists() {
        return Ok(None);
    }

    let server_data: Value = match serde_json::from_str(&fs::read_to_string(&manifest_path)?) {
        Ok(data) => data,
        Err(e) => {
            error!("Failed to parse {dir_name}/server.json ({source}): {e}");
            return Ok(None);
        }
    };

    if let Err(violations) = schemas.check_server(&server_data) {
        log_violations(&format!("{dir_name}/server.json"), &violations);
        return Ok(None);
    }

    let Some(name) = server_data.get("name").and_then(Value::as_str) else {
        error!("Skipping {dir_name}: server.json has no usable name ({source})");
        return Ok(None);
    };
    let name = name.to_string();

    let versions_dir = dir.join("versions");
    if !versions_dir.exists() {
        warn!("Skipping {dir_name}: missing versions directory ({source})");
        return Ok(None);
    }

    let mut versions: Vec<(Version, VersionRecord)> = Vec::new();
    for file_name in collect_version_file_names(&versions_dir)? {
        let version_path = versions_dir.join(&file_name);

        let data: Value = match serde_json::from_str(&fs::read_to_string(&version_path)?) {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to parse {dir_name}/versions/{file_name}: {e}");
                continue;
            }
        };

        if let Err(violations) = schemas.check_version(&data) {
            log_violations(&format!("{dir_name}/versions/{file_name}"), &violations);
            continue;
        }

        // The schema guarantees `version` is a string; semver validity is
        // checked separately so it can be reported as its own error.
        let version_str = data.get("version").and_then(Value::as_str).unwrap_or("");
        let parsed = match Version::parse(version_str) {
            Ok(parsed) => parsed,
            Err(_) => {
                error!(
                    "Invalid semantic version in {dir_name}/versions/{file_name}: {version_str}"
                );
                continue;
            }
        };

        versions.push((
            parsed,
            VersionRecord {
                version: version_str.to_string(),
                data,
            },
        ));
    }

    if versions.is_empty() {
        warn!("Skipping {dir_name}: no valid versions ({source})");
        return Ok(None);
    }

    versions.sort_by(|a, b| b.0.cmp(&a.0));

    Ok(Some(Server {
        name,
        source: source.to_string(),
        server_data,
        versions: versions.into_iter().map(|(_, record)| record).collect(),
    }))
}

/// Version file names under `versions/`, sorted: regular files ending in
/// `.json`, except the reserved `latest.json` alias.
fn collect_version_file_names(versions_dir: &Path) -> Result<Vec<String>, ScanError> {
    let mut names: Vec<String> = fs::read_dir(versions_dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(".json") && name != "latest.json")
        .collect();
    names.sort();
    Ok(names)
}
