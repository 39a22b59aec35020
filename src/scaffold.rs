//! Server manifest scaffolding and single-server validation.
//!
//! Backs the `new-server` command: builds a `server.json` plus an initial
//! version manifest from CLI options, merges them over any existing files
//! (so re-running updates rather than clobbers), and schema-validates the
//! result before declaring success. Also provides the strict single-server
//! check used to gate contributions, which fails loudly where the bulk
//! scan would merely skip.

use crate::schema::{SchemaSet, log_violations};
use log::info;
use semver::Version;
use serde_json::{Map, Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScaffoldError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("a server slug is required")]
    MissingSlug,
    #[error("a server name is required")]
    MissingName,
    #[error("a server description is required")]
    MissingDescription,
    #[error("invalid semantic version for new release: {0}")]
    InvalidVersion(String),
    #[error("invalid semantic version in {file}: {version}")]
    InvalidVersionFile { file: String, version: String },
    #[error("generated server manifests are not schema-valid")]
    SchemaInvalid,
    #[error("missing server manifest: {}", .0.display())]
    MissingManifest(PathBuf),
    #[error("missing versions directory: {}", .0.display())]
    MissingVersionsDir(PathBuf),
    #[error("no version manifests found in {}", .0.display())]
    NoVersionManifests(PathBuf),
    #[error("validation failed for server slug: {0}")]
    ValidationFailed(String),
}

/// Everything the `new-server` command accepts. Only `slug`, `name` and
/// `description` are required; the rest defaults to a stdio npm package.
#[derive(Debug, Default, Clone)]
pub struct ScaffoldOptions {
    pub slug: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub title: Option<String>,
    pub website_url: Option<String>,
    pub repository_url: Option<String>,
    pub repository_source: Option<String>,
    pub repository_subfolder: Option<String>,
    pub version: Option<String>,
    pub release_date: Option<String>,
    pub package_registry_type: Option<String>,
    pub package_identifier: Option<String>,
    pub package_transport_type: Option<String>,
}

#[derive(Debug)]
pub struct ScaffoldOutcome {
    pub slug: String,
    pub server_json_path: PathBuf,
    pub version_json_path: PathBuf,
    pub version: String,
}

fn non_empty(option: &Option<String>) -> Option<&str> {
    option.as_deref().filter(|s| !s.is_empty())
}

/// Build the `server.json` document from the options. The repository block
/// is only present when a URL was given; its source defaults to `github`.
pub fn build_server_manifest(opts: &ScaffoldOptions) -> Result<Value, ScaffoldError> {
    let name = non_empty(&opts.name).ok_or(ScaffoldError::MissingName)?;
    let description = non_empty(&opts.description).ok_or(ScaffoldError::MissingDescription)?;

    let mut manifest = Map::new();
    manifest.insert("name".into(), json!(name));
    manifest.insert("description".into(), json!(description));

    if let Some(title) = non_empty(&opts.title) {
        manifest.insert("title".into(), json!(title));
    }
    if let Some(url) = non_empty(&opts.website_url) {
        manifest.insert("websiteUrl".into(), json!(url));
    }
    if let Some(url) = non_empty(&opts.repository_url) {
        let mut repository = Map::new();
        repository.insert("url".into(), json!(url));
        repository.insert(
            "source".into(),
            json!(non_empty(&opts.repository_source).unwrap_or("github")),
        );
        if let Some(subfolder) = non_empty(&opts.repository_subfolder) {
            repository.insert("subfolder".into(), json!(subfolder));
        }
        manifest.insert("repository".into(), Value::Object(repository));
    }

    Ok(Value::Object(manifest))
}

/// Build the initial version manifest. Defaults to `1.0.0` with a single
/// npm package over stdio; the package identifier falls back to
/// `mcp-<slug>` with unsafe characters replaced.
pub fn build_version_manifest(opts: &ScaffoldOptions) -> Result<Value, ScaffoldError> {
    let version = non_empty(&opts.version).unwrap_or("1.0.0");
    if Version::parse(version).is_err() {
        return Err(ScaffoldError::InvalidVersion(version.to_string()));
    }

    let slug = if opts.slug.is_empty() {
        "server"
    } else {
        opts.slug.as_str()
    };
    let fallback_identifier = format!("mcp-{}", sanitize_identifier(slug));

    let mut manifest = Map::new();
    manifest.insert("version".into(), json!(version));
    manifest.insert(
        "packages".into(),
        json!([{
            "registryType": non_empty(&opts.package_registry_type).unwrap_or("npm"),
            "identifier": non_empty(&opts.package_identifier).unwrap_or(&fallback_identifier),
            "version": version,
            "transport": {
                "type": non_empty(&opts.package_transport_type).unwrap_or("stdio"),
            },
        }]),
    );
    if let Some(date) = non_empty(&opts.release_date) {
        manifest.insert("releaseDate".into(), json!(date));
    }

    Ok(Value::Object(manifest))
}

fn sanitize_identifier(slug: &str) -> String {
    slug.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Shallow merge of an existing manifest under a freshly generated one.
/// Generated keys win, so re-running the scaffold refreshes the managed
/// fields while hand-added keys survive. The `repository` block is merged
/// one level deeper for the same reason.
pub fn merge_manifest(existing: Option<&Value>, generated: &Value) -> Value {
    let (Some(Value::Object(existing_map)), Value::Object(generated_map)) = (existing, generated)
    else {
        return generated.clone();
    };

    let mut merged = existing_map.clone();
    for (key, value) in generated_map {
        merged.insert(key.clone(), value.clone());
    }

    let existing_repo = existing_map.get("repository");
    let generated_repo = generated_map.get("repository");
    if existing_repo.is_some() || generated_repo.is_some() {
        let mut repository = Map::new();
        if let Some(Value::Object(map)) = existing_repo {
            repository.extend(map.clone());
        }
        if let Some(Value::Object(map)) = generated_repo {
            repository.extend(map.clone());
        }
        merged.insert("repository".into(), Value::Object(repository));
    }

    Value::Object(merged)
}

fn write_json(path: &Path, value: &Value) -> Result<(), ScaffoldError> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    fs::write(path, text)?;
    Ok(())
}

fn read_json_if_exists(path: &Path) -> Result<Option<Value>, ScaffoldError> {
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&fs::read_to_string(path)?)?))
}

/// Create or update one server under `source_dir`, then schema-validate
/// both written files. Validation failure is fatal here: a scaffold that
/// leaves invalid manifests behind must not report success.
pub fn scaffold(
    source_dir: &Path,
    opts: &ScaffoldOptions,
    schemas: &SchemaSet,
) -> Result<ScaffoldOutcome, ScaffoldError> {
    let slug = opts.slug.trim();
    if slug.is_empty() {
        return Err(ScaffoldError::MissingSlug);
    }

    let server_dir = source_dir.join(slug);
    let versions_dir = server_dir.join("versions");
    fs::create_dir_all(&versions_dir)?;

    let server_json_path = server_dir.join("server.json");
    let generated_server = build_server_manifest(opts)?;
    let existing_server = read_json_if_exists(&server_json_path)?;
    let merged_server = merge_manifest(existing_server.as_ref(), &generated_server);
    write_json(&server_json_path, &merged_server)?;

    let generated_version = build_version_manifest(opts)?;
    let version = generated_version
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let version_json_path = versions_dir.join(format!("{version}.json"));
    let existing_version = read_json_if_exists(&version_json_path)?;
    let merged_version = merge_manifest(existing_version.as_ref(), &generated_version);
    write_json(&version_json_path, &merged_version)?;

    let server_ok = match schemas.check_server(&merged_server) {
        Ok(()) => true,
        Err(violations) => {
            log_violations(&format!("{slug}/server.json"), &violations);
            false
        }
    };
    let version_ok = match schemas.check_version(&merged_version) {
        Ok(()) => true,
        Err(violations) => {
            log_violations(&format!("{slug}/versions/{version}.json"), &violations);
            false
        }
    };
    if !server_ok || !version_ok {
        return Err(ScaffoldError::SchemaInvalid);
    }

    info!("Generated or updated {slug}/server.json");
    info!("Generated or updated {slug}/versions/{version}.json");

    Ok(ScaffoldOutcome {
        slug: slug.to_string(),
        server_json_path,
        version_json_path,
        version,
    })
}

/// Strictly validate a single server directory, returning how many version
/// manifests passed. Unlike the bulk scan, structural problems and invalid
/// semver are errors, not skips; a schema-invalid version file only fails
/// the run when no version survives.
pub fn validate_server_dir(
    source_dir: &Path,
    slug: &str,
    schemas: &SchemaSet,
) -> Result<usize, ScaffoldError> {
    let slug = slug.trim();
    if slug.is_empty() {
        return Err(ScaffoldError::MissingSlug);
    }

    let server_dir = source_dir.join(slug);
    let server_json_path = server_dir.join("server.json");
    let versions_dir = server_dir.join("versions");

    if !server_json_path.exists() {
        return Err(ScaffoldError::MissingManifest(server_json_path));
    }
    if !versions_dir.exists() {
        return Err(ScaffoldError::MissingVersionsDir(versions_dir));
    }

    let server_data: Value = serde_json::from_str(&fs::read_to_string(&server_json_path)?)?;
    let server_ok = match schemas.check_server(&server_data) {
        Ok(()) => true,
        Err(violations) => {
            log_violations(&format!("{slug}/server.json"), &violations);
            false
        }
    };

    let mut version_files: Vec<String> = fs::read_dir(&versions_dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(".json") && name != "latest.json")
        .collect();
    version_files.sort();

    if version_files.is_empty() {
        return Err(ScaffoldError::NoVersionManifests(versions_dir));
    }

    let mut valid_versions = 0;
    for file_name in &version_files {
        let data: Value =
            serde_json::from_str(&fs::read_to_string(versions_dir.join(file_name))?)?;
        let version_ok = match schemas.check_version(&data) {
            Ok(()) => true,
            Err(violations) => {
                log_violations(&format!("{slug}/versions/{file_name}"), &violations);
                false
            }
        };

        let version_str = data.get("version").and_then(Value::as_str).unwrap_or("");
        if Version::parse(version_str).is_err() {
            return Err(ScaffoldError::InvalidVersionFile {
                file: format!("{slug}/versions/{file_name}"),
                version: version_str.to_string(),
            });
        }

        if version_ok {
            valid_versions += 1;
        }
    }

    if !server_ok || valid_versions == 0 {
        return Err(ScaffoldError::ValidationFailed(slug.to_string()));
    }

    info!("Validation complete: {slug} ({valid_versions} version manifest(s) valid)");
    Ok(valid_versions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{seed_server, write_json as write_test_json};
    use tempfile::TempDir;

    fn schemas() -> SchemaSet {
        SchemaSet::embedded().unwrap()
    }

    fn minimal_opts(slug: &str) -> ScaffoldOptions {
        ScaffoldOptions {
            slug: slug.to_string(),
            name: Some(format!("io.github.acme/{slug}")),
            description: Some("A scaffolded server".to_string()),
            ..Default::default()
        }
    }

    // =========================================================================
    // Manifest builders
    // =========================================================================

    #[test]
    fn server_manifest_requires_name_and_description() {
        let mut opts = minimal_opts("demo");
        opts.name = None;
        assert!(matches!(
            build_server_manifest(&opts),
            Err(ScaffoldError::MissingName)
        ));

        let mut opts = minimal_opts("demo");
        opts.description = Some(String::new());
        assert!(matches!(
            build_server_manifest(&opts),
            Err(ScaffoldError::MissingDescription)
        ));
    }

    #[test]
    fn minimal_server_manifest_has_exactly_two_fields() {
        let manifest = build_server_manifest(&minimal_opts("demo")).unwrap();
        let map = manifest.as_object().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["name"], "io.github.acme/demo");
        assert_eq!(map["description"], "A scaffolded server");
    }

    #[test]
    fn repository_defaults_source_to_github() {
        let mut opts = minimal_opts("demo");
        opts.repository_url = Some("https://github.com/acme/demo".to_string());
        let manifest = build_server_manifest(&opts).unwrap();

        assert_eq!(manifest["repository"]["url"], "https://github.com/acme/demo");
        assert_eq!(manifest["repository"]["source"], "github");
        assert!(manifest["repository"].get("subfolder").is_none());
    }

    #[test]
    fn repository_subfolder_carried_when_given() {
        let mut opts = minimal_opts("demo");
        opts.repository_url = Some("https://github.com/acme/mono".to_string());
        opts.repository_source = Some("gitlab".to_string());
        opts.repository_subfolder = Some("packages/demo".to_string());
        let manifest = build_server_manifest(&opts).unwrap();

        assert_eq!(manifest["repository"]["source"], "gitlab");
        assert_eq!(manifest["repository"]["subfolder"], "packages/demo");
    }

    #[test]
    fn version_manifest_defaults() {
        let manifest = build_version_manifest(&minimal_opts("demo")).unwrap();

        assert_eq!(manifest["version"], "1.0.0");
        let package = &manifest["packages"][0];
        assert_eq!(package["registryType"], "npm");
        assert_eq!(package["identifier"], "mcp-demo");
        assert_eq!(package["version"], "1.0.0");
        assert_eq!(package["transport"]["type"], "stdio");
        assert!(manifest.get("releaseDate").is_none());
    }

    #[test]
    fn fallback_identifier_sanitizes_slug() {
        let manifest = build_version_manifest(&minimal_opts("my server!")).unwrap();
        assert_eq!(manifest["packages"][0]["identifier"], "mcp-my-server-");
    }

    #[test]
    fn explicit_package_fields_override_defaults() {
        let mut opts = minimal_opts("demo");
        opts.version = Some("2.1.0".to_string());
        opts.package_registry_type = Some("pypi".to_string());
        opts.package_identifier = Some("demo-mcp".to_string());
        opts.package_transport_type = Some("sse".to_string());
        opts.release_date = Some("2026-08-01".to_string());
        let manifest = build_version_manifest(&opts).unwrap();

        assert_eq!(manifest["version"], "2.1.0");
        let package = &manifest["packages"][0];
        assert_eq!(package["registryType"], "pypi");
        assert_eq!(package["identifier"], "demo-mcp");
        assert_eq!(package["version"], "2.1.0");
        assert_eq!(package["transport"]["type"], "sse");
        assert_eq!(manifest["releaseDate"], "2026-08-01");
    }

    #[test]
    fn bad_version_is_rejected() {
        let mut opts = minimal_opts("demo");
        opts.version = Some("one-point-oh".to_string());
        assert!(matches!(
            build_version_manifest(&opts),
            Err(ScaffoldError::InvalidVersion(v)) if v == "one-point-oh"
        ));
    }

    // =========================================================================
    // Merging
    // =========================================================================

    #[test]
    fn merge_without_existing_returns_generated() {
        let generated = json!({"name": "a", "description": "b"});
        assert_eq!(merge_manifest(None, &generated), generated);
    }

    #[test]
    fn merge_generated_wins_but_extras_survive() {
        let existing = json!({
            "name": "old-name",
            "description": "old",
            "websiteUrl": "https://kept.example",
            "_meta": {"custom": true}
        });
        let generated = json!({"name": "new-name", "description": "new"});
        let merged = merge_manifest(Some(&existing), &generated);

        assert_eq!(merged["name"], "new-name");
        assert_eq!(merged["description"], "new");
        assert_eq!(merged["websiteUrl"], "https://kept.example");
        assert_eq!(merged["_meta"]["custom"], true);
    }

    #[test]
    fn merge_repository_one_level_deep() {
        let existing = json!({
            "name": "a", "description": "d",
            "repository": {"url": "https://old", "id": "repo-123"}
        });
        let generated = json!({
            "name": "a", "description": "d",
            "repository": {"url": "https://new", "source": "github"}
        });
        let merged = merge_manifest(Some(&existing), &generated);

        assert_eq!(merged["repository"]["url"], "https://new");
        assert_eq!(merged["repository"]["source"], "github");
        assert_eq!(merged["repository"]["id"], "repo-123");
    }

    #[test]
    fn merge_keeps_existing_repository_when_generated_has_none() {
        let existing = json!({
            "name": "a", "description": "d",
            "repository": {"url": "https://old"}
        });
        let generated = json!({"name": "a", "description": "d"});
        let merged = merge_manifest(Some(&existing), &generated);
        assert_eq!(merged["repository"]["url"], "https://old");
    }

    // =========================================================================
    // Scaffolding end to end
    // =========================================================================

    #[test]
    fn scaffold_creates_valid_server() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("servers");

        let outcome = scaffold(&source, &minimal_opts("demo"), &schemas()).unwrap();

        assert_eq!(outcome.version, "1.0.0");
        assert!(outcome.server_json_path.exists());
        assert!(outcome.version_json_path.exists());
        assert!(
            outcome
                .version_json_path
                .ends_with("demo/versions/1.0.0.json")
        );

        let written: Value =
            serde_json::from_str(&fs::read_to_string(&outcome.server_json_path).unwrap()).unwrap();
        assert!(schemas().check_server(&written).is_ok());
    }

    #[test]
    fn scaffold_rerun_preserves_manual_fields() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("servers");
        scaffold(&source, &minimal_opts("demo"), &schemas()).unwrap();

        // Simulate a hand edit between runs.
        let manifest_path = source.join("demo/server.json");
        let mut manifest: Value =
            serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();
        manifest["websiteUrl"] = json!("https://demo.example");
        write_test_json(&manifest_path, &manifest);

        let mut opts = minimal_opts("demo");
        opts.description = Some("Updated description".to_string());
        scaffold(&source, &opts, &schemas()).unwrap();

        let merged: Value =
            serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();
        assert_eq!(merged["description"], "Updated description");
        assert_eq!(merged["websiteUrl"], "https://demo.example");
    }

    #[test]
    fn scaffold_rejects_blank_slug() {
        let tmp = TempDir::new().unwrap();
        let mut opts = minimal_opts("demo");
        opts.slug = "   ".to_string();
        assert!(matches!(
            scaffold(tmp.path(), &opts, &schemas()),
            Err(ScaffoldError::MissingSlug)
        ));
    }

    #[test]
    fn scaffold_fails_when_merge_turns_invalid() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("servers");
        // A pre-existing manifest with a non-string title survives the merge
        // (the scaffold does not manage `title` unless asked) and must fail
        // the final validation.
        write_test_json(
            &source.join("demo/server.json"),
            &json!({"name": "io.github.acme/demo", "description": "d", "title": 5}),
        );

        assert!(matches!(
            scaffold(&source, &minimal_opts("demo"), &schemas()),
            Err(ScaffoldError::SchemaInvalid)
        ));
    }

    // =========================================================================
    // Single-server validation
    // =========================================================================

    #[test]
    fn validate_counts_valid_versions() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("servers");
        seed_server(&source, "io.github.acme/demo", &["1.0.0", "1.1.0"]);

        let count = validate_server_dir(&source, "demo", &schemas()).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn validate_missing_manifest_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("servers");
        fs::create_dir_all(source.join("ghost")).unwrap();

        assert!(matches!(
            validate_server_dir(&source, "ghost", &schemas()),
            Err(ScaffoldError::MissingManifest(_))
        ));
    }

    #[test]
    fn validate_missing_versions_dir_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("servers");
        write_test_json(
            &source.join("demo/server.json"),
            &json!({"name": "io.github.acme/demo", "description": "d"}),
        );

        assert!(matches!(
            validate_server_dir(&source, "demo", &schemas()),
            Err(ScaffoldError::MissingVersionsDir(_))
        ));
    }

    #[test]
    fn validate_empty_versions_dir_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("servers");
        seed_server(&source, "io.github.acme/demo", &["1.0.0"]);
        fs::remove_file(source.join("demo/versions/1.0.0.json")).unwrap();

        assert!(matches!(
            validate_server_dir(&source, "demo", &schemas()),
            Err(ScaffoldError::NoVersionManifests(_))
        ));
    }

    #[test]
    fn validate_invalid_semver_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("servers");
        seed_server(&source, "io.github.acme/demo", &["1.0.0"]);
        write_test_json(
            &source.join("demo/versions/next.json"),
            &json!({"version": "not-semver"}),
        );

        assert!(matches!(
            validate_server_dir(&source, "demo", &schemas()),
            Err(ScaffoldError::InvalidVersionFile { version, .. }) if version == "not-semver"
        ));
    }

    #[test]
    fn validate_tolerates_one_bad_version_among_good() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("servers");
        seed_server(&source, "io.github.acme/demo", &["1.0.0"]);
        // Schema-invalid (packages must be an array) but semver-parsable.
        write_test_json(
            &source.join("demo/versions/2.0.0.json"),
            &json!({"version": "2.0.0", "packages": "nope"}),
        );

        let count = validate_server_dir(&source, "demo", &schemas()).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn validate_fails_when_every_version_is_invalid() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("servers");
        seed_server(&source, "io.github.acme/demo", &["1.0.0"]);
        write_test_json(
            &source.join("demo/versions/1.0.0.json"),
            &json!({"version": "1.0.0", "packages": "nope"}),
        );

        assert!(matches!(
            validate_server_dir(&source, "demo", &schemas()),
            Err(ScaffoldError::ValidationFailed(slug)) if slug == "demo"
        ));
    }
}
