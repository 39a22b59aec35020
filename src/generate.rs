//! Output tree generation.
//!
//! Stage 2 of the registry pipeline. Takes the aggregated snapshot and
//! writes the complete static registry: HTML entry points, the flat
//! server index, API-compatible endpoint files, and the `v0` alias.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html                   # Redirects to ./v<version>/
//! ├── _headers, _redirects         # Hosting profile files (conditional)
//! ├── .nojekyll
//! ├── v<version>/
//! │   ├── index.html               # Landing page listing the endpoints
//! │   ├── servers.json             # Flat index of every server
//! │   ├── health.json, health      # Service endpoints, written as twins
//! │   ├── ping.json, ping
//! │   ├── version.json, version
//! │   └── servers/
//! │       ├── index.json, index    # Paginated-API shaped list
//! │       └── io.github.acme%2Fx/  # Percent-encoded server name
//! │           ├── versions.json
//! │           └── versions/
//! │               ├── index.json
//! │               ├── 1.0.0.json, 1.0.0
//! │               └── latest.json, latest
//! └── v0/                          # Byte-for-byte copy of v<version>/
//! ```
//!
//! ## API Compatibility
//!
//! Registry clients built against the hosted MCP registry request
//! extension-less paths like `/v0/servers/<name>/versions/latest`. Static
//! hosts serve files, so every API endpoint is written twice: once with a
//! `.json` extension and once without ("twins", identical bytes). Version
//! payloads are wrapped in the hosted API's envelope, a `server` object
//! plus a `_meta` block keyed by the official registry namespace.
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.
//! Templates are type-safe Rust code with automatic XSS escaping.

use crate::naming::encode_segment;
use crate::profiles::{self, HostingProfile};
use crate::types::{RegistrySnapshot, Server, VersionRecord};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use log::info;
use maud::{DOCTYPE, Markup, html};
use serde::Serialize;
use serde_json::{Value, json};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

// ============================================================================
// API response shapes
// ============================================================================

/// One server at one version, wrapped in the hosted registry's envelope.
#[derive(Debug, Serialize)]
pub struct ServerResponse {
    pub server: Value,
    #[serde(rename = "_meta")]
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    #[serde(rename = "io.modelcontextprotocol.registry/official")]
    pub official: OfficialMeta,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficialMeta {
    pub status: &'static str,
    pub published_at: String,
    pub updated_at: String,
    pub is_latest: bool,
}

/// List envelope with the pagination block clients expect. The registry is
/// fully materialized, so `nextCursor` is always null, never omitted.
#[derive(Debug, Serialize)]
pub struct ServerList {
    pub servers: Vec<ServerResponse>,
    pub metadata: ListMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMetadata {
    pub count: usize,
    pub next_cursor: Option<String>,
}

/// One row of the flat `servers.json` index, summarizing a server at its
/// latest version.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRow {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<Value>,
    pub packages: Vec<Value>,
    pub remotes: Vec<Value>,
    pub latest_version: String,
    pub versions: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatIndex {
    pub version: String,
    pub generated_at: String,
    pub servers: Vec<IndexRow>,
}

// ============================================================================
// Payload builders
// ============================================================================

/// Shallow merge of server metadata and a version payload into one detail
/// object. Version keys win on conflict; neither input is recursed into.
pub fn merge_detail(server_data: &Value, version_data: &Value) -> Value {
    let mut merged = serde_json::Map::new();
    for source in [server_data, version_data] {
        if let Value::Object(map) = source {
            for (key, value) in map {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(merged)
}

fn server_response(
    server: &Server,
    record: &VersionRecord,
    is_latest: bool,
    published_at: &str,
    updated_at: &str,
) -> ServerResponse {
    ServerResponse {
        server: merge_detail(&server.server_data, &record.data),
        meta: ResponseMeta {
            official: OfficialMeta {
                status: "active",
                published_at: published_at.to_string(),
                updated_at: updated_at.to_string(),
                is_latest,
            },
        },
    }
}

fn server_list(servers: Vec<ServerResponse>) -> ServerList {
    let count = servers.len();
    ServerList {
        servers,
        metadata: ListMetadata {
            count,
            next_cursor: None,
        },
    }
}

fn index_row(server: &Server) -> IndexRow {
    let detail = merge_detail(&server.server_data, &server.latest().data);
    let text = |key: &str| detail.get(key).and_then(Value::as_str).map(str::to_string);
    let list = |key: &str| {
        detail
            .get(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    };

    IndexRow {
        name: text("name").unwrap_or_default(),
        title: text("title"),
        description: text("description").unwrap_or_default(),
        version: text("version").unwrap_or_default(),
        website_url: text("websiteUrl"),
        repository: detail.get("repository").cloned(),
        packages: list("packages"),
        remotes: list("remotes"),
        latest_version: server.latest().version.clone(),
        versions: server.versions.iter().map(|v| v.version.clone()).collect(),
    }
}

// ============================================================================
// Release dates
// ============================================================================

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates, read as
/// midnight UTC.
fn parse_release_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

fn release_date_iso(record: &VersionRecord) -> Option<String> {
    let raw = record.data.get("releaseDate")?.as_str()?;
    if raw.is_empty() {
        return None;
    }
    parse_release_date(raw).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Earliest and latest known release dates across a server's versions.
/// The run timestamp stands in for both when no version carries a
/// parsable date; unparsable dates are ignored, not errors.
fn published_updated(versions: &[VersionRecord], fallback: &str) -> (String, String) {
    let mut dates: Vec<String> = versions.iter().filter_map(release_date_iso).collect();
    dates.sort();
    match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => (first.clone(), last.clone()),
        _ => (fallback.to_string(), fallback.to_string()),
    }
}

// ============================================================================
// HTML pages
// ============================================================================

fn root_redirect_page(registry_version: &str) -> Markup {
    let versioned = format!("./v{registry_version}/");
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "MCP Server Registry" }
                meta http-equiv="refresh" content=(format!("0; url={versioned}"));
            }
            body {
                main {
                    h1 { "MCP Server Registry" }
                    p { "Redirecting to the latest registry index…" }
                    p {
                        "If you are not redirected, open "
                        a href=(versioned) { "v" (registry_version) }
                        " or "
                        a href=(format!("{versioned}servers.json")) { "servers.json" }
                        "."
                    }
                }
            }
        }
    }
}

fn version_landing_page(registry_version: &str) -> Markup {
    let title = format!("MCP Server Registry v{registry_version}");
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
            }
            body {
                main {
                    h1 { (title) }
                    p { "Static registry index for MCP server discovery." }
                    ul {
                        li { a href="./servers/index.json" { "servers (API-compatible)" } }
                        li { a href="./servers.json" { "servers.json" } }
                        li { a href="./health.json" { "health.json" } }
                        li { a href="./ping.json" { "ping.json" } }
                        li { a href="./version.json" { "version.json" } }
                    }
                }
            }
        }
    }
}

// ============================================================================
// Writers
// ============================================================================

/// Pretty-printed JSON with a trailing newline.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), GenerateError> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    fs::write(path, text)?;
    Ok(())
}

/// Writes `<stem>.json` plus an identical extension-less twin. The stem may
/// itself contain dots (semver), so the extension is appended, never swapped.
fn write_twin<T: Serialize>(dir: &Path, stem: &str, value: &T) -> Result<(), GenerateError> {
    write_json(&dir.join(format!("{stem}.json")), value)?;
    write_json(&dir.join(stem), value)
}

/// Write the complete registry tree under `output_root`.
///
/// Directories are created before anything is written into them. Servers
/// arrive sorted from the scan stage, so the emitted lists are stable
/// across runs with the same input.
pub fn generate(
    output_root: &Path,
    registry_version: &str,
    profile: HostingProfile,
    snapshot: &RegistrySnapshot,
) -> Result<(), GenerateError> {
    let registry_dir = output_root.join(format!("v{registry_version}"));
    fs::create_dir_all(output_root)?;
    fs::create_dir_all(&registry_dir)?;

    let generated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    let root_index = output_root.join("index.html");
    let version_index = registry_dir.join("index.html");
    fs::write(&root_index, root_redirect_page(registry_version).into_string())?;
    fs::write(
        &version_index,
        version_landing_page(registry_version).into_string(),
    )?;
    info!("Wrote {}", root_index.display());
    info!("Wrote {}", version_index.display());

    profiles::apply(profile, output_root, registry_version)?;

    let rows: Vec<IndexRow> = snapshot.servers.iter().map(index_row).collect();
    write_json(
        &registry_dir.join("servers.json"),
        &FlatIndex {
            version: registry_version.to_string(),
            generated_at: generated_at.clone(),
            servers: rows,
        },
    )?;

    write_twin(&registry_dir, "health", &json!({"status": "ok"}))?;
    write_twin(&registry_dir, "ping", &json!({"status": "ok"}))?;
    write_twin(
        &registry_dir,
        "version",
        &json!({"version": registry_version, "generatedAt": generated_at}),
    )?;

    let servers_dir = registry_dir.join("servers");
    fs::create_dir_all(&servers_dir)?;

    let latest_responses: Vec<ServerResponse> = snapshot
        .servers
        .iter()
        .map(|server| {
            let (published_at, updated_at) = published_updated(&server.versions, &generated_at);
            server_response(server, server.latest(), true, &published_at, &updated_at)
        })
        .collect();
    write_twin(&servers_dir, "index", &server_list(latest_responses))?;

    for server in &snapshot.servers {
        emit_server(&servers_dir, server, &generated_at)?;
    }

    Ok(())
}

/// Write one server's subtree: the version list at both spellings, one
/// twin pair per version, and the `latest` alias.
fn emit_server(
    servers_dir: &Path,
    server: &Server,
    generated_at: &str,
) -> Result<(), GenerateError> {
    let server_dir = servers_dir.join(encode_segment(&server.name));
    let versions_dir = server_dir.join("versions");
    fs::create_dir_all(&versions_dir)?;

    let (published_at, updated_at) = published_updated(&server.versions, generated_at);
    let latest_version = server.latest().version.clone();

    let responses: Vec<ServerResponse> = server
        .versions
        .iter()
        .map(|record| {
            server_response(
                server,
                record,
                record.version == latest_version,
                &published_at,
                &updated_at,
            )
        })
        .collect();
    let version_index = server_list(responses);
    // Same payload at both spellings; neither location gets a twin.
    write_json(&server_dir.join("versions.json"), &version_index)?;
    write_json(&versions_dir.join("index.json"), &version_index)?;

    for record in &server.versions {
        let payload = server_response(
            server,
            record,
            record.version == latest_version,
            &published_at,
            &updated_at,
        );
        write_twin(&versions_dir, &record.version, &payload)?;
    }

    let latest_payload = server_response(server, server.latest(), true, &published_at, &updated_at);
    write_twin(&versions_dir, "latest", &latest_payload)?;

    Ok(())
}

/// Replace the fixed `v0` alias with a copy of the current version
/// directory. The alias is removed first so no stale file survives.
pub fn create_version_alias(
    output_root: &Path,
    registry_version: &str,
) -> Result<(), GenerateError> {
    let source = output_root.join(format!("v{registry_version}"));
    let alias = output_root.join("v0");

    // `--registry-version 0` would otherwise delete its own source.
    if source == alias {
        return Ok(());
    }

    if alias.exists() {
        fs::remove_dir_all(&alias)?;
    }

    for entry in WalkDir::new(&source) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(&source)
            .map_err(|_| io::Error::other("walked outside alias source"))?;
        let target = alias.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}
