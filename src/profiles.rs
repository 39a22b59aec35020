//! Hosting-platform profile files.
//!
//! The emitted tree is plain static files, but hosts differ in how they
//! want caching, redirects, and processing configured:
//!
//! - **Cloudflare Pages** reads `_headers` and `_redirects` from the output
//!   root. The generated rules pin global security headers, open up CORS
//!   for the API paths, and split cache policy by mutability: index and
//!   `latest` documents are `no-store`, the flat index gets a short
//!   `max-age`, and concrete version documents are immutable for a year.
//! - **GitHub Pages** needs an empty `.nojekyll` marker so files starting
//!   with `_` survive publishing.
//! - **None** is host-agnostic: no platform files at all.
//!
//! Switching profiles between runs on the same output directory must leave
//! no stale files behind, so applying a profile removes the other profiles'
//! files. Pure file-presence management; nothing is merged.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("unsupported deployment profile: {0}. Supported values: github, cloudflare, none")]
pub struct ProfileParseError(String);

/// Target hosting platform for the emitted tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostingProfile {
    Cloudflare,
    GithubPages,
    None,
}

impl FromStr for HostingProfile {
    type Err = ProfileParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cloudflare" => Ok(Self::Cloudflare),
            "github" => Ok(Self::GithubPages),
            "none" => Ok(Self::None),
            other => Err(ProfileParseError(other.to_string())),
        }
    }
}

impl fmt::Display for HostingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cloudflare => "cloudflare",
            Self::GithubPages => "github",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// Write or remove the profile files for `profile` at the output root.
pub fn apply(profile: HostingProfile, output_root: &Path, registry_version: &str) -> io::Result<()> {
    let headers_path = output_root.join("_headers");
    let redirects_path = output_root.join("_redirects");
    let nojekyll_path = output_root.join(".nojekyll");

    match profile {
        HostingProfile::Cloudflare => {
            fs::write(&headers_path, build_headers(registry_version))?;
            fs::write(&redirects_path, build_redirects(registry_version))?;
            remove_if_present(&nojekyll_path)?;
        }
        HostingProfile::GithubPages => {
            fs::write(&nojekyll_path, "")?;
            remove_if_present(&headers_path)?;
            remove_if_present(&redirects_path)?;
        }
        HostingProfile::None => {
            remove_if_present(&nojekyll_path)?;
            remove_if_present(&headers_path)?;
            remove_if_present(&redirects_path)?;
        }
    }
    Ok(())
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// CORS + cache headers shared by every API path.
///
/// Extensionless twins are served without `Content-Type` so the host's
/// default applies; the `.json` form pins `application/json`.
fn api_headers(cache_control: &str, content_type: bool) -> Vec<String> {
    let mut headers: Vec<String> = [
        "Access-Control-Allow-Origin: *",
        "Access-Control-Allow-Methods: GET, HEAD, OPTIONS",
        "Access-Control-Allow-Headers: Accept, Content-Type, If-None-Match, If-Modified-Since, Cache-Control",
        "Access-Control-Expose-Headers: ETag, Last-Modified, Cache-Control, Content-Length, Content-Type",
        "Access-Control-Max-Age: 86400",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    if content_type {
        headers.push("Content-Type: application/json; charset=utf-8".to_string());
    }
    headers.push(format!("Cache-Control: {cache_control}"));
    headers
}

fn header_section(path_pattern: &str, headers: &[String]) -> String {
    let lines: Vec<String> = headers.iter().map(|h| format!("  {h}")).collect();
    format!("{path_pattern}\n{}", lines.join("\n"))
}

/// Build the Cloudflare `_headers` rules for one registry version.
pub fn build_headers(registry_version: &str) -> String {
    let v = registry_version;
    let security: Vec<String> = [
        "Strict-Transport-Security: max-age=63072000; includeSubDomains; preload",
        "Content-Security-Policy: default-src 'none'; script-src 'self' https://static.cloudflareinsights.com; script-src-elem 'self' https://static.cloudflareinsights.com; connect-src 'self' https://cloudflareinsights.com; frame-ancestors 'none'; base-uri 'none'; form-action 'none'",
        "X-Content-Type-Options: nosniff",
        "X-Frame-Options: DENY",
        "Referrer-Policy: no-referrer",
        "Permissions-Policy: geolocation=(), microphone=(), camera=(), usb=(), payment=(), accelerometer=(), gyroscope=(), magnetometer=()",
        "Cross-Origin-Opener-Policy: same-origin",
        "Cross-Origin-Resource-Policy: cross-origin",
        "X-Permitted-Cross-Domain-Policies: none",
        "Origin-Agent-Cluster: ?1",
        "X-Robots-Tag: noindex, nofollow",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    let sections = [
        header_section("/*", &security),
        header_section("/index.html", &["Cache-Control: no-store".to_string()]),
        header_section(
            &format!("/v{v}/index.html"),
            &["Cache-Control: no-store".to_string()],
        ),
        header_section(
            &format!("/v{v}/servers.json"),
            &api_headers("public, max-age=300", true),
        ),
        header_section(
            &format!("/v{v}/servers"),
            &api_headers("public, max-age=300", false),
        ),
        header_section(
            &format!("/v{v}/servers/index.json"),
            &api_headers("no-store", true),
        ),
        header_section(&format!("/v{v}/health"), &api_headers("no-store", false)),
        header_section(&format!("/v{v}/health.json"), &api_headers("no-store", true)),
        header_section(&format!("/v{v}/ping"), &api_headers("no-store", false)),
        header_section(&format!("/v{v}/ping.json"), &api_headers("no-store", true)),
        header_section(&format!("/v{v}/version"), &api_headers("no-store", false)),
        header_section(
            &format!("/v{v}/version.json"),
            &api_headers("no-store", true),
        ),
        header_section(
            &format!("/v{v}/servers/*/versions/latest.json"),
            &api_headers("no-store", true),
        ),
        header_section(
            &format!("/v{v}/servers/*/versions/latest"),
            &api_headers("no-store", false),
        ),
        header_section(
            &format!("/v{v}/servers/*/versions/*.json"),
            &api_headers("public, max-age=31536000, immutable", true),
        ),
        header_section(
            &format!("/v{v}/servers/*/versions/*"),
            &api_headers("public, max-age=31536000, immutable", false),
        ),
    ];

    format!("{}\n", sections.join("\n\n"))
}

/// Build the Cloudflare `_redirects` rules: short-path aliases into the
/// versioned tree.
pub fn build_redirects(registry_version: &str) -> String {
    let v = registry_version;
    let lines = [
        format!("/ /v{v}/ 302"),
        format!("/v{v} /v{v}/ 302"),
        format!("/servers.json /v{v}/servers.json 302"),
        format!("/servers /v{v}/servers/index.json 302"),
        format!("/health /v{v}/health.json 302"),
        format!("/ping /v{v}/ping.json 302"),
        format!("/version /v{v}/version.json 302"),
    ];
    format!("{}\n", lines.join("\n"))
}
