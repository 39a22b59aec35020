//! CLI run summaries.
//!
//! The log macros carry per-file diagnostics; what lands on stdout at the
//! end of a run is formatted here. Every command prints the same shape: a
//! server inventory (name, latest version, version count, source root),
//! then checkmarked result lines.
//!
//! ```text
//! Servers
//!     io.github.acme/alpha 1.2.0 (3 version(s), local)
//!     io.github.acme/beta 0.9.1 (1 version(s), external:./extra)
//!
//! ✓ Registry generated at dist/v0.1
//! ✓ API compatibility alias at dist/v0
//! ✓ Total servers: 2
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.

use crate::scaffold::ScaffoldOutcome;
use crate::types::{RegistrySnapshot, Server};
use std::path::Path;

fn server_line(server: &Server) -> String {
    format!(
        "{} {} ({} version(s), {})",
        server.name,
        server.latest().version,
        server.versions.len(),
        server.source
    )
}

fn server_inventory(snapshot: &RegistrySnapshot) -> Vec<String> {
    let mut lines = vec!["Servers".to_string()];
    for server in &snapshot.servers {
        lines.push(format!("    {}", server_line(server)));
    }
    lines
}

// ============================================================================
// Build
// ============================================================================

/// Format the end-of-build summary: inventory plus where the tree and its
/// `v0` alias landed.
pub fn format_build_summary(
    snapshot: &RegistrySnapshot,
    registry_dir: &Path,
    alias_dir: &Path,
) -> Vec<String> {
    let mut lines = server_inventory(snapshot);
    lines.push(String::new());
    lines.push(format!(
        "\u{2713} Registry generated at {}",
        registry_dir.display()
    ));
    lines.push(format!(
        "\u{2713} API compatibility alias at {}",
        alias_dir.display()
    ));
    lines.push(format!("\u{2713} Total servers: {}", snapshot.len()));
    lines
}

/// Print the build summary to stdout.
pub fn print_build_summary(snapshot: &RegistrySnapshot, registry_dir: &Path, alias_dir: &Path) {
    for line in format_build_summary(snapshot, registry_dir, alias_dir) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the check-mode summary. An empty registry is reported, not an
/// error: check answers "what would build", and the answer can be nothing.
pub fn format_check_summary(snapshot: &RegistrySnapshot) -> Vec<String> {
    let mut lines = Vec::new();
    if !snapshot.is_empty() {
        lines.extend(server_inventory(snapshot));
        lines.push(String::new());
    }
    lines.push(format!(
        "\u{2713} Validation complete: {} server(s) validated successfully",
        snapshot.len()
    ));
    lines
}

/// Print the check summary to stdout.
pub fn print_check_summary(snapshot: &RegistrySnapshot) {
    for line in format_check_summary(snapshot) {
        println!("{}", line);
    }
}

/// Format the single-entry check result (`check --server <slug>`).
pub fn format_server_check_summary(slug: &str, valid_versions: usize) -> Vec<String> {
    vec![format!(
        "\u{2713} Validation complete: {slug} ({valid_versions} version manifest(s) valid)"
    )]
}

/// Print the single-entry check result to stdout.
pub fn print_server_check_summary(slug: &str, valid_versions: usize) {
    for line in format_server_check_summary(slug, valid_versions) {
        println!("{}", line);
    }
}

// ============================================================================
// New server
// ============================================================================

/// Format the scaffold result: the two files that were created or updated.
pub fn format_scaffold_summary(outcome: &ScaffoldOutcome) -> Vec<String> {
    vec![
        format!(
            "\u{2713} Generated or updated {}/server.json",
            outcome.slug
        ),
        format!(
            "\u{2713} Generated or updated {}/versions/{}.json",
            outcome.slug, outcome.version
        ),
    ]
}

/// Print the scaffold summary to stdout.
pub fn print_scaffold_summary(outcome: &ScaffoldOutcome) {
    for line in format_scaffold_summary(outcome) {
        println!("{}", line);
    }
}
