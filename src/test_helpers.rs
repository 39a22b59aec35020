//! Shared test utilities for the staticreg test suite.
//!
//! Builds throwaway source trees in the layout the scanner expects: one
//! directory per server holding a `server.json` and a `versions/` directory
//! with one manifest per release.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let root = tmp.path().join("servers");
//! seed_server(&root, "io.github.acme/demo", &["1.0.0", "1.1.0"]);
//! ```

use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};

/// Write a JSON value pretty-printed, creating parent directories.
pub fn write_json(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut text = serde_json::to_string_pretty(value).unwrap();
    text.push('\n');
    fs::write(path, text).unwrap();
}

/// Seed one schema-valid server under `root`, named after the final
/// segment of `name`, with one minimal version manifest per entry.
/// Returns the server directory.
pub fn seed_server(root: &Path, name: &str, versions: &[&str]) -> PathBuf {
    let dir_name = name.rsplit('/').next().unwrap_or(name);
    let dir = root.join(dir_name);
    fs::create_dir_all(dir.join("versions")).unwrap();

    write_json(
        &dir.join("server.json"),
        &json!({
            "name": name,
            "description": format!("The {dir_name} server"),
        }),
    );
    for version in versions {
        write_json(
            &dir.join("versions").join(format!("{version}.json")),
            &json!({"version": version}),
        );
    }
    dir
}
