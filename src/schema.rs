//! JSON Schema validation for server and version manifests.
//!
//! The registry accepts two document kinds: the per-server metadata file
//! (`server.json`) and the per-release version files (`versions/*.json`).
//! Both are validated against JSON Schemas before they contribute to the
//! output. The schemas ship embedded in the binary; `--schemas <DIR>` swaps
//! in `server.schema.json` / `version.schema.json` from a directory instead,
//! for registries that extend the stock shapes.
//!
//! Compilation happens once per run and the resulting [`SchemaSet`] is
//! passed by reference through the scan and scaffold paths. A schema that
//! fails to compile aborts the run; an instance that fails validation is a
//! local problem reported as a list of [`SchemaViolation`]s.

use jsonschema::Validator;
use log::error;
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Stock schema for `server.json` documents.
const SERVER_SCHEMA: &str = include_str!("../schemas/server.schema.json");
/// Stock schema for `versions/<semver>.json` documents.
const VERSION_SCHEMA: &str = include_str!("../schemas/version.schema.json");

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("schema is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("schema compilation failed: {0}")]
    Compile(String),
}

/// One failed assertion: where in the instance, and what went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON Pointer into the offending instance; `/` for the root.
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// The compiled server + version schema pair for one run.
pub struct SchemaSet {
    server: Validator,
    version: Validator,
}

impl SchemaSet {
    /// Compile the schemas embedded in the binary.
    pub fn embedded() -> Result<Self, SchemaError> {
        Self::compile(SERVER_SCHEMA, VERSION_SCHEMA)
    }

    /// Compile `server.schema.json` and `version.schema.json` from a directory.
    pub fn from_dir(dir: &Path) -> Result<Self, SchemaError> {
        let server = fs::read_to_string(dir.join("server.schema.json"))?;
        let version = fs::read_to_string(dir.join("version.schema.json"))?;
        Self::compile(&server, &version)
    }

    /// Compile a schema pair from raw JSON text.
    pub fn compile(server_schema: &str, version_schema: &str) -> Result<Self, SchemaError> {
        Ok(Self {
            server: compile_one(server_schema)?,
            version: compile_one(version_schema)?,
        })
    }

    /// Validate a `server.json` document.
    pub fn check_server(&self, instance: &Value) -> Result<(), Vec<SchemaViolation>> {
        check(&self.server, instance)
    }

    /// Validate a version document.
    pub fn check_version(&self, instance: &Value) -> Result<(), Vec<SchemaViolation>> {
        check(&self.version, instance)
    }
}

/// Format assertions are opt-in in recent JSON Schema drafts; the registry
/// schemas rely on `uri` and `date-time`, so they are switched on here.
fn compile_one(schema_text: &str) -> Result<Validator, SchemaError> {
    let schema: Value = serde_json::from_str(schema_text)?;
    jsonschema::options()
        .should_validate_formats(true)
        .build(&schema)
        .map_err(|e| SchemaError::Compile(e.to_string()))
}

/// Report a failed validation at error level, one line per violation.
pub fn log_violations(filename: &str, violations: &[SchemaViolation]) {
    error!("Validation failed for {filename}:");
    for violation in violations {
        error!("  - {violation}");
    }
}

fn check(validator: &Validator, instance: &Value) -> Result<(), Vec<SchemaViolation>> {
    let violations: Vec<SchemaViolation> = validator
        .iter_errors(instance)
        .map(|err| {
            let pointer = err.instance_path.to_string();
            SchemaViolation {
                path: if pointer.is_empty() {
                    "/".to_string()
                } else {
                    pointer
                },
                message: err.to_string(),
            }
        })
        .collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
