//! # Staticreg
//!
//! A static-site generator for MCP server registry catalogs. Your filesystem
//! is the data source: each subdirectory of `servers/` is one server entry,
//! holding a metadata file and a `versions/` directory of per-version files.
//! The output is a plain static tree shaped like the MCP registry's REST API.
//!
//! # Architecture: Two-Stage Pipeline
//!
//! Staticreg processes a catalog in two independent stages, joined by one
//! in-memory snapshot:
//!
//! ```text
//! 1. Scan      servers/  →  RegistrySnapshot   (filesystem → validated data)
//! 2. Generate  snapshot  →  dist/              (API-shaped static tree)
//! ```
//!
//! The snapshot is the contract between them: sorted server names, versions
//! in descending semantic-version order, duplicates already resolved. The
//! generate stage never re-validates and never re-orders — it only projects.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Stage 1 — resolves source roots, reads and validates entries, aggregates the snapshot |
//! | [`generate`] | Stage 2 — projects the snapshot into the versioned output tree using Maud for HTML |
//! | [`schema`] | JSON Schema pair (server + version), compiled once and threaded through the run |
//! | [`config`] | Run configuration struct and the optional registry config file loader |
//! | [`profiles`] | Hosting-platform profile files: Cloudflare `_headers`/`_redirects`, GitHub `.nojekyll` |
//! | [`scaffold`] | `new-server` manifests: build, merge with existing files, strict validation |
//! | [`naming`] | Percent-encoding of server names into URL-safe directory segments |
//! | [`types`] | Shared pipeline types (`SourceRoot`, `Server`, `RegistrySnapshot`) |
//! | [`output`] | CLI output formatting — run summaries for build, check, and scaffold |
//!
//! # Design Decisions
//!
//! ## Static API Emulation (Twin Files)
//!
//! The real registry is a REST service; this generator fakes it with files.
//! Every JSON endpoint is written twice — `servers.json` and `servers` with
//! identical bytes — so clients that request the extensionless API path and
//! clients that request the `.json` artifact both get answers from dumb
//! static hosting, with no rewrite rules required. The fixed `v0` directory
//! is a byte-identical copy of the current version root for the same reason:
//! API consumers pin `/v0/`, humans browse the labeled version.
//!
//! ## Maud Over Template Engines
//!
//! The two HTML pages (root redirect, version landing page) are generated
//! with [Maud](https://maud.lambda.xyz/), a compile-time HTML macro system.
//! Malformed markup is a build error, interpolation is auto-escaped, and
//! there is no template directory to ship or get out of sync.
//!
//! ## Schemas Compiled Once, Passed Explicitly
//!
//! The two schema documents are embedded in the binary with `include_str!`
//! and compiled into a [`schema::SchemaSet`] at startup (`--schemas` swaps
//! in an override directory). The set is an explicit value handed to every
//! consumer — no global validator state, and tests can compile throwaway
//! schemas without touching process-wide anything.
//!
//! ## Tolerant Bulk Scan, Strict Single Checks
//!
//! Aggregation favors the catalog over any one entry: an unparsable or
//! schema-invalid server is logged and skipped, and the run continues with
//! whatever survives. The single-entry paths invert that: `new-server`
//! validates exactly what it just wrote and `check --server` validates one
//! named entry, and in both any failure is fatal — a scaffold that leaves
//! invalid manifests behind must not report success, and a contribution
//! gate that skips problems gates nothing.
//!
//! ## Deterministic Output
//!
//! Two runs over the same sources differ only in embedded timestamps.
//! Server names are emitted in sorted order, versions in descending
//! semantic-version order, JSON object keys alphabetically. Directory
//! listings are sorted before parallel reads so duplicate resolution does
//! not depend on thread scheduling. Deterministic bytes make the output
//! diffable, which is what turns a regenerated tree into a reviewable
//! commit instead of churn.

pub mod config;
pub mod generate;
pub mod naming;
pub mod output;
pub mod profiles;
pub mod scaffold;
pub mod scan;
pub mod schema;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
