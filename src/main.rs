use clap::{Parser, Subcommand};
use log::{info, warn};
use staticreg::config::{self, RegistryConfig, RunConfig};
use staticreg::profiles::HostingProfile;
use staticreg::scaffold::{self, ScaffoldOptions};
use staticreg::schema::{SchemaError, SchemaSet};
use staticreg::{generate, output, scan};
use std::path::PathBuf;

/// Flags shared by the commands that aggregate the catalog.
#[derive(clap::Args, Clone)]
struct CatalogArgs {
    /// Registry format version label — output lands under v<LABEL>
    #[arg(long, default_value = "0.1")]
    registry_version: String,

    /// JSON array of extra source roots, replacing the config file's list
    #[arg(long, value_name = "JSON")]
    external_repositories: Option<String>,
}

/// Flags for scaffolding a new server entry.
#[derive(clap::Args, Clone)]
struct NewServerArgs {
    /// Directory name for the entry under the source tree
    #[arg(long)]
    slug: String,

    /// Server name (reverse-DNS style, e.g. io.example/weather)
    #[arg(long)]
    name: Option<String>,

    /// Short description of what the server does
    #[arg(long)]
    description: Option<String>,

    /// Human-readable display title
    #[arg(long)]
    title: Option<String>,

    /// Documentation or homepage URL
    #[arg(long)]
    website_url: Option<String>,

    /// Source repository URL
    #[arg(long)]
    repo_url: Option<String>,

    /// Repository host identifier (e.g. github)
    #[arg(long)]
    repo_source: Option<String>,

    /// Path of the server inside a monorepo
    #[arg(long)]
    repo_subfolder: Option<String>,

    /// Initial version (semantic version string)
    #[arg(long)]
    version: Option<String>,

    /// Release date (YYYY-MM-DD; defaults to today)
    #[arg(long)]
    release_date: Option<String>,

    /// Package registry type (e.g. npm, pypi, oci)
    #[arg(long)]
    registry_type: Option<String>,

    /// Package identifier within that registry
    #[arg(long)]
    package_identifier: Option<String>,

    /// Package transport type (e.g. stdio, sse)
    #[arg(long)]
    transport_type: Option<String>,
}

#[derive(Parser)]
#[command(name = "staticreg")]
#[command(about = "Static registry generator for MCP server catalogs")]
#[command(long_about = "\
Static registry generator for MCP server catalogs

Your filesystem is the data source. Each subdirectory of the source tree
is one server entry, validated against JSON Schemas and projected into a
versioned, API-shaped static file tree.

Source structure:

  servers/
  ├── filesystem/                  # One directory per server
  │   ├── server.json              # Server metadata (schema-validated)
  │   └── versions/
  │       ├── 1.0.0.json           # One file per published version
  │       └── 1.1.0.json
  └── github/
      ├── server.json
      └── versions/
          └── 2.3.0.json

Output structure:

  dist/
  ├── index.html                   # Redirect to the versioned root
  ├── .nojekyll                    # Hosting profile files (per --profile)
  ├── v0.1/                        # Versioned registry root
  │   ├── servers.json             # Flat index of every server
  │   ├── health.json              # Static endpoints (+ extensionless twins)
  │   └── servers/<name>/          # Per-server detail and version documents
  └── v0/                          # Byte-identical API compatibility alias

Every JSON endpoint is written twice, once with the .json extension and
once without, so both URL styles serve identical bytes from static
hosting. Run 'staticreg check' to validate sources without writing.")]
#[command(version)]
struct Cli {
    /// Source directory of server entries
    #[arg(long, default_value = "servers", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Base directory for resolving relative paths
    #[arg(long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Registry config file (JSON; may list external repositories)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory overriding the embedded JSON Schemas
    #[arg(long, global = true)]
    schemas: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: aggregate sources → emit the registry tree
    Build {
        #[command(flatten)]
        catalog: CatalogArgs,

        /// Hosting platform to generate profile files for
        #[arg(long, default_value = "github")]
        profile: HostingProfile,
    },
    /// Validate every source entry without writing anything
    Check {
        #[command(flatten)]
        catalog: CatalogArgs,

        /// Validate a single entry strictly by its directory name
        #[arg(long, value_name = "SLUG")]
        server: Option<String>,
    },
    /// Scaffold a new server entry in the source tree
    NewServer(NewServerArgs),
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cli.log_level.as_str()),
    )
    .init();

    match &cli.command {
        Command::Build { catalog, profile } => run_build(&cli, catalog, *profile),
        Command::Check { catalog, server } => run_check(&cli, catalog, server.as_deref()),
        Command::NewServer(args) => run_new_server(&cli, args),
    }
}

fn run_build(
    cli: &Cli,
    catalog: &CatalogArgs,
    profile: HostingProfile,
) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = resolve_run_config(cli, catalog, profile, false)?;
    let schemas = load_schemas(cli)?;

    println!("==> Stage 1: Scanning {}", cfg.source_dir.display());
    let roots = scan::resolve_source_roots(
        &cfg.source_dir,
        &cfg.workspace_root,
        &cfg.external_repositories,
    );
    let snapshot = scan::aggregate(&roots, &schemas)?;
    if snapshot.is_empty() {
        return Err(scan::ScanError::NoValidServers.into());
    }

    println!(
        "==> Stage 2: Generating registry → {}",
        cfg.registry_output_dir().display()
    );
    warn_if_version_shaped_output(&cfg);
    generate::generate(&cfg.output_dir, &cfg.registry_version, cfg.profile, &snapshot)?;
    generate::create_version_alias(&cfg.output_dir, &cfg.registry_version)?;

    output::print_build_summary(&snapshot, &cfg.registry_output_dir(), &cfg.output_dir.join("v0"));
    Ok(())
}

fn run_check(
    cli: &Cli,
    catalog: &CatalogArgs,
    server: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let schemas = load_schemas(cli)?;

    // Strict single-entry mode: structural problems are errors here, not
    // the skips the bulk scan would log.
    if let Some(slug) = server {
        let source_dir = cli.workspace.join(&cli.source);
        println!("==> Checking {} in {}", slug, source_dir.display());
        let valid_versions = scaffold::validate_server_dir(&source_dir, slug, &schemas)?;
        output::print_server_check_summary(slug, valid_versions);
        return Ok(());
    }

    let cfg = resolve_run_config(cli, catalog, HostingProfile::None, true)?;

    println!("==> Checking {}", cfg.source_dir.display());
    let roots = scan::resolve_source_roots(
        &cfg.source_dir,
        &cfg.workspace_root,
        &cfg.external_repositories,
    );
    let snapshot = scan::aggregate(&roots, &schemas)?;

    output::print_check_summary(&snapshot);
    Ok(())
}

fn run_new_server(cli: &Cli, args: &NewServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let source_dir = cli.workspace.join(&cli.source);
    let schemas = load_schemas(cli)?;

    let opts = ScaffoldOptions {
        slug: args.slug.clone(),
        name: args.name.clone(),
        description: args.description.clone(),
        title: args.title.clone(),
        website_url: args.website_url.clone(),
        repository_url: args.repo_url.clone(),
        repository_source: args.repo_source.clone(),
        repository_subfolder: args.repo_subfolder.clone(),
        version: args.version.clone(),
        release_date: args.release_date.clone(),
        package_registry_type: args.registry_type.clone(),
        package_identifier: args.package_identifier.clone(),
        package_transport_type: args.transport_type.clone(),
    };

    let outcome = scaffold::scaffold(&source_dir, &opts, &schemas)?;
    output::print_scaffold_summary(&outcome);
    Ok(())
}

/// Fold the CLI flags and the optional config file into one [`RunConfig`].
///
/// An explicit `--external-repositories` list replaces the config file's
/// list entirely; relative paths resolve against `--workspace`.
fn resolve_run_config(
    cli: &Cli,
    catalog: &CatalogArgs,
    profile: HostingProfile,
    validate_only: bool,
) -> Result<RunConfig, Box<dyn std::error::Error>> {
    let workspace_root = cli.workspace.clone();
    let config_path = cli.config.as_ref().map(|p| workspace_root.join(p));
    let file_config = RegistryConfig::load(config_path.as_deref())?;

    let external_repositories = match catalog.external_repositories.as_deref() {
        Some(raw) => config::parse_external_repositories(raw)?,
        None => file_config.external_repositories,
    };

    Ok(RunConfig {
        source_dir: workspace_root.join(&cli.source),
        output_dir: workspace_root.join(&cli.output),
        workspace_root,
        registry_version: catalog.registry_version.clone(),
        profile,
        validate_only,
        external_repositories,
    })
}

/// Load the JSON Schema pair, compiled once per run.
fn load_schemas(cli: &Cli) -> Result<SchemaSet, SchemaError> {
    match &cli.schemas {
        Some(dir) => {
            let dir = cli.workspace.join(dir);
            info!("Using schema overrides from {}", dir.display());
            SchemaSet::from_dir(&dir)
        }
        None => SchemaSet::embedded(),
    }
}

/// `--output dist/v0.1` would bury the profile files and the root redirect
/// inside the version directory.
fn warn_if_version_shaped_output(cfg: &RunConfig) {
    if cfg.output_dir.ends_with(format!("v{}", cfg.registry_version)) {
        warn!(
            "Output path appears to be a version directory ({}). Use an output base path (for example ./dist) so profile files and root index are generated correctly.",
            cfg.output_dir.display()
        );
    }
}
