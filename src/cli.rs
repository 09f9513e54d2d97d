//! Command-line interface for oasregex.

use anyhow::Context;
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::ResultsCache;
use crate::config::{self, AuditConfig, Checks, FailOn, DEFAULT_CONFIG_NAMES};
use crate::detect::{AuditReport, Runner};
use crate::error::AuditError;
use crate::report::{self, Rendered};
use crate::source::{collect_sources, Source, DEFAULT_FETCH_TIMEOUT_SECS};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// OpenAPI regex auditor.
///
/// Checks every `pattern` in an OpenAPI or Swagger document against the
/// PCRE, ECMAScript and RE2 regex dialects, and flags patterns that are too
/// permissive, unanchored or prone to catastrophic backtracking.
#[derive(Parser)]
#[command(name = "oasregex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Audit the regex patterns in one or more API documents
    #[command(visible_alias = "check")]
    Audit(AuditArgs),
    /// Show a previously stored audit result
    Show(ShowArgs),
    /// Create a new audit profile from a template
    Init(InitArgs),
}

/// Arguments for the audit command.
#[derive(Parser)]
pub struct AuditArgs {
    /// Documents to audit: files, directories, URLs, or "-" for stdin
    #[arg(required = true)]
    pub sources: Vec<String>,

    /// Path to profile YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty, json, or sarif
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Dialects to check (pcre, ecma, re2; aliases java, js, go). Replaces the profile's list
    #[arg(short, long = "dialect", value_delimiter = ',')]
    pub dialects: Vec<String>,

    /// Checks to enable in addition to the profile's
    #[arg(long = "check", value_delimiter = ',')]
    pub checks: Vec<String>,

    /// Enable every quality and metadata check
    #[arg(long)]
    pub all_checks: bool,

    /// Fail on: error (default), warning, or never
    #[arg(long)]
    pub fail_on: Option<String>,

    /// Maximum schema nesting depth
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Timeout for one ECMAScript check, in milliseconds
    #[arg(long)]
    pub ecma_timeout_ms: Option<u64>,

    /// Timeout for fetching URL sources, in seconds
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    pub fetch_timeout: u64,

    /// Do not look up source line numbers
    #[arg(long)]
    pub no_line_numbers: bool,

    /// Do not store results for `oasregex show`
    #[arg(long)]
    pub no_cache: bool,

    /// Also list locations without findings
    #[arg(long)]
    pub show_valid: bool,
}

/// Arguments for the show command.
#[derive(Parser)]
pub struct ShowArgs {
    /// Result id printed by a previous audit
    pub id: String,

    /// Path to profile YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty, json, or sarif
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Also list locations without findings
    #[arg(long)]
    pub show_valid: bool,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "oasregex.yaml")]
    pub output: PathBuf,

    /// Template to use
    #[arg(short, long, default_value = "default")]
    pub template: String,

    /// List available templates
    #[arg(short, long)]
    pub list: bool,
}

/// Available profile templates.
struct Template {
    name: &'static str,
    description: &'static str,
    content: &'static str,
}

/// All available templates.
static TEMPLATES: &[Template] = &[
    Template {
        name: "default",
        description: "PCRE syntax plus anchoring and permissiveness checks",
        content: include_str!("templates/default.yaml"),
    },
    Template {
        name: "polyglot",
        description: "Patterns must compile under PCRE, ECMAScript and RE2",
        content: include_str!("templates/polyglot.yaml"),
    },
    Template {
        name: "strict",
        description: "Every dialect and every check; warnings fail the audit",
        content: include_str!("templates/strict.yaml"),
    },
    Template {
        name: "api-hygiene",
        description: "Operation, schema and path metadata checks only",
        content: include_str!("templates/api-hygiene.yaml"),
    },
];

const FORMATS: &[&str] = &["pretty", "json", "sarif"];

/// Discover a profile file in the current directory.
fn discover_config() -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Load the profile named with `--config`, a discovered one, or the defaults.
fn load_config(path: Option<&Path>) -> anyhow::Result<AuditConfig> {
    let path = path.map(Path::to_path_buf).or_else(discover_config);
    match path {
        Some(p) => {
            debug!(config = %p.display(), "loading profile");
            AuditConfig::parse_file(&p).with_context(|| format!("reading profile {}", p.display()))
        }
        None => Ok(AuditConfig::default()),
    }
}

/// Apply command-line overrides on top of the profile.
fn apply_overrides(config: &mut AuditConfig, args: &AuditArgs) -> anyhow::Result<()> {
    if !args.dialects.is_empty() {
        config.dialects = args.dialects.clone();
    }
    if args.all_checks {
        config.checks = Checks::all();
    }
    for name in &args.checks {
        if !config.checks.enable(name) {
            anyhow::bail!(
                "unknown check {:?}, must be one of: {}",
                name,
                Checks::NAMES.join(", ")
            );
        }
    }
    if let Some(fail_on) = &args.fail_on {
        config.fail_on = fail_on.parse::<FailOn>().map_err(anyhow::Error::msg)?;
    }
    if let Some(depth) = args.max_depth {
        config.max_depth = depth;
    }
    if let Some(ms) = args.ecma_timeout_ms {
        config.ecma_timeout_ms = ms;
    }
    if args.no_line_numbers {
        config.line_numbers = Some(false);
    }
    if args.no_cache {
        config.cache.enabled = false;
    }
    Ok(())
}

/// Whether a set of reports passes under the fail-on policy.
pub fn passes(reports: &[AuditReport], fail_on: FailOn) -> bool {
    match fail_on {
        FailOn::Never => true,
        FailOn::Error => !reports.iter().any(AuditReport::has_errors),
        FailOn::Warning => !reports
            .iter()
            .any(|r| r.has_errors() || r.has_warnings()),
    }
}

fn check_format(format: &str) -> bool {
    if FORMATS.contains(&format) {
        return true;
    }
    eprintln!(
        "Error: invalid format {:?}, must be 'pretty', 'json', or 'sarif'",
        format
    );
    false
}

/// Run the audit command.
pub fn run_audit(args: &AuditArgs) -> anyhow::Result<i32> {
    if !check_format(&args.format) {
        return Ok(EXIT_ERROR);
    }

    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, args)?;
    if let Err(e) = config::validate(&config) {
        eprintln!("Error: {}", e);
        return Ok(EXIT_ERROR);
    }

    let sources = collect_sources(&args.sources)?;
    if sources.is_empty() {
        eprintln!("Warning: no documents to audit");
        return Ok(EXIT_SUCCESS);
    }

    // Audit each source independently
    let fetch_timeout = Duration::from_secs(args.fetch_timeout);
    let runner = Runner::new(&config);
    let outcomes: Vec<(Source, Result<AuditReport, AuditError>)> = sources
        .into_par_iter()
        .map(|source| {
            let outcome = source.load(fetch_timeout).map(|doc| runner.run(&doc));
            (source, outcome)
        })
        .collect();

    let mut reports = Vec::new();
    let mut failed_sources = 0;
    for (source, outcome) in outcomes {
        match outcome {
            Ok(report) => reports.push(report),
            Err(AuditError::NotOpenApi(reason)) if source.is_discovered() => {
                debug!(source = %source.name(), %reason, "skipping non-OpenAPI file");
            }
            Err(e) => {
                eprintln!("Error: {}: {}", source.name(), e);
                failed_sources += 1;
            }
        }
    }

    let ids = store_results(&config, &reports);
    let passed = passes(&reports, config.fail_on);
    render(&args.format, &reports, &ids, passed, args.show_valid)?;

    if failed_sources > 0 {
        Ok(EXIT_ERROR)
    } else if passed {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Store each report in the permalink cache. A cache failure only costs the id.
fn store_results(config: &AuditConfig, reports: &[AuditReport]) -> Vec<Option<String>> {
    if !config.cache.enabled {
        return vec![None; reports.len()];
    }

    let cache = ResultsCache::new(config.cache.ttl_secs, config.cache.max_entries);
    reports
        .iter()
        .map(|report| match cache.insert(report) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(document = %report.document, error = %e, "could not store result");
                None
            }
        })
        .collect()
}

fn render(
    format: &str,
    reports: &[AuditReport],
    ids: &[Option<String>],
    passed: bool,
    show_valid: bool,
) -> anyhow::Result<()> {
    let rendered: Vec<Rendered<'_>> = reports
        .iter()
        .zip(ids)
        .map(|(report, id)| Rendered {
            report,
            id: id.as_deref(),
        })
        .collect();

    match format {
        "json" => report::write_json(&rendered, passed)?,
        "sarif" => {
            let all: Vec<&AuditReport> = reports.iter().collect();
            report::write_sarif(&all)?;
        }
        _ => report::write_pretty(&rendered, passed, show_valid),
    }
    Ok(())
}

/// Run the show command.
pub fn run_show(args: &ShowArgs) -> anyhow::Result<i32> {
    if !check_format(&args.format) {
        return Ok(EXIT_ERROR);
    }

    let config = load_config(args.config.as_deref())?;
    let cache = ResultsCache::new(config.cache.ttl_secs, config.cache.max_entries);

    let report = match cache.get(&args.id) {
        Some(r) => r,
        None => {
            eprintln!("Error: no stored result {:?} (unknown or expired)", args.id);
            return Ok(EXIT_ERROR);
        }
    };

    let reports = vec![report];
    let passed = passes(&reports, config.fail_on);
    render(
        &args.format,
        &reports,
        &[Some(args.id.clone())],
        passed,
        args.show_valid,
    )?;

    if passed {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    // List mode
    if args.list {
        return list_templates();
    }

    // Find template
    let template = match TEMPLATES.iter().find(|t| t.name == args.template) {
        Some(t) => t,
        None => {
            eprintln!("Error: unknown template {:?}", args.template);
            eprintln!("Run 'oasregex init --list' to see available templates");
            return Ok(EXIT_ERROR);
        }
    };

    // Check if output already exists
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    // Create output directory if needed
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
    }

    std::fs::write(&args.output, template.content)
        .with_context(|| format!("writing profile {}", args.output.display()))?;

    println!("Created {} from template '{}'", args.output.display(), template.name);
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to choose dialects and checks", args.output.display());
    println!("  2. Run: oasregex audit openapi.yaml --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}

/// List available templates.
fn list_templates() -> anyhow::Result<i32> {
    println!("Available templates:");
    println!();

    for template in TEMPLATES {
        let name = if template.name == "default" {
            format!("{} (default)", template.name)
        } else {
            template.name.to_string()
        };
        println!("  {:<20} {}", name, template.description);
    }

    println!();
    println!("Usage:");
    println!("  oasregex init --template <name>");

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    fn args(extra: &[&str]) -> AuditArgs {
        let mut argv = vec!["oasregex", "audit", "api.yaml"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Audit(a) => a,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_templates_parse_and_validate() {
        for template in TEMPLATES {
            let config = AuditConfig::parse_str(template.content)
                .unwrap_or_else(|e| panic!("{}: {}", template.name, e));
            config::validate(&config).unwrap_or_else(|e| panic!("{}: {}", template.name, e));
        }
    }

    #[test]
    fn test_overrides() {
        let a = args(&["-d", "js,go", "--check", "anchors", "--fail-on", "warning"]);
        let mut config = AuditConfig::default();
        apply_overrides(&mut config, &a).unwrap();

        assert_eq!(config.active_dialects(), vec![Dialect::Ecma, Dialect::Re2]);
        assert!(config.checks.anchors);
        assert!(!config.checks.permissive);
        assert_eq!(config.fail_on, FailOn::Warning);
    }

    #[test]
    fn test_unknown_check_is_rejected() {
        let a = args(&["--check", "spelling"]);
        let mut config = AuditConfig::default();
        assert!(apply_overrides(&mut config, &a).is_err());
    }

    #[test]
    fn test_all_checks_and_no_cache() {
        let a = args(&["--all-checks", "--no-cache", "--no-line-numbers"]);
        let mut config = AuditConfig::default();
        apply_overrides(&mut config, &a).unwrap();
        assert_eq!(config.checks, Checks::all());
        assert!(!config.cache.enabled);
        assert!(!config.should_resolve_lines());
    }

    #[test]
    fn test_passes_policy() {
        assert!(passes(&[], FailOn::Error));
        assert!(passes(&[], FailOn::Warning));
    }
}
