//! Audit profile definitions for oasregex.
//!
//! A profile selects which regex dialects are checked and which quality
//! and API-metadata checks run. Profiles are YAML files; every field is
//! optional.

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL_SECS};
use crate::dialect::{Dialect, DialectOptions, DEFAULT_ECMA_TIMEOUT_MS};
use crate::error::AuditError;
use crate::walker::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_REF_EXPANSIONS};

/// Default profile file names to search for.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["oasregex.yaml", ".oasregex.yaml", "regex-audit.yaml"];

/// Top-level audit profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Dialect names or aliases ("pcre", "java", "js", "go", ...)
    #[serde(default = "default_dialects")]
    pub dialects: Vec<String>,
    #[serde(default)]
    pub checks: Checks,
    /// Maximum schema nesting depth followed by the walker
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Total `$ref` resolutions allowed in one document walk
    #[serde(default = "default_max_ref_expansions")]
    pub max_ref_expansions: usize,
    /// Upper bound on one ECMAScript syntax check, in milliseconds
    #[serde(default = "default_ecma_timeout")]
    pub ecma_timeout_ms: u64,
    /// Glob patterns over locations to leave out (e.g. "#/components/schemas/Legacy*")
    #[serde(default)]
    pub excluded_locations: Vec<String>,
    /// Whether to look up source line numbers for findings (default: true)
    #[serde(default)]
    pub line_numbers: Option<bool>,
    /// Which findings make the audit fail
    #[serde(default)]
    pub fail_on: FailOn,
    #[serde(default)]
    pub cache: CacheConfig,
}

fn default_dialects() -> Vec<String> {
    vec![Dialect::Pcre.as_str().to_string()]
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_max_ref_expansions() -> usize {
    DEFAULT_MAX_REF_EXPANSIONS
}

fn default_ecma_timeout() -> u64 {
    DEFAULT_ECMA_TIMEOUT_MS
}

fn default_true() -> bool {
    true
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            version: String::new(),
            name: String::new(),
            description: None,
            dialects: default_dialects(),
            checks: Checks::default(),
            max_depth: default_max_depth(),
            max_ref_expansions: default_max_ref_expansions(),
            ecma_timeout_ms: default_ecma_timeout(),
            excluded_locations: Vec::new(),
            line_numbers: None,
            fail_on: FailOn::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl AuditConfig {
    /// Parse a profile from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, AuditError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse_str(&content)
    }

    /// Parse a profile from YAML text.
    pub fn parse_str(content: &str) -> Result<Self, AuditError> {
        serde_yaml::from_str(content).map_err(|e| AuditError::Config(e.to_string()))
    }

    /// Resolved dialects, deduplicated, in configured order.
    /// Unknown names are dropped; `validate` reports them.
    pub fn active_dialects(&self) -> Vec<Dialect> {
        let mut out = Vec::new();
        for name in &self.dialects {
            if let Some(d) = Dialect::parse(name) {
                if !out.contains(&d) {
                    out.push(d);
                }
            }
        }
        out
    }

    /// Options passed to each dialect check.
    pub fn dialect_options(&self) -> DialectOptions {
        DialectOptions {
            ecma_timeout: Duration::from_millis(self.ecma_timeout_ms),
        }
    }

    /// Returns whether to resolve line numbers (defaults to true).
    pub fn should_resolve_lines(&self) -> bool {
        self.line_numbers.unwrap_or(true)
    }

    /// Compile `excluded_locations` into one matcher. Invalid globs are
    /// dropped with a warning; `validate` rejects them up front.
    pub fn exclusion_set(&self) -> GlobSet {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.excluded_locations {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => warn!(pattern = %pattern, error = %e, "ignoring invalid exclusion glob"),
            }
        }
        builder.build().unwrap_or_else(|e| {
            warn!(error = %e, "exclusion globs unusable, nothing excluded");
            GlobSet::empty()
        })
    }
}

/// Quality, security and API-metadata checks. All off unless enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Checks {
    /// Flag `.*` and `.+`
    #[serde(default)]
    pub permissive: bool,
    /// Flag patterns not wrapped in `^...$`
    #[serde(default)]
    pub anchors: bool,
    /// Flag nested quantified groups such as `(a+)+`
    #[serde(default)]
    pub backtracking: bool,
    #[serde(default)]
    pub operation_id: bool,
    #[serde(default)]
    pub summary: bool,
    #[serde(default)]
    pub schema_description: bool,
    #[serde(default)]
    pub schema_example: bool,
    /// Flag path segments containing upper-case letters
    #[serde(default)]
    pub path_naming: bool,
}

impl Checks {
    /// Every check enabled.
    pub fn all() -> Self {
        Self {
            permissive: true,
            anchors: true,
            backtracking: true,
            operation_id: true,
            summary: true,
            schema_description: true,
            schema_example: true,
            path_naming: true,
        }
    }

    /// Names accepted by `enable`.
    pub const NAMES: &'static [&'static str] = &[
        "permissive",
        "anchors",
        "backtracking",
        "operation_id",
        "summary",
        "schema_description",
        "schema_example",
        "path_naming",
    ];

    /// Enable a check by name. Returns false for unknown names.
    pub fn enable(&mut self, name: &str) -> bool {
        let flag = match name.trim().to_lowercase().replace('-', "_").as_str() {
            "permissive" => &mut self.permissive,
            "anchors" => &mut self.anchors,
            "backtracking" | "redos" => &mut self.backtracking,
            "operation_id" => &mut self.operation_id,
            "summary" => &mut self.summary,
            "schema_description" => &mut self.schema_description,
            "schema_example" => &mut self.schema_example,
            "path_naming" | "naming" => &mut self.path_naming,
            _ => return false,
        };
        *flag = true;
        true
    }

    /// Whether any API-metadata check is enabled.
    pub fn any_metadata(&self) -> bool {
        self.operation_id
            || self.summary
            || self.schema_description
            || self.schema_example
            || self.path_naming
    }
}

/// Which findings make an audit fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailOn {
    #[default]
    Error,
    Warning,
    Never,
}

impl std::str::FromStr for FailOn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(FailOn::Error),
            "warning" => Ok(FailOn::Warning),
            "never" => Ok(FailOn::Never),
            _ => Err(format!(
                "invalid fail-on {:?}, must be 'error', 'warning' or 'never'",
                s
            )),
        }
    }
}

/// Configuration for the permalink cache.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Whether audits are stored for `oasregex show` (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds before a stored result expires (default: 3600)
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
    /// Maximum stored results; the oldest is evicted beyond this (default: 500)
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_ttl() -> u64 {
    DEFAULT_TTL_SECS
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: DEFAULT_TTL_SECS,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// Validate a profile for correctness.
pub fn validate(config: &AuditConfig) -> Result<(), AuditError> {
    let any_pattern_check =
        config.checks.permissive || config.checks.anchors || config.checks.backtracking;
    if config.dialects.is_empty() && !any_pattern_check && !config.checks.any_metadata() {
        return Err(AuditError::Config(
            "profile enables no dialects and no checks".to_string(),
        ));
    }

    for name in &config.dialects {
        name.parse::<Dialect>().map_err(AuditError::Config)?;
    }

    if config.max_depth == 0 {
        return Err(AuditError::Config("max_depth must be at least 1".to_string()));
    }

    if config.max_ref_expansions == 0 {
        return Err(AuditError::Config(
            "max_ref_expansions must be at least 1".to_string(),
        ));
    }

    if config.ecma_timeout_ms == 0 {
        return Err(AuditError::Config(
            "ecma_timeout_ms must be at least 1".to_string(),
        ));
    }

    for pattern in &config.excluded_locations {
        Glob::new(pattern).map_err(|e| {
            AuditError::Config(format!(
                "invalid excluded_locations pattern {:?}: {}",
                pattern, e
            ))
        })?;
    }

    if config.cache.max_entries == 0 {
        return Err(AuditError::Config(
            "cache.max_entries must be at least 1".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let yaml = r##"
version: "1"
name: "Strict"
dialects: [java, js, go]
checks:
  permissive: true
  anchors: true
  backtracking: true
excluded_locations:
  - "#/components/schemas/Legacy*"
fail_on: warning
"##;
        let config = AuditConfig::parse_str(yaml).unwrap();
        assert_eq!(config.name, "Strict");
        assert_eq!(
            config.active_dialects(),
            vec![Dialect::Pcre, Dialect::Ecma, Dialect::Re2]
        );
        assert!(config.checks.anchors);
        assert!(!config.checks.summary);
        assert_eq!(config.fail_on, FailOn::Warning);
        let excluded = config.exclusion_set();
        assert!(excluded.is_match("#/components/schemas/LegacyUser/properties/id"));
        assert!(!excluded.is_match("#/components/schemas/User"));
        validate(&config).unwrap();
    }

    #[test]
    fn test_defaults() {
        let config = AuditConfig::parse_str("name: empty").unwrap();
        assert_eq!(config.active_dialects(), vec![Dialect::Pcre]);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.max_ref_expansions, DEFAULT_MAX_REF_EXPANSIONS);
        assert_eq!(config.ecma_timeout_ms, DEFAULT_ECMA_TIMEOUT_MS);
        assert!(config.should_resolve_lines());
        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_entries, 500);
        assert_eq!(config.checks, Checks::default());
    }

    #[test]
    fn test_active_dialects_dedupes_aliases() {
        let config = AuditConfig {
            dialects: vec!["java".into(), "pcre".into(), "go".into()],
            ..Default::default()
        };
        assert_eq!(config.active_dialects(), vec![Dialect::Pcre, Dialect::Re2]);
    }

    #[test]
    fn test_validate_rejects_unknown_dialect() {
        let config = AuditConfig {
            dialects: vec!["cobol".into()],
            ..Default::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_glob() {
        let config = AuditConfig {
            excluded_locations: vec!["#/a/[".into()],
            ..Default::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_enable_check_by_name() {
        let mut checks = Checks::default();
        assert!(checks.enable("redos"));
        assert!(checks.enable("operation-id"));
        assert!(!checks.enable("spelling"));
        assert!(checks.backtracking);
        assert!(checks.operation_id);
    }
}
