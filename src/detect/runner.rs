//! Audit runner that orchestrates the walker, dialects and checks.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use globset::GlobSet;

use crate::aggregate::{AuditSummary, GroupedFinding, Grouper};
use crate::config::AuditConfig;
use crate::dialect::{Dialect, DialectOptions};
use crate::document::Document;
use crate::walker::{Diagnostic, LineIndex, WalkItem, Walker};

use super::{metadata, quality};

/// One audit run over one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Document name (file path, URL or "stdin").
    pub document: String,
    /// Declared OpenAPI/Swagger version, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_version: Option<String>,
    pub dialects: Vec<Dialect>,
    pub groups: Vec<GroupedFinding>,
    pub summary: AuditSummary,
    /// Nodes the walker could not follow.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<Diagnostic>,
}

impl AuditReport {
    pub fn has_errors(&self) -> bool {
        self.summary.with_error > 0
    }

    pub fn has_warnings(&self) -> bool {
        self.summary.warning_count() > 0
    }
}

/// Runs every enabled dialect and check against a document.
pub struct Runner<'c> {
    config: &'c AuditConfig,
    dialects: Vec<Dialect>,
    options: DialectOptions,
    exclusions: GlobSet,
}

impl<'c> Runner<'c> {
    /// Create a runner for a profile.
    pub fn new(config: &'c AuditConfig) -> Self {
        Self {
            config,
            dialects: config.active_dialects(),
            options: config.dialect_options(),
            exclusions: config.exclusion_set(),
        }
    }

    fn is_excluded(&self, location: &str) -> bool {
        self.exclusions.is_match(location)
    }

    /// Audit every pattern and API element in the document.
    pub fn run(&self, doc: &Document) -> AuditReport {
        let started = Instant::now();
        let checks = &self.config.checks;
        let lines = self
            .config
            .should_resolve_lines()
            .then(|| LineIndex::new(&doc.source));

        let mut grouper = Grouper::new();
        let mut skipped = Vec::new();
        let mut patterns = 0usize;

        let walker = Walker::new(doc)
            .max_depth(self.config.max_depth)
            .max_ref_expansions(self.config.max_ref_expansions);
        for item in walker.iter() {
            match item {
                WalkItem::Pattern(p) => {
                    if self.is_excluded(&p.location) {
                        debug!(location = %p.location, "location excluded");
                        continue;
                    }
                    patterns += 1;
                    let line = lines.as_ref().map(|idx| idx.find(&p.pattern)).unwrap_or(0);

                    grouper.open(&p.location, &p.pattern);
                    for dialect in &self.dialects {
                        let finding = dialect.validate_with(&p.location, &p.pattern, &self.options);
                        grouper.push(finding.at_line(line));
                    }
                    for finding in quality::check_pattern(&p.location, &p.pattern, checks) {
                        grouper.push(finding.at_line(line));
                    }
                }
                WalkItem::Operation(op) => {
                    if !self.is_excluded(&op.location) {
                        metadata::check_operation(&op, checks)
                            .into_iter()
                            .for_each(|f| grouper.push(f));
                    }
                }
                WalkItem::Schema(schema) => {
                    if !self.is_excluded(&schema.location) {
                        metadata::check_schema(&schema, checks)
                            .into_iter()
                            .for_each(|f| grouper.push(f));
                    }
                }
                WalkItem::Path(path) => {
                    if !self.is_excluded(&path.location) {
                        metadata::check_path(&path, checks)
                            .into_iter()
                            .for_each(|f| grouper.push(f));
                    }
                }
                WalkItem::Skipped(diag) => skipped.push(diag),
            }
        }

        let groups = grouper.finish();
        let summary = AuditSummary::from_groups(&groups);

        info!(
            document = %doc.name,
            patterns,
            locations = summary.total_locations,
            errors = summary.with_error,
            warnings = summary.warning_only,
            skipped = skipped.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "audit complete"
        );

        AuditReport {
            document: doc.name.clone(),
            spec_version: doc.spec_version().map(str::to_string),
            dialects: self.dialects.clone(),
            groups,
            summary,
            skipped,
        }
    }
}
