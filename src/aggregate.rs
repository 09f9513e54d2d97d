//! Grouping and summary statistics for audit findings.
//!
//! Findings are grouped by `(location, pattern)` in first-seen order and the
//! summary is derived fresh from the groups.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::detect::{Finding, Severity};

/// All findings sharing one `(location, pattern)` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedFinding {
    pub location: String,
    pub pattern: String,
    /// Findings in generation order.
    pub findings: Vec<Finding>,
}

impl GroupedFinding {
    pub fn has_error(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn has_warning(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Warning)
    }

    /// No errors and no warnings.
    pub fn is_clean(&self) -> bool {
        !self.has_error() && !self.has_warning()
    }

    /// Smallest non-zero line among the findings, 0 if none is known.
    pub fn line_number(&self) -> usize {
        self.findings
            .iter()
            .map(|f| f.line_number)
            .filter(|n| *n > 0)
            .min()
            .unwrap_or(0)
    }
}

/// Incremental grouping by `(location, pattern)` in first-seen order.
#[derive(Debug, Default)]
pub struct Grouper {
    index: HashMap<(String, String), usize>,
    groups: Vec<GroupedFinding>,
}

impl Grouper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the group for a key without adding a finding, so an audited
    /// pattern is counted even when no check reports on it.
    pub fn open(&mut self, location: &str, pattern: &str) -> &mut GroupedFinding {
        let key = (location.to_string(), pattern.to_string());
        let i = match self.index.get(&key) {
            Some(&i) => i,
            None => {
                self.index.insert(key, self.groups.len());
                self.groups.push(GroupedFinding {
                    location: location.to_string(),
                    pattern: pattern.to_string(),
                    findings: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        &mut self.groups[i]
    }

    pub fn push(&mut self, finding: Finding) {
        self.open(&finding.location, &finding.pattern)
            .findings
            .push(finding);
    }

    pub fn finish(self) -> Vec<GroupedFinding> {
        self.groups
    }
}

/// Group findings by `(location, pattern)`, keeping first-seen order.
pub fn group(findings: Vec<Finding>) -> Vec<GroupedFinding> {
    let mut grouper = Grouper::new();
    for finding in findings {
        grouper.push(finding);
    }
    grouper.finish()
}

/// Summary statistics over grouped findings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total_locations: usize,
    pub clean: usize,
    pub with_error: usize,
    /// Groups with warnings but no errors.
    pub warning_only: usize,
    /// Dialect display name to ERROR finding count.
    pub errors_by_dialect: BTreeMap<String, usize>,
    /// Warning message to WARNING finding count.
    pub warnings_by_message: BTreeMap<String, usize>,
}

impl AuditSummary {
    pub fn from_groups(groups: &[GroupedFinding]) -> Self {
        let mut summary = AuditSummary {
            total_locations: groups.len(),
            ..Default::default()
        };

        for g in groups {
            if g.has_error() {
                summary.with_error += 1;
            } else if g.has_warning() {
                summary.warning_only += 1;
            } else {
                summary.clean += 1;
            }
        }

        for f in groups.iter().flat_map(|g| &g.findings) {
            match f.severity {
                Severity::Error => {
                    if let Some(dialect) = f.dialect() {
                        *summary
                            .errors_by_dialect
                            .entry(dialect.display_name().to_string())
                            .or_insert(0) += 1;
                    }
                }
                Severity::Warning => {
                    *summary
                        .warnings_by_message
                        .entry(f.message.clone())
                        .or_insert(0) += 1;
                }
                Severity::Valid => {}
            }
        }

        summary
    }

    /// Total ERROR findings across dialects.
    pub fn error_count(&self) -> usize {
        self.errors_by_dialect.values().sum()
    }

    /// Total WARNING findings.
    pub fn warning_count(&self) -> usize {
        self.warnings_by_message.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Rule;
    use crate::dialect::Dialect;

    fn sample() -> Vec<Finding> {
        vec![
            Finding::valid("#/b", "^b$", Dialect::Pcre),
            Finding::error("#/a", "[a", Dialect::Pcre, Rule::DialectSyntax, "bad", "fix", None),
            Finding::warning("#/b", "^b$", Rule::BacktrackingRisk, "risk", "advice", None),
            Finding::error("#/a", "[a", Dialect::Re2, Rule::DialectSyntax, "bad", "fix", None),
            Finding::warning("#/a", "[a", Rule::MissingAnchors, "missing anchors", "advice", None),
            Finding::valid("#/c", "^c$", Dialect::Pcre),
            Finding::warning("#/b", "^b$", Rule::MissingAnchors, "missing anchors", "advice", None),
        ]
    }

    #[test]
    fn test_group_first_seen_order() {
        let groups = group(sample());
        let keys: Vec<&str> = groups.iter().map(|g| g.location.as_str()).collect();
        assert_eq!(keys, vec!["#/b", "#/a", "#/c"]);
        assert_eq!(groups[0].findings.len(), 3);
        assert_eq!(groups[0].findings[1].rule, Rule::BacktrackingRisk);
    }

    #[test]
    fn test_grouping_law() {
        let input = sample();
        let groups = group(input.clone());

        let mut flattened: Vec<Finding> = groups.iter().flat_map(|g| g.findings.clone()).collect();
        let mut expected = input;
        let key = |f: &Finding| (f.location.clone(), f.pattern.clone(), f.message.clone(), f.source.name());
        flattened.sort_by_key(key);
        expected.sort_by_key(key);
        assert_eq!(flattened, expected);

        for g in &groups {
            assert!(g
                .findings
                .iter()
                .all(|f| f.location == g.location && f.pattern == g.pattern));
        }
    }

    #[test]
    fn test_summary() {
        let groups = group(sample());
        let summary = AuditSummary::from_groups(&groups);

        assert_eq!(summary.total_locations, 3);
        assert_eq!(summary.with_error, 1);
        assert_eq!(summary.warning_only, 1);
        assert_eq!(summary.clean, 1);
        assert_eq!(summary.errors_by_dialect.get("PCRE"), Some(&1));
        assert_eq!(summary.errors_by_dialect.get("RE2"), Some(&1));
        assert_eq!(summary.warnings_by_message.get("missing anchors"), Some(&2));
        assert_eq!(summary.error_count(), 2);
        assert_eq!(summary.warning_count(), 3);
    }

    #[test]
    fn test_summary_is_idempotent() {
        let groups = group(sample());
        assert_eq!(
            AuditSummary::from_groups(&groups),
            AuditSummary::from_groups(&groups)
        );
    }

    #[test]
    fn test_group_flags() {
        let groups = group(sample());
        assert!(groups[1].has_error() && groups[1].has_warning());
        assert!(!groups[0].has_error() && groups[0].has_warning());
        assert!(groups[2].is_clean());
    }

    #[test]
    fn test_opened_group_without_findings_is_clean() {
        let mut grouper = Grouper::new();
        grouper.open("#/a", "^a$");
        grouper.push(Finding::valid("#/b", "^b$", Dialect::Pcre));
        grouper.open("#/b", "^b$");
        let groups = grouper.finish();

        assert_eq!(groups.len(), 2);
        assert!(groups[0].findings.is_empty());
        assert_eq!(groups[1].findings.len(), 1);

        let summary = AuditSummary::from_groups(&groups);
        assert_eq!(summary.total_locations, 2);
        assert_eq!(summary.clean, 2);
    }
}
