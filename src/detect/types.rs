//! Core types for audit findings.

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;

/// Placeholder used in the `pattern` field of findings not tied to a regex.
pub const NOT_APPLICABLE: &str = "N/A";

/// Severity levels for findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Valid,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Valid => write!(f, "valid"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "valid" => Ok(Severity::Valid),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// Rule identifiers for the different kinds of finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rule {
    #[serde(rename = "dialect_syntax")]
    DialectSyntax,
    #[serde(rename = "dialect_fault")]
    DialectFault,
    #[serde(rename = "overly_permissive")]
    OverlyPermissive,
    #[serde(rename = "missing_anchors")]
    MissingAnchors,
    #[serde(rename = "backtracking_risk")]
    BacktrackingRisk,
    // API metadata rules
    #[serde(rename = "missing_operation_id")]
    MissingOperationId,
    #[serde(rename = "missing_summary")]
    MissingSummary,
    #[serde(rename = "missing_schema_description")]
    MissingSchemaDescription,
    #[serde(rename = "missing_schema_example")]
    MissingSchemaExample,
    #[serde(rename = "path_naming")]
    PathNaming,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::DialectSyntax => "dialect_syntax",
            Rule::DialectFault => "dialect_fault",
            Rule::OverlyPermissive => "overly_permissive",
            Rule::MissingAnchors => "missing_anchors",
            Rule::BacktrackingRisk => "backtracking_risk",
            Rule::MissingOperationId => "missing_operation_id",
            Rule::MissingSummary => "missing_summary",
            Rule::MissingSchemaDescription => "missing_schema_description",
            Rule::MissingSchemaExample => "missing_schema_example",
            Rule::PathNaming => "path_naming",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dialect_syntax" => Some(Rule::DialectSyntax),
            "dialect_fault" => Some(Rule::DialectFault),
            "overly_permissive" => Some(Rule::OverlyPermissive),
            "missing_anchors" => Some(Rule::MissingAnchors),
            "backtracking_risk" => Some(Rule::BacktrackingRisk),
            "missing_operation_id" => Some(Rule::MissingOperationId),
            "missing_summary" => Some(Rule::MissingSummary),
            "missing_schema_description" => Some(Rule::MissingSchemaDescription),
            "missing_schema_example" => Some(Rule::MissingSchemaExample),
            "path_naming" => Some(Rule::PathNaming),
            _ => None,
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What produced a finding: one regex dialect or the quality checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FindingSource {
    Dialect(Dialect),
    Quality,
}

const QUALITY_SOURCE_NAME: &str = "Quality Check";

impl FindingSource {
    pub fn name(&self) -> &'static str {
        match self {
            FindingSource::Dialect(d) => d.display_name(),
            FindingSource::Quality => QUALITY_SOURCE_NAME,
        }
    }
}

impl std::fmt::Display for FindingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl From<FindingSource> for String {
    fn from(source: FindingSource) -> Self {
        source.name().to_string()
    }
}

impl TryFrom<String> for FindingSource {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s == QUALITY_SOURCE_NAME {
            return Ok(FindingSource::Quality);
        }
        Dialect::ALL
            .iter()
            .find(|d| d.display_name() == s)
            .map(|d| FindingSource::Dialect(*d))
            .ok_or_else(|| format!("unknown finding source: {}", s))
    }
}

/// One audit outcome for one location under one dialect or heuristic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub location: String,
    /// 1-based line in the source text, 0 when unknown.
    pub line_number: usize,
    pub pattern: String,
    pub source: FindingSource,
    pub rule: Rule,
    pub severity: Severity,
    pub is_syntactically_valid: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

impl Finding {
    /// A pattern the dialect accepted.
    pub fn valid(location: &str, pattern: &str, dialect: Dialect) -> Self {
        Self {
            location: location.to_string(),
            line_number: 0,
            pattern: pattern.to_string(),
            source: FindingSource::Dialect(dialect),
            rule: Rule::DialectSyntax,
            severity: Severity::Valid,
            is_syntactically_valid: true,
            message: format!("pattern accepted by {}", dialect.display_name()),
            suggestion: None,
            suggested_fix: None,
        }
    }

    /// A pattern the dialect rejected, or a fault while checking it.
    pub fn error(
        location: &str,
        pattern: &str,
        dialect: Dialect,
        rule: Rule,
        message: impl Into<String>,
        suggestion: impl Into<String>,
        suggested_fix: Option<String>,
    ) -> Self {
        Self {
            location: location.to_string(),
            line_number: 0,
            pattern: pattern.to_string(),
            source: FindingSource::Dialect(dialect),
            rule,
            severity: Severity::Error,
            is_syntactically_valid: false,
            message: message.into(),
            suggestion: Some(suggestion.into()),
            suggested_fix,
        }
    }

    /// A quality or metadata warning.
    pub fn warning(
        location: &str,
        pattern: &str,
        rule: Rule,
        message: impl Into<String>,
        suggestion: impl Into<String>,
        suggested_fix: Option<String>,
    ) -> Self {
        Self {
            location: location.to_string(),
            line_number: 0,
            pattern: pattern.to_string(),
            source: FindingSource::Quality,
            rule,
            severity: Severity::Warning,
            is_syntactically_valid: true,
            message: message.into(),
            suggestion: Some(suggestion.into()),
            suggested_fix,
        }
    }

    /// Attach a resolved source line.
    pub fn at_line(mut self, line_number: usize) -> Self {
        self.line_number = line_number;
        self
    }

    /// The dialect that produced this finding, if any.
    pub fn dialect(&self) -> Option<Dialect> {
        match self.source {
            FindingSource::Dialect(d) => Some(d),
            FindingSource::Quality => None,
        }
    }
}

/// A regex pattern found during the document walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedPattern {
    pub location: String,
    pub pattern: String,
}

impl LocatedPattern {
    pub fn new(location: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            pattern: pattern.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_finding_has_no_advice() {
        let f = Finding::valid("#/a", "^a$", Dialect::Pcre);
        assert_eq!(f.severity, Severity::Valid);
        assert!(f.is_syntactically_valid);
        assert!(f.suggestion.is_none());
        assert!(f.suggested_fix.is_none());
        assert_eq!(f.message, "pattern accepted by PCRE");
    }

    #[test]
    fn test_error_finding_is_invalid() {
        let f = Finding::error(
            "#/a",
            "[a",
            Dialect::Re2,
            Rule::DialectSyntax,
            "bad",
            "fix it",
            None,
        );
        assert_eq!(f.severity, Severity::Error);
        assert!(!f.is_syntactically_valid);
    }

    #[test]
    fn test_source_serializes_as_display_name() {
        let f = Finding::valid("#/a", "^a$", Dialect::Ecma);
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["source"], "ECMAScript");

        let back: Finding = serde_json::from_value(json).unwrap();
        assert_eq!(back.source, FindingSource::Dialect(Dialect::Ecma));
    }

    #[test]
    fn test_rule_parse() {
        assert_eq!(Rule::parse("missing_anchors"), Some(Rule::MissingAnchors));
        assert_eq!(Rule::parse("nope"), None);
    }
}
