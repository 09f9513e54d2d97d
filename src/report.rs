//! Output formatting for oasregex results.
//!
//! Supports three output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption
//! - SARIF: Static Analysis Results Interchange Format for IDE/CI integration

use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::aggregate::{AuditSummary, GroupedFinding};
use crate::detect::{AuditReport, Finding, Rule, Severity};
use crate::walker::Diagnostic;

/// A finished audit and the permalink id it was stored under, if any.
pub struct Rendered<'a> {
    pub report: &'a AuditReport,
    pub id: Option<&'a str>,
}

// =============================================================================
// JSON Format
// =============================================================================

/// Top-level JSON report.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub passed: bool,
    pub documents: Vec<JsonDocument>,
}

/// One audited document.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonDocument {
    pub document: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_version: Option<String>,
    pub dialects: Vec<String>,
    pub summary: AuditSummary,
    pub results: Vec<JsonGroup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<Diagnostic>,
}

/// One `(location, pattern)` group.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonGroup {
    pub location: String,
    pub pattern: String,
    pub line: usize,
    /// "error", "warning" or "valid"
    pub status: String,
    pub findings: Vec<Finding>,
}

impl JsonReport {
    pub fn build(rendered: &[Rendered<'_>], passed: bool) -> Self {
        let documents = rendered
            .iter()
            .map(|r| JsonDocument {
                document: r.report.document.clone(),
                id: r.id.map(str::to_string),
                spec_version: r.report.spec_version.clone(),
                dialects: r
                    .report
                    .dialects
                    .iter()
                    .map(|d| d.display_name().to_string())
                    .collect(),
                summary: r.report.summary.clone(),
                results: r.report.groups.iter().map(group_to_json).collect(),
                skipped: r.report.skipped.clone(),
            })
            .collect();

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            passed,
            documents,
        }
    }
}

fn group_to_json(g: &GroupedFinding) -> JsonGroup {
    JsonGroup {
        location: g.location.clone(),
        pattern: g.pattern.clone(),
        line: g.line_number(),
        status: group_status(g).to_string(),
        findings: g.findings.clone(),
    }
}

fn group_status(g: &GroupedFinding) -> Severity {
    if g.has_error() {
        Severity::Error
    } else if g.has_warning() {
        Severity::Warning
    } else {
        Severity::Valid
    }
}

/// Write results in JSON format.
pub fn write_json(rendered: &[Rendered<'_>], passed: bool) -> anyhow::Result<()> {
    let report = JsonReport::build(rendered, passed);
    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// SARIF Format
// =============================================================================

const SARIF_VERSION: &str = "2.1.0";
const SARIF_SCHEMA: &str = "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";
const TOOL_NAME: &str = "oasregex";
const INFO_URI: &str = "https://github.com/oasregex/oasregex";

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifReport {
    pub version: String,
    #[serde(rename = "$schema")]
    pub schema: String,
    pub runs: Vec<SarifRun>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifRun {
    pub tool: SarifTool,
    pub results: Vec<SarifResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifTool {
    pub driver: SarifDriver,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifDriver {
    pub name: String,
    pub version: String,
    #[serde(rename = "informationUri")]
    pub information_uri: String,
    pub rules: Vec<SarifRule>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifRule {
    pub id: String,
    pub name: String,
    #[serde(rename = "shortDescription")]
    pub short_description: SarifMessage,
    #[serde(rename = "fullDescription", skip_serializing_if = "Option::is_none")]
    pub full_description: Option<SarifMessage>,
    #[serde(rename = "defaultConfiguration")]
    pub default_config: SarifRuleConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifRuleConfig {
    pub level: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifResult {
    #[serde(rename = "ruleId")]
    pub rule_id: String,
    pub level: String,
    pub message: SarifMessage,
    pub locations: Vec<SarifLocation>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifMessage {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    pub physical_location: SarifPhysicalLocation,
    #[serde(rename = "logicalLocations")]
    pub logical_locations: Vec<SarifLogicalLocation>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    pub artifact_location: SarifArtifact,
    pub region: SarifRegion,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifArtifact {
    pub uri: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifRegion {
    #[serde(rename = "startLine")]
    pub start_line: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifLogicalLocation {
    /// JSON pointer of the audited node
    #[serde(rename = "fullyQualifiedName")]
    pub fully_qualified_name: String,
}

/// Rule metadata for SARIF output.
struct RuleInfo {
    name: &'static str,
    short_description: &'static str,
    full_description: &'static str,
    default_level: &'static str,
}

fn get_rule_info(rule: Rule) -> RuleInfo {
    match rule {
        Rule::DialectSyntax => RuleInfo {
            name: "DialectSyntax",
            short_description: "Pattern does not compile under a target regex dialect",
            full_description: "The pattern is rejected by the parser of one of the selected regex dialects (PCRE, ECMAScript or RE2), so validators built on that engine will fail on it.",
            default_level: "error",
        },
        Rule::DialectFault => RuleInfo {
            name: "DialectFault",
            short_description: "A dialect check could not complete",
            full_description: "The syntax check for this dialect timed out or failed internally. The pattern was not verified for that dialect.",
            default_level: "error",
        },
        Rule::OverlyPermissive => RuleInfo {
            name: "OverlyPermissive",
            short_description: "Pattern accepts any input",
            full_description: "Patterns such as '.*' and '.+' constrain nothing and usually indicate a placeholder.",
            default_level: "warning",
        },
        Rule::MissingAnchors => RuleInfo {
            name: "MissingAnchors",
            short_description: "Pattern is not anchored with ^ and $",
            full_description: "JSON Schema patterns match anywhere in the value unless anchored, so an unanchored pattern may accept invalid strings that merely contain a valid substring.",
            default_level: "warning",
        },
        Rule::BacktrackingRisk => RuleInfo {
            name: "BacktrackingRisk",
            short_description: "Nested quantifiers may cause catastrophic backtracking",
            full_description: "A repeated group that itself contains a quantifier, such as (a+)+, can take exponential time on backtracking engines for some inputs.",
            default_level: "warning",
        },
        Rule::MissingOperationId => RuleInfo {
            name: "MissingOperationId",
            short_description: "Operation has no operationId",
            full_description: "Operations without an operationId get unstable generated names in client SDKs and tooling.",
            default_level: "warning",
        },
        Rule::MissingSummary => RuleInfo {
            name: "MissingSummary",
            short_description: "Operation has no summary",
            full_description: "A summary gives readers a one-line overview of what the operation does.",
            default_level: "warning",
        },
        Rule::MissingSchemaDescription => RuleInfo {
            name: "MissingSchemaDescription",
            short_description: "Component schema has no description",
            full_description: "A description clarifies the purpose and structure of a shared schema.",
            default_level: "warning",
        },
        Rule::MissingSchemaExample => RuleInfo {
            name: "MissingSchemaExample",
            short_description: "Component schema has no example",
            full_description: "An example value shows developers the expected data format.",
            default_level: "warning",
        },
        Rule::PathNaming => RuleInfo {
            name: "PathNaming",
            short_description: "Path template uses upper-case letters",
            full_description: "Path segments should use kebab-case or snake_case rather than camelCase.",
            default_level: "warning",
        },
    }
}

fn map_severity_to_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Valid => "none",
    }
}

impl SarifReport {
    /// Build a SARIF log from the error and warning findings.
    pub fn build(reports: &[&AuditReport]) -> Self {
        let issues: Vec<(&AuditReport, &Finding)> = reports
            .iter()
            .flat_map(|r| {
                r.groups
                    .iter()
                    .flat_map(|g| &g.findings)
                    .filter(|f| f.severity != Severity::Valid)
                    .map(move |f| (*r, f))
            })
            .collect();

        let rule_set: BTreeSet<&'static str> = issues.iter().map(|(_, f)| f.rule.as_str()).collect();
        let rules: Vec<SarifRule> = rule_set
            .into_iter()
            .filter_map(Rule::parse)
            .map(|rule| {
                let info = get_rule_info(rule);
                SarifRule {
                    id: rule.as_str().to_string(),
                    name: info.name.to_string(),
                    short_description: SarifMessage {
                        text: info.short_description.to_string(),
                    },
                    full_description: Some(SarifMessage {
                        text: info.full_description.to_string(),
                    }),
                    default_config: SarifRuleConfig {
                        level: info.default_level.to_string(),
                    },
                }
            })
            .collect();

        let results: Vec<SarifResult> = issues
            .iter()
            .map(|(report, f)| SarifResult {
                rule_id: f.rule.as_str().to_string(),
                level: map_severity_to_level(f.severity).to_string(),
                message: SarifMessage {
                    text: sarif_message(f),
                },
                locations: vec![SarifLocation {
                    physical_location: SarifPhysicalLocation {
                        artifact_location: SarifArtifact {
                            uri: report.document.replace('\\', "/"),
                        },
                        region: SarifRegion {
                            start_line: if f.line_number > 0 { f.line_number } else { 1 },
                        },
                    },
                    logical_locations: vec![SarifLogicalLocation {
                        fully_qualified_name: f.location.clone(),
                    }],
                }],
            })
            .collect();

        SarifReport {
            version: SARIF_VERSION.to_string(),
            schema: SARIF_SCHEMA.to_string(),
            runs: vec![SarifRun {
                tool: SarifTool {
                    driver: SarifDriver {
                        name: TOOL_NAME.to_string(),
                        version: env!("CARGO_PKG_VERSION").to_string(),
                        information_uri: INFO_URI.to_string(),
                        rules,
                    },
                },
                results,
            }],
        }
    }
}

fn sarif_message(f: &Finding) -> String {
    format!("[{}] {} (pattern: {})", f.source, f.message, f.pattern)
}

/// Write results in SARIF format.
pub fn write_sarif(reports: &[&AuditReport]) -> anyhow::Result<()> {
    let report = SarifReport::build(reports);
    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write results in pretty (human-readable) format.
pub fn write_pretty(rendered: &[Rendered<'_>], passed: bool, show_valid: bool) {
    println!();
    print!("  ");
    print!("{}", "oasregex".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    for r in rendered {
        write_document(r, show_valid);
    }

    write_final_status(rendered, passed);
    println!();
}

fn write_document(r: &Rendered<'_>, show_valid: bool) {
    let report = r.report;

    print!("  {}", "Document: ".dimmed());
    print!("{}", report.document);
    if let Some(version) = &report.spec_version {
        print!("{}", format!(" ({})", version).dimmed());
    }
    println!();

    let dialects: Vec<&str> = report.dialects.iter().map(|d| d.display_name()).collect();
    print!("  {}", "Dialects: ".dimmed());
    if dialects.is_empty() {
        println!("{}", "none".dimmed());
    } else {
        println!("{}", dialects.join(", "));
    }
    println!();

    write_result_summary(&report.summary);
    println!();

    let shown: Vec<&GroupedFinding> = report
        .groups
        .iter()
        .filter(|g| show_valid || !g.is_clean())
        .collect();
    if !shown.is_empty() {
        println!("  {} ({}):", "Findings".bold(), shown.len());
        println!();
        for g in shown {
            write_group(g);
        }
    }

    if !report.skipped.is_empty() {
        write_skipped(&report.skipped);
        println!();
    }

    if !report.summary.errors_by_dialect.is_empty() || !report.summary.warnings_by_message.is_empty()
    {
        write_breakdown(&report.summary);
        println!();
    }

    if let Some(id) = r.id {
        print!("  {}", "Result id: ".dimmed());
        print!("{}", id.cyan());
        println!("{}", format!("  (oasregex show {})", id).dimmed());
        println!();
    }
}

fn write_result_summary(summary: &AuditSummary) {
    print!("  {} locations", summary.total_locations);
    print!("  {}", format!("{} clean", summary.clean).green());
    print!("  {}", format!("{} with errors", summary.with_error).red());
    print!(
        "  {}",
        format!("{} with warnings", summary.warning_only).yellow()
    );
    println!();
}

fn write_group(g: &GroupedFinding) {
    print!("    {}", g.location.blue());
    let line = g.line_number();
    if line > 0 {
        print!("{}", format!(":{}", line).dimmed());
    }
    println!();
    println!("    {} {}", "pattern:".dimmed(), g.pattern);

    for f in &g.findings {
        write_severity_tag(f.severity);
        print!("{:<14}", f.source.name().dimmed());
        println!("{}", f.message);
        if let Some(suggestion) = &f.suggestion {
            println!("                       {}", suggestion.dimmed());
        }
        if let Some(fix) = &f.suggested_fix {
            println!("                       {} {}", "fix:".dimmed(), fix.green());
        }
    }
    println!();
}

fn write_severity_tag(severity: Severity) {
    match severity {
        Severity::Error => print!("      {} ", "ERROR".red()),
        Severity::Warning => print!("      {} ", "WARN ".yellow()),
        Severity::Valid => print!("      {} ", "OK   ".green()),
    }
}

fn write_skipped(skipped: &[Diagnostic]) {
    println!("  {} ({}):", "Skipped".dimmed(), skipped.len());
    for d in skipped {
        println!("    {}  {}", d.location.blue(), d.reason.dimmed());
    }
}

fn write_breakdown(summary: &AuditSummary) {
    println!("  {}", "Breakdown:".bold());

    for (dialect, count) in &summary.errors_by_dialect {
        let plural = if *count != 1 { "s" } else { "" };
        println!("    {:<40} {:>3} error{}", dialect, count, plural);
    }

    // Most frequent warnings first
    let mut warnings: Vec<(&String, &usize)> = summary.warnings_by_message.iter().collect();
    warnings.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (message, count) in warnings {
        let plural = if *count != 1 { "s" } else { "" };
        println!("    {:<40} {:>3} warning{}", message, count, plural);
    }
}

fn write_final_status(rendered: &[Rendered<'_>], passed: bool) {
    let errors: usize = rendered.iter().map(|r| r.report.summary.error_count()).sum();
    let warnings: usize = rendered
        .iter()
        .map(|r| r.report.summary.warning_count())
        .sum();

    print!(
        "  {}",
        format!("{} document(s)", rendered.len()).dimmed()
    );
    print!("  {}", format!("{} error(s)", errors).red());
    print!("  {}", format!("{} warning(s)", warnings).yellow());
    print!("  ");

    if passed {
        print!("{}", "PASSED".green());
    } else {
        print!("{}", "FAILED".red());
    }
    println!();
}
