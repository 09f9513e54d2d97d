//! API-metadata checks on operations, component schemas and path templates.

use crate::config::Checks;
use crate::walker::{OperationInfo, PathInfo, SchemaInfo};

use super::{Finding, Rule, NOT_APPLICABLE};

pub const MSG_OPERATION_ID: &str = "missing operationId";
pub const MSG_SUMMARY: &str = "missing summary";
pub const MSG_SCHEMA_DESCRIPTION: &str = "missing schema description";
pub const MSG_SCHEMA_EXAMPLE: &str = "missing schema example";
pub const MSG_PATH_NAMING: &str = "path naming convention";

/// Check an operation for `operationId` and `summary`.
pub fn check_operation(op: &OperationInfo, checks: &Checks) -> Vec<Finding> {
    let mut findings = Vec::new();

    if checks.operation_id && op.operation_id.is_none() {
        findings.push(Finding::warning(
            &op.location,
            NOT_APPLICABLE,
            Rule::MissingOperationId,
            MSG_OPERATION_ID,
            "Each operation should have a unique 'operationId' for code generation and tooling.",
            None,
        ));
    }

    if checks.summary && op.summary.is_none() {
        findings.push(Finding::warning(
            &op.location,
            NOT_APPLICABLE,
            Rule::MissingSummary,
            MSG_SUMMARY,
            "A summary provides a quick, human-readable overview of the operation's purpose.",
            None,
        ));
    }

    findings
}

/// Check a named component schema for a description and an example.
pub fn check_schema(schema: &SchemaInfo, checks: &Checks) -> Vec<Finding> {
    let mut findings = Vec::new();

    if checks.schema_description && schema.description.is_none() {
        findings.push(Finding::warning(
            &schema.location,
            &schema.name,
            Rule::MissingSchemaDescription,
            MSG_SCHEMA_DESCRIPTION,
            "A description clarifies the purpose and structure of the schema.",
            None,
        ));
    }

    if checks.schema_example && !schema.has_example {
        findings.push(Finding::warning(
            &schema.location,
            &schema.name,
            Rule::MissingSchemaExample,
            MSG_SCHEMA_EXAMPLE,
            "Providing an example value helps developers understand the expected data format.",
            None,
        ));
    }

    findings
}

/// Flag path templates with upper-case letters outside `{param}` names.
pub fn check_path(path: &PathInfo, checks: &Checks) -> Vec<Finding> {
    if !checks.path_naming || !has_upper_case_segment(&path.template) {
        return Vec::new();
    }

    vec![Finding::warning(
        &path.location,
        &path.template,
        Rule::PathNaming,
        MSG_PATH_NAMING,
        "Path segments should ideally use kebab-case (e.g., /user-profiles) or snake_case, not camelCase, for better readability.",
        Some(kebab_case(&path.template)),
    )]
}

fn has_upper_case_segment(template: &str) -> bool {
    let mut in_param = false;
    for c in template.chars() {
        match c {
            '{' => in_param = true,
            '}' => in_param = false,
            c if !in_param && c.is_ascii_uppercase() => return true,
            _ => {}
        }
    }
    false
}

/// `/userProfiles/{userId}` becomes `/user-profiles/{userId}`.
fn kebab_case(template: &str) -> String {
    let mut out = String::with_capacity(template.len() + 4);
    let mut in_param = false;
    let mut prev_lower = false;

    for c in template.chars() {
        match c {
            '{' => in_param = true,
            '}' => in_param = false,
            _ => {}
        }
        if !in_param && c.is_ascii_uppercase() {
            if prev_lower {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    out
}
