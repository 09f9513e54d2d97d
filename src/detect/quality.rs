//! Dialect-independent quality and security checks on regex patterns.
//!
//! # Checks
//! - Permissiveness: the pattern is exactly `.*` or `.+`
//! - Anchoring: the pattern is not wrapped in `^...$` (skipped for the
//!   permissive patterns, which are already flagged)
//! - Backtracking risk: a group repeated with `*` or `+` that itself
//!   contains a quantifier, e.g. `(a+)+`, `(\w*)*`, `(?:x+y)+`
//!
//! The backtracking check is a structural approximation. It misses
//! alternation-based blowup like `(a|a)+` and flags some benign nested
//! repetition. Lookaround and atomic groups are never treated as the
//! repeated group.

use phf::phf_map;

use crate::config::Checks;

use super::{Finding, Rule};

pub const MSG_PERMISSIVE: &str = "overly permissive pattern";
pub const MSG_ANCHORS: &str = "missing anchors";
pub const MSG_BACKTRACKING: &str = "potential catastrophic-backtracking risk";

/// Maximally permissive patterns and the advice attached to each.
static WEAK_PATTERNS: phf::Map<&'static str, &'static str> = phf_map! {
    ".*" => "The pattern '.*' allows any sequence of characters, including an empty string. This is often too permissive and can lead to validation bypasses or unexpected behavior.",
    ".+" => "The pattern '.+' allows any sequence of one or more characters. While slightly more restrictive than '.*', it is still very broad. Specify the character set and length if possible.",
};

const ANCHOR_ADVICE: &str = "The pattern is not anchored with '^' and '$' at the start and end, so it can match a substring within a larger, invalid string. Consider wrapping the pattern with '^' and '$' to ensure it matches the entire string.";

const BACKTRACKING_ADVICE: &str = "The pattern appears to contain nested quantifiers (e.g., (a+)+), which can lead to catastrophic backtracking on certain inputs. Consider refactoring the expression so repeated parts cannot overlap, or use a linear-time engine.";

/// Run the enabled pattern checks. Returns findings in check order.
pub fn check_pattern(location: &str, pattern: &str, checks: &Checks) -> Vec<Finding> {
    let mut findings = Vec::new();
    let trimmed = pattern.trim();
    let weak = WEAK_PATTERNS.get(trimmed);

    if checks.permissive {
        if let Some(advice) = weak {
            findings.push(Finding::warning(
                location,
                pattern,
                Rule::OverlyPermissive,
                MSG_PERMISSIVE,
                *advice,
                None,
            ));
        }
    }

    if checks.anchors && weak.is_none() && !is_anchored(trimmed) {
        findings.push(Finding::warning(
            location,
            pattern,
            Rule::MissingAnchors,
            MSG_ANCHORS,
            ANCHOR_ADVICE,
            Some(anchor(trimmed)),
        ));
    }

    if checks.backtracking && has_backtracking_risk(pattern) {
        findings.push(Finding::warning(
            location,
            pattern,
            Rule::BacktrackingRisk,
            MSG_BACKTRACKING,
            BACKTRACKING_ADVICE,
            None,
        ));
    }

    findings
}

/// Whether the trimmed pattern starts with `^` and ends with an unescaped `$`.
pub fn is_anchored(trimmed: &str) -> bool {
    trimmed.starts_with('^') && ends_with_end_anchor(trimmed)
}

/// A trailing `$` is an anchor unless an odd run of backslashes escapes it.
fn ends_with_end_anchor(trimmed: &str) -> bool {
    match trimmed.strip_suffix('$') {
        Some(body) => body.chars().rev().take_while(|&c| c == '\\').count() % 2 == 0,
        None => false,
    }
}

/// Wrap a pattern in `^...$`, keeping an anchor that is already present.
pub fn anchor(trimmed: &str) -> String {
    let mut out = String::with_capacity(trimmed.len() + 2);
    if !trimmed.starts_with('^') {
        out.push('^');
    }
    out.push_str(trimmed);
    if !ends_with_end_anchor(trimmed) {
        out.push('$');
    }
    out
}

/// An open group while scanning.
struct GroupFrame {
    /// Lookaround or atomic group; never reported as the repeated group.
    assertion: bool,
    has_quantifier: bool,
}

/// Detect a quantified group that contains a quantifier.
pub fn has_backtracking_risk(pattern: &str) -> bool {
    let chars: Vec<char> = pattern.chars().collect();
    let mut stack: Vec<GroupFrame> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                i += 2;
                continue;
            }
            '[' => {
                i = skip_class(&chars, i);
                continue;
            }
            '(' => {
                stack.push(GroupFrame {
                    assertion: is_assertion_group(&chars[i + 1..]),
                    has_quantifier: false,
                });
            }
            ')' => {
                if let Some(group) = stack.pop() {
                    let repeated = matches!(chars.get(i + 1), Some('*') | Some('+'));
                    if repeated && group.has_quantifier && !group.assertion {
                        return true;
                    }
                    // The enclosing group contains whatever this one did.
                    if group.has_quantifier || is_unbounded_quantifier(&chars, i + 1) {
                        if let Some(parent) = stack.last_mut() {
                            parent.has_quantifier = true;
                        }
                    }
                }
            }
            _ => {
                if is_unbounded_quantifier(&chars, i) {
                    if let Some(group) = stack.last_mut() {
                        group.has_quantifier = true;
                    }
                }
            }
        }
        i += 1;
    }

    false
}

/// `(?=`, `(?!`, `(?<=`, `(?<!` and `(?>`; `after` starts after the `(`.
fn is_assertion_group(after: &[char]) -> bool {
    match after {
        ['?', '=', ..] | ['?', '!', ..] | ['?', '>', ..] => true,
        ['?', '<', '=', ..] | ['?', '<', '!', ..] => true,
        _ => false,
    }
}

/// `*`, `+`, or a `{n,}` / `{n,m}` counted repetition starting at `i`.
fn is_unbounded_quantifier(chars: &[char], i: usize) -> bool {
    match chars.get(i) {
        Some('*') | Some('+') => true,
        Some('{') => {
            let rest: String = chars[i + 1..].iter().take_while(|c| **c != '}').collect();
            let mut parts = rest.splitn(2, ',');
            let min = parts.next().unwrap_or("");
            match parts.next() {
                Some(max) => {
                    !min.is_empty()
                        && min.chars().all(|c| c.is_ascii_digit())
                        && max.chars().all(|c| c.is_ascii_digit())
                        && max.parse::<u32>().map(|m| m > 1).unwrap_or(true)
                }
                None => false,
            }
        }
        _ => false,
    }
}

/// Index just past the `]` closing a class opened at `start`.
fn skip_class(chars: &[char], start: usize) -> usize {
    let mut i = start + 1;
    if chars.get(i) == Some(&'^') {
        i += 1;
    }
    if chars.get(i) == Some(&']') {
        i += 1;
    }
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            ']' => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern_checks() -> Checks {
        Checks {
            permissive: true,
            anchors: true,
            backtracking: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_pattern() {
        assert!(check_pattern("#/x", "^[a-z]+$", &pattern_checks()).is_empty());
    }

    #[test]
    fn test_permissive_suppresses_anchors() {
        let findings = check_pattern("#/x", ".*", &pattern_checks());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, Rule::OverlyPermissive);
        assert_eq!(findings[0].message, MSG_PERMISSIVE);

        // trimmed before lookup
        let findings = check_pattern("#/x", "  .+ ", &pattern_checks());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].pattern, "  .+ ");
    }

    #[test]
    fn test_permissive_still_skips_anchors_when_disabled() {
        let checks = Checks {
            anchors: true,
            ..Default::default()
        };
        assert!(check_pattern("#/x", ".*", &checks).is_empty());
    }

    #[test]
    fn test_missing_anchors_fix() {
        let findings = check_pattern("#/x", "[0-9]{3}", &pattern_checks());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, Rule::MissingAnchors);
        assert_eq!(findings[0].suggested_fix.as_deref(), Some("^[0-9]{3}$"));

        assert_eq!(anchor("^abc"), "^abc$");
        assert_eq!(anchor("abc$"), "^abc$");
        assert_eq!(anchor(r"^a\$"), r"^a\$$");
        assert_eq!(anchor(r"^a\\$"), r"^a\\$");
    }

    #[test]
    fn test_escaped_backslash_before_dollar_is_anchored() {
        assert!(is_anchored(r"^a\\$"));
        assert!(is_anchored(r"^a\\\\$"));
        assert!(!is_anchored(r"^a\$"));
        assert!(!is_anchored(r"^a\\\$"));

        let findings = check_pattern("#/x", r"^[a-z]+\\$", &pattern_checks());
        assert!(findings.iter().all(|f| f.rule != Rule::MissingAnchors));
        let findings = check_pattern("#/x", r"^[a-z]+\$", &pattern_checks());
        assert_eq!(findings[0].suggested_fix.as_deref(), Some(r"^[a-z]+\$$"));
    }

    #[test]
    fn test_backtracking_scenarios() {
        let checks = Checks {
            backtracking: true,
            ..Default::default()
        };
        let findings = check_pattern("#/x", "(a+)+", &checks);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, MSG_BACKTRACKING);
    }

    #[test]
    fn test_backtracking_heuristic() {
        assert!(has_backtracking_risk("(a+)+"));
        assert!(has_backtracking_risk(r"^(\w*)*$"));
        assert!(has_backtracking_risk("^(?:x+y)+$"));
        assert!(has_backtracking_risk("^((ab)+c)*$"));
        assert!(has_backtracking_risk("^(a{2,})+$"));

        assert!(!has_backtracking_risk("^(ab)+$"));
        assert!(!has_backtracking_risk("^(a+)$"));
        assert!(!has_backtracking_risk("^(a+)?$"));
        assert!(!has_backtracking_risk("^[(a+)]+$"));
        assert!(!has_backtracking_risk(r"^\(a+\)+$"));
        assert!(!has_backtracking_risk("^(?=a+)+b$"));
        assert!(!has_backtracking_risk("^(a{1,1})+$"));
    }
}
