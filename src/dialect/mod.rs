//! Regex dialect validators.
//!
//! Each supported dialect checks whether a pattern is legal under its own
//! grammar and reports the outcome as a [`Finding`]:
//! - PCRE: backtracking engine with lookaround and backreferences
//! - ECMAScript: JavaScript `RegExp` syntax (ES2018)
//! - RE2: linear-time automaton syntax, no lookaround or backreferences
//!
//! The dialect set is closed. Adding one means adding a variant here and a
//! module with a `check` function returning a [`Verdict`].

mod ecma;
mod pcre;
mod re2;
mod repair;

pub use repair::{scan_delimiters, DelimiterScan};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::detect::{Finding, Rule};

/// Default upper bound on a single ECMAScript syntax check.
pub const DEFAULT_ECMA_TIMEOUT_MS: u64 = 2000;

/// A supported regex dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Pcre,
    Ecma,
    Re2,
}

/// Tunables for dialect checks.
#[derive(Debug, Clone)]
pub struct DialectOptions {
    pub ecma_timeout: Duration,
}

impl Default for DialectOptions {
    fn default() -> Self {
        Self {
            ecma_timeout: Duration::from_millis(DEFAULT_ECMA_TIMEOUT_MS),
        }
    }
}

/// Outcome of one dialect's compile check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Verdict {
    Accepted,
    Rejected(Rejection),
    /// The check itself could not complete.
    Fault(String),
}

/// A syntax error reported by a dialect's parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Rejection {
    pub diagnostic: String,
    /// Character offset of the error, when the engine reports one.
    pub index: Option<usize>,
}

impl Rejection {
    pub(crate) fn new(diagnostic: impl Into<String>, index: Option<usize>) -> Self {
        Self {
            diagnostic: diagnostic.into(),
            index,
        }
    }
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [Dialect::Pcre, Dialect::Ecma, Dialect::Re2];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Pcre => "pcre",
            Dialect::Ecma => "ecma",
            Dialect::Re2 => "re2",
        }
    }

    /// Human-readable name used in messages and summaries.
    pub fn display_name(&self) -> &'static str {
        match self {
            Dialect::Pcre => "PCRE",
            Dialect::Ecma => "ECMAScript",
            Dialect::Re2 => "RE2",
        }
    }

    /// Parse a dialect name or one of its runtime aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pcre" | "java" | "perl" | "python" => Some(Dialect::Pcre),
            "ecma" | "ecmascript" | "js" | "javascript" => Some(Dialect::Ecma),
            "re2" | "go" | "rust" => Some(Dialect::Re2),
            _ => None,
        }
    }

    /// General advice for patterns this dialect rejects.
    fn restriction(&self) -> &'static str {
        match self {
            Dialect::Pcre => {
                "Check PCRE/Java regex documentation for supported features. Groups and character classes must be balanced and quantifiers need a repeatable target."
            }
            Dialect::Ecma => {
                "The pattern is not a valid regular expression according to JavaScript's syntax rules. ECMAScript does not support possessive quantifiers, atomic groups, inline flags or \\A/\\Z anchors."
            }
            Dialect::Re2 => {
                "RE2 is designed for linear-time matching and does not support lookarounds or backreferences. Simplify the pattern or consult RE2 syntax documentation."
            }
        }
    }

    fn check(&self, pattern: &str, options: &DialectOptions) -> Verdict {
        match self {
            Dialect::Pcre => pcre::check(pattern),
            Dialect::Ecma => ecma::check(pattern, options.ecma_timeout),
            Dialect::Re2 => re2::check(pattern),
        }
    }

    /// Validate a pattern with default options.
    pub fn validate(&self, location: &str, pattern: &str) -> Finding {
        self.validate_with(location, pattern, &DialectOptions::default())
    }

    /// Validate a pattern under this dialect.
    pub fn validate_with(&self, location: &str, pattern: &str, options: &DialectOptions) -> Finding {
        match self.check(pattern, options) {
            Verdict::Accepted => {
                debug!(dialect = self.as_str(), location, "pattern accepted");
                Finding::valid(location, pattern, *self)
            }
            Verdict::Rejected(rejection) => {
                debug!(
                    dialect = self.as_str(),
                    location,
                    diagnostic = %rejection.diagnostic,
                    "pattern rejected"
                );
                let message = match rejection.index {
                    Some(ix) => format!(
                        "Invalid {} syntax: {} near index {}",
                        self.display_name(),
                        rejection.diagnostic,
                        ix
                    ),
                    None => format!(
                        "Invalid {} syntax: {}",
                        self.display_name(),
                        rejection.diagnostic
                    ),
                };
                let suggestion = match rejection.index {
                    Some(ix) => format!(
                        "Review the pattern around index {}. {}",
                        ix,
                        self.restriction()
                    ),
                    None => self.restriction().to_string(),
                };
                let fix = self.delimiter_fix(pattern, options);
                Finding::error(
                    location,
                    pattern,
                    *self,
                    Rule::DialectSyntax,
                    message,
                    suggestion,
                    fix,
                )
            }
            Verdict::Fault(reason) => {
                warn!(dialect = self.as_str(), location, %reason, "dialect check failed");
                Finding::error(
                    location,
                    pattern,
                    *self,
                    Rule::DialectFault,
                    format!(
                        "An unexpected error occurred during {} validation: {}",
                        self.display_name(),
                        reason
                    ),
                    format!(
                        "The {} validator could not complete. Re-run the audit or check this pattern manually.",
                        self.display_name()
                    ),
                    None,
                )
            }
        }
    }

    /// Closing-delimiter repair, offered only when the result is accepted.
    fn delimiter_fix(&self, pattern: &str, options: &DialectOptions) -> Option<String> {
        let candidate = scan_delimiters(pattern).repair(pattern)?;
        match self.check(&candidate, options) {
            Verdict::Accepted => Some(candidate),
            _ => None,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dialect::parse(s).ok_or_else(|| {
            format!(
                "unknown dialect {:?}, must be one of: pcre, ecma, re2 (aliases: java, js, go)",
                s
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Severity;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(Dialect::parse("java"), Some(Dialect::Pcre));
        assert_eq!(Dialect::parse("JS"), Some(Dialect::Ecma));
        assert_eq!(Dialect::parse("go"), Some(Dialect::Re2));
        assert_eq!(Dialect::parse("cobol"), None);
    }

    #[test]
    fn test_anchored_class_is_valid_everywhere() {
        for dialect in Dialect::ALL {
            let f = dialect.validate("#/x", "^[a-z]+$");
            assert_eq!(f.severity, Severity::Valid, "{}", dialect);
            assert_eq!(
                f.message,
                format!("pattern accepted by {}", dialect.display_name())
            );
        }
    }

    #[test]
    fn test_unclosed_class_suggests_closing_bracket() {
        let f = Dialect::Pcre.validate("#/x", "[a-z");
        assert_eq!(f.severity, Severity::Error);
        assert!(!f.is_syntactically_valid);
        assert_eq!(f.suggested_fix.as_deref(), Some("[a-z]"));
        assert!(f.message.contains("near index"));
    }

    #[test]
    fn test_unclosed_group_suggests_closing_paren() {
        for dialect in Dialect::ALL {
            let f = dialect.validate("#/x", "^(abc");
            assert_eq!(f.severity, Severity::Error, "{}", dialect);
            assert_eq!(f.suggested_fix.as_deref(), Some("^(abc)"), "{}", dialect);
        }
    }

    #[test]
    fn test_lookbehind_rejected_by_re2_without_fix() {
        let f = Dialect::Re2.validate("#/x", "(?<=foo)bar");
        assert_eq!(f.severity, Severity::Error);
        assert!(f.suggested_fix.is_none());
        assert!(f.suggestion.as_deref().unwrap().contains("lookarounds"));
    }

    #[test]
    fn test_lookbehind_accepted_by_pcre_and_ecma() {
        assert_eq!(
            Dialect::Pcre.validate("#/x", "(?<=foo)bar").severity,
            Severity::Valid
        );
        assert_eq!(
            Dialect::Ecma.validate("#/x", "(?<=foo)bar").severity,
            Severity::Valid
        );
    }

    #[test]
    fn test_validate_is_deterministic() {
        for dialect in Dialect::ALL {
            let a = dialect.validate("#/x", "(a|b");
            let b = dialect.validate("#/x", "(a|b");
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_stray_close_paren_has_no_fix() {
        let f = Dialect::Pcre.validate("#/x", "abc)");
        assert_eq!(f.severity, Severity::Error);
        assert!(f.suggested_fix.is_none());
    }
}
