//! Closing-delimiter repair for rejected patterns.
//!
//! Only two failures are mechanically fixable: a character class left open
//! at the end of the pattern and more `(` than `)`. The repair appends the
//! missing closing character and nothing else.

/// Delimiter balance of a pattern, ignoring escaped characters and
/// parentheses inside character classes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DelimiterScan {
    /// The pattern ends inside a `[...]` class.
    pub open_class: bool,
    /// `(` count minus `)` count, never below zero while scanning.
    pub unclosed_groups: usize,
    /// A `)` appeared with no matching `(`.
    pub stray_close: bool,
}

impl DelimiterScan {
    /// The pattern with the missing closing delimiter appended, if the
    /// imbalance is one we know how to repair.
    pub fn repair(&self, pattern: &str) -> Option<String> {
        if self.stray_close {
            return None;
        }
        if self.open_class {
            return Some(format!("{}]", pattern));
        }
        if self.unclosed_groups > 0 {
            return Some(format!("{})", pattern));
        }
        None
    }
}

/// Scan a pattern for unbalanced `[` and `(`.
pub fn scan_delimiters(pattern: &str) -> DelimiterScan {
    let mut scan = DelimiterScan::default();
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            chars.next();
            continue;
        }
        if in_class {
            if ch == ']' {
                in_class = false;
            }
            continue;
        }
        match ch {
            '[' => {
                in_class = true;
                // `]` right after `[` or `[^` is a literal
                if chars.peek() == Some(&'^') {
                    chars.next();
                }
                if chars.peek() == Some(&']') {
                    chars.next();
                }
            }
            '(' => scan.unclosed_groups += 1,
            ')' => {
                if scan.unclosed_groups == 0 {
                    scan.stray_close = true;
                } else {
                    scan.unclosed_groups -= 1;
                }
            }
            _ => {}
        }
    }

    scan.open_class = in_class;
    scan
}

/// Convert a byte offset reported by an engine into a character index.
pub(super) fn char_index(pattern: &str, byte_offset: usize) -> usize {
    let mut end = byte_offset.min(pattern.len());
    while !pattern.is_char_boundary(end) {
        end -= 1;
    }
    pattern[..end].chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_class() {
        let scan = scan_delimiters("[a-z");
        assert!(scan.open_class);
        assert_eq!(scan.repair("[a-z").as_deref(), Some("[a-z]"));
    }

    #[test]
    fn test_paren_inside_class_is_ignored() {
        let scan = scan_delimiters("^[(]+$");
        assert_eq!(scan, DelimiterScan::default());
        assert_eq!(scan.repair("^[(]+$"), None);
    }

    #[test]
    fn test_escaped_delimiters_are_ignored() {
        assert_eq!(scan_delimiters(r"^\(\[a\]$"), DelimiterScan::default());
    }

    #[test]
    fn test_leading_bracket_literal() {
        assert!(scan_delimiters("[]").open_class);
        assert!(!scan_delimiters("[]]").open_class);
        assert!(!scan_delimiters("[^]]").open_class);
    }

    #[test]
    fn test_unclosed_group() {
        let scan = scan_delimiters("^(a|(b)");
        assert_eq!(scan.unclosed_groups, 1);
        assert_eq!(scan.repair("^(a|(b)").as_deref(), Some("^(a|(b))"));
    }

    #[test]
    fn test_stray_close_is_not_repaired() {
        let scan = scan_delimiters("a)(b");
        assert!(scan.stray_close);
        assert_eq!(scan.repair("a)(b"), None);
    }

    #[test]
    fn test_char_index() {
        assert_eq!(char_index("abc", 2), 2);
        assert_eq!(char_index("éa", 2), 1);
        assert_eq!(char_index("é", 1), 0);
        assert_eq!(char_index("ab", 10), 2);
    }
}
