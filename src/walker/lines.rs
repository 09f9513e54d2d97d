//! Best-effort source line lookup for patterns.
//!
//! The parsed tree carries no positions, so a pattern's line is found by
//! searching the raw text for its `pattern:` entry. Identical patterns in
//! several places all resolve to the first occurrence.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Raw text split into trimmed, whitespace-collapsed lines.
#[derive(Debug, Clone)]
pub struct LineIndex {
    lines: Vec<String>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        Self {
            lines: source.lines().map(collapse).collect(),
        }
    }

    /// 1-based line of the first `pattern` entry carrying `pattern`, 0 if none.
    pub fn find(&self, pattern: &str) -> usize {
        let needles = needles(pattern);
        let plain = format!("pattern: {}", collapse(pattern));

        for (i, line) in self.lines.iter().enumerate() {
            if needles.iter().any(|n| line.contains(n.as_str())) {
                return i + 1;
            }
            // Plain scalars must end the line, or `a` would match `abc`.
            if line == &plain || line.ends_with(&format!(" {}", plain)) {
                return i + 1;
            }
        }
        0
    }
}

/// One-shot lookup; build a [`LineIndex`] when resolving many patterns.
pub fn line_number(source: &str, pattern: &str) -> usize {
    LineIndex::new(source).find(pattern)
}

fn collapse(line: &str) -> String {
    WHITESPACE.replace_all(line.trim(), " ").into_owned()
}

/// Quoted forms a pattern may take in YAML or JSON text.
fn needles(pattern: &str) -> Vec<String> {
    let single = collapse(&pattern.replace('\'', "''"));
    let double = serde_json::to_string(pattern)
        .map(|s| collapse(&s))
        .unwrap_or_else(|_| format!("\"{}\"", collapse(pattern)));

    vec![
        format!("pattern: '{}'", single),
        format!("pattern: {}", double),
        format!("\"pattern\": {}", double),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"openapi: 3.0.0
components:
  schemas:
    User:
      properties:
        id:
          type: string
          pattern:   '^[0-9]+$'
        code:
          pattern: "^[A-Z]{2}\\d$"
        plain:
          pattern: ^abc$
        quoted:
          pattern: 'it''s'
"#;

    #[test]
    fn test_single_quoted_with_extra_whitespace() {
        assert_eq!(line_number(YAML, "^[0-9]+$"), 8);
    }

    #[test]
    fn test_double_quoted() {
        assert_eq!(line_number(YAML, r"^[A-Z]{2}\d$"), 10);
    }

    #[test]
    fn test_plain_scalar_must_match_whole_value() {
        assert_eq!(line_number(YAML, "^abc$"), 12);
        assert_eq!(line_number(YAML, "^ab"), 0);
    }

    #[test]
    fn test_escaped_single_quote() {
        assert_eq!(line_number(YAML, "it's"), 14);
    }

    #[test]
    fn test_json_form() {
        let json = "{\n  \"openapi\": \"3.0.0\",\n  \"x\": {\n    \"pattern\": \"^a$\"\n  }\n}";
        assert_eq!(line_number(json, "^a$"), 4);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let text = "a:\n  pattern: '^x$'\nb:\n  pattern: '^x$'\n";
        let index = LineIndex::new(text);
        assert_eq!(index.find("^x$"), 2);
        assert_eq!(index.find("^y$"), 0);
    }
}
