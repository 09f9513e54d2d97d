//! RE2-style dialect: linear-time automaton syntax.
//!
//! The pattern is parsed and translated with `regex-syntax` first so that
//! errors carry a span, then compiled with `regex` to enforce size limits.

use regex_syntax::ast::parse::Parser;
use regex_syntax::hir::translate::Translator;

use super::{repair::char_index, Rejection, Verdict};

pub(super) fn check(pattern: &str) -> Verdict {
    let ast = match Parser::new().parse(pattern) {
        Ok(ast) => ast,
        Err(e) => {
            return Verdict::Rejected(Rejection::new(
                e.kind().to_string(),
                Some(char_index(pattern, e.span().start.offset)),
            ))
        }
    };

    if let Err(e) = Translator::new().translate(pattern, &ast) {
        return Verdict::Rejected(Rejection::new(
            e.kind().to_string(),
            Some(char_index(pattern, e.span().start.offset)),
        ));
    }

    match regex::Regex::new(pattern) {
        Ok(_) => Verdict::Accepted,
        Err(e) => Verdict::Rejected(Rejection::new(e.to_string(), None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_lookaround() {
        match check("(?<=foo)bar") {
            Verdict::Rejected(r) => {
                assert!(r.diagnostic.contains("look-around"));
                assert_eq!(r.index, Some(0));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert!(matches!(check("^foo(?!bar)$"), Verdict::Rejected(_)));
    }

    #[test]
    fn test_rejects_backreference() {
        match check(r"(a)\1") {
            Verdict::Rejected(r) => assert!(r.diagnostic.contains("backreferences")),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_accepts_named_groups_and_text_anchors() {
        assert_eq!(check(r"\A(?P<id>[0-9]+)\z"), Verdict::Accepted);
    }

    #[test]
    fn test_index_counts_characters_not_bytes() {
        match check("é(?=x)") {
            Verdict::Rejected(r) => assert_eq!(r.index, Some(1)),
            other => panic!("expected rejection, got {:?}", other),
        }
    }
}
