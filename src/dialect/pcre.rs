//! PCRE-family dialect, checked with a backtracking engine that supports
//! lookaround, backreferences and atomic groups.

use fancy_regex::Regex;

use super::{repair::char_index, Rejection, Verdict};

pub(super) fn check(pattern: &str) -> Verdict {
    match Regex::new(pattern) {
        Ok(_) => Verdict::Accepted,
        Err(fancy_regex::Error::ParseError(pos, kind)) => Verdict::Rejected(Rejection::new(
            kind.to_string(),
            Some(char_index(pattern, pos)),
        )),
        Err(e) => Verdict::Rejected(Rejection::new(e.to_string(), None)),
    }
}
