//! ECMAScript dialect.
//!
//! Patterns are compiled with `regress` on a dedicated thread and the caller
//! waits at most the configured timeout, so a pathological pattern cannot
//! stall an audit. The wait is a plain channel receive, which works the same
//! from synchronous code and from inside an async runtime. A timeout, a
//! panic inside the engine, or a thread that cannot be started is a fault
//! for this dialect only.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use super::{Rejection, Verdict};

pub(super) fn check(pattern: &str, timeout: Duration) -> Verdict {
    let (tx, rx) = mpsc::channel();
    let owned = pattern.to_string();

    let spawned = thread::Builder::new()
        .name("oasregex-ecma".to_string())
        .spawn(move || {
            let outcome = regress::Regex::new(&owned).map(|_| ()).map_err(|e| e.text);
            // The receiver is gone after a timeout
            let _ = tx.send(outcome);
        });
    if let Err(e) = spawned {
        return Verdict::Fault(format!("could not start validation thread: {}", e));
    }

    match rx.recv_timeout(timeout) {
        Ok(Ok(())) => Verdict::Accepted,
        Ok(Err(text)) => Verdict::Rejected(Rejection::new(text, None)),
        Err(RecvTimeoutError::Timeout) => Verdict::Fault(format!(
            "validation timed out after {}ms",
            timeout.as_millis()
        )),
        Err(RecvTimeoutError::Disconnected) => {
            Verdict::Fault("validation thread panicked".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_check(pattern: &str) -> Verdict {
        check(pattern, Duration::from_millis(super::super::DEFAULT_ECMA_TIMEOUT_MS))
    }

    #[test]
    fn test_accepts_named_groups_and_lookbehind() {
        assert_eq!(default_check(r"^(?<year>\d{4})-(?<=\d{4}-)\d{2}$"), Verdict::Accepted);
    }

    #[test]
    fn test_rejects_unbalanced_bracket() {
        match default_check("[a-z") {
            Verdict::Rejected(r) => {
                assert!(r.diagnostic.contains("bracket"));
                assert_eq!(r.index, None);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_python_style_named_group() {
        assert!(matches!(default_check(r"(?P<id>\d+)"), Verdict::Rejected(_)));
    }

    #[test]
    fn test_rejects_excess_close_paren() {
        assert!(matches!(default_check("abc)"), Verdict::Rejected(_)));
    }

    #[tokio::test]
    async fn test_check_inside_async_runtime() {
        assert_eq!(default_check("^a$"), Verdict::Accepted);
        assert!(matches!(default_check("[a-z"), Verdict::Rejected(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_validate_inside_multi_thread_runtime() {
        let finding = super::super::Dialect::Ecma.validate("#/x", "^a$");
        assert_eq!(finding.severity, crate::detect::Severity::Valid);
    }
}
