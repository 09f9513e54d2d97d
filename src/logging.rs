//! Tracing setup for the oasregex binary.
//!
//! Logs go to stderr so report output on stdout stays machine-readable.

use std::io;
use std::sync::Once;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `verbose`; without either only warnings
/// are shown. Subsequent calls are ignored.
pub fn init(verbose: bool, json: bool) {
    INIT.call_once(|| {
        let default_level = if verbose { "debug" } else { "warn" };
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("oasregex={}", default_level)));

        let registry = tracing_subscriber::registry().with(env_filter);
        if json {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(io::stderr)
                        .with_target(true)
                        .with_current_span(true),
                )
                .init();
        } else {
            registry
                .with(
                    fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(verbose)
                        .with_thread_names(verbose),
                )
                .init();
        }
    });
}
