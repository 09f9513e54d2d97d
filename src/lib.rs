//! oasregex - OpenAPI regex auditor.
//!
//! Finds every regex `pattern` in an OpenAPI 3 or Swagger 2 document and
//! checks it two ways: whether it compiles under each selected regex
//! dialect (PCRE, ECMAScript, RE2), and whether it is structurally weak
//! (maximally permissive, unanchored, or prone to catastrophic
//! backtracking). Optional checks cover API metadata such as missing
//! operation ids and camelCase paths.
//!
//! # Architecture
//!
//! - `document`: YAML/JSON loading and local `$ref` lookup
//! - `walker`: lazy traversal yielding located patterns and API elements
//! - `dialect`: per-dialect syntax validators
//! - `detect`: quality and metadata checks plus the audit `Runner`
//! - `aggregate`: grouping by `(location, pattern)` and summary statistics
//! - `config`: YAML audit profiles
//! - `cache`: permalink store for `oasregex show`
//! - `report`: output formatting (pretty, JSON, SARIF)
//!
//! # Example
//!
//! ```no_run
//! use oasregex::{AuditConfig, Document, Runner};
//!
//! let doc = Document::load("openapi.yaml")?;
//! let config = AuditConfig::default();
//! let report = Runner::new(&config).run(&doc);
//! println!("{} locations with errors", report.summary.with_error);
//! # Ok::<(), oasregex::AuditError>(())
//! ```

pub mod aggregate;
pub mod cache;
pub mod cli;
pub mod config;
pub mod detect;
pub mod dialect;
pub mod document;
pub mod error;
pub mod logging;
pub mod report;
pub mod source;
pub mod walker;

pub use aggregate::{AuditSummary, GroupedFinding};
pub use cache::ResultsCache;
pub use config::AuditConfig;
pub use detect::{AuditReport, Finding, Runner, Severity};
pub use dialect::Dialect;
pub use document::Document;
pub use error::AuditError;
pub use walker::Walker;
