//! Detection of invalid and weak regex patterns and incomplete API metadata.

pub mod metadata;
pub mod quality;
mod runner;
mod types;

pub use runner::{AuditReport, Runner};
pub use types::{Finding, FindingSource, LocatedPattern, Rule, Severity, NOT_APPLICABLE};
