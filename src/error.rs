//! Error types for loading documents, profiles and cached results.
//!
//! Nothing in here is raised by the audit itself: dialect failures and
//! malformed document nodes become findings or diagnostics instead.

use thiserror::Error;

/// Errors that can occur around an audit run.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse document: {0}")]
    Parse(String),
    #[error("not an OpenAPI document: {0}")]
    NotOpenApi(String),
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("cache error: {0}")]
    Cache(String),
}

pub type Result<T> = std::result::Result<T, AuditError>;
