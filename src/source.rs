//! Where documents come from: files, directories, stdin and URLs.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use walkdir::WalkDir;

use crate::document::Document;
use crate::error::{AuditError, Result};

/// Default limit for fetching a document over HTTP.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

const DOCUMENT_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// One document source named on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A file; `explicit` is false for files found by walking a directory.
    File { path: PathBuf, explicit: bool },
    Stdin,
    Url(String),
}

impl Source {
    /// Display name used in reports.
    pub fn name(&self) -> String {
        match self {
            Source::File { path, .. } => path.to_string_lossy().to_string(),
            Source::Stdin => "stdin".to_string(),
            Source::Url(url) => url.clone(),
        }
    }

    /// Files found in directories may be unrelated YAML; those are skipped
    /// rather than failing the run.
    pub fn is_discovered(&self) -> bool {
        matches!(self, Source::File { explicit: false, .. })
    }

    /// Read and parse the document.
    pub fn load(&self, fetch_timeout: Duration) -> Result<Document> {
        match self {
            Source::File { path, .. } => Document::load(path),
            Source::Stdin => {
                let mut text = String::new();
                std::io::stdin().read_to_string(&mut text)?;
                Document::parse("stdin", text)
            }
            Source::Url(url) => {
                let text = fetch_blocking(url, fetch_timeout)?;
                Document::parse(url.clone(), text)
            }
        }
    }
}

/// Expand command-line arguments into sources. Directories are walked for
/// YAML and JSON files in sorted order.
pub fn collect_sources(args: &[String]) -> Result<Vec<Source>> {
    let mut sources = Vec::new();

    for arg in args {
        if arg == "-" {
            sources.push(Source::Stdin);
            continue;
        }
        if arg.starts_with("http://") || arg.starts_with("https://") {
            sources.push(Source::Url(arg.clone()));
            continue;
        }

        let path = Path::new(arg);
        let metadata = std::fs::metadata(path).map_err(|e| {
            AuditError::Io(std::io::Error::new(
                e.kind(),
                format!("cannot access {}: {}", arg, e),
            ))
        })?;

        if metadata.is_dir() {
            sources.extend(collect_dir(path)?);
        } else {
            sources.push(Source::File {
                path: path.to_path_buf(),
                explicit: true,
            });
        }
    }

    Ok(sources)
}

fn collect_dir(root: &Path) -> Result<Vec<Source>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            // Skip hidden and dependency directories
            !(e.file_type().is_dir()
                && e.depth() > 0
                && (name.starts_with('.') || name == "node_modules" || name == "target"))
        })
    {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if DOCUMENT_EXTENSIONS.contains(&ext) {
            files.push(Source::File {
                path: path.to_path_buf(),
                explicit: false,
            });
        }
    }

    debug!(dir = %root.display(), files = files.len(), "collected documents");
    Ok(files)
}

/// Fetch a document body over HTTP.
pub async fn fetch(client: &reqwest::Client, url: &str, timeout: Duration) -> Result<String> {
    let fetch_error = |reason: String| AuditError::Fetch {
        url: url.to_string(),
        reason,
    };

    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                fetch_error(format!("timed out after {}s", timeout.as_secs()))
            } else {
                fetch_error(e.to_string())
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(fetch_error(format!("HTTP {}", status.as_u16())));
    }

    response.text().await.map_err(|e| fetch_error(e.to_string()))
}

fn fetch_blocking(url: &str, timeout: Duration) -> Result<String> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("oasregex/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AuditError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(fetch(&client, url, timeout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_sources_kinds() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("api.yaml");
        std::fs::write(&file, "openapi: 3.0.0\n").unwrap();

        let args = vec![
            "-".to_string(),
            "https://example.org/openapi.json".to_string(),
            file.to_string_lossy().to_string(),
        ];
        let sources = collect_sources(&args).unwrap();
        assert_eq!(sources[0], Source::Stdin);
        assert_eq!(sources[1], Source::Url("https://example.org/openapi.json".into()));
        assert!(matches!(&sources[2], Source::File { explicit: true, .. }));
    }

    #[test]
    fn test_collect_dir_filters_and_sorts() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("b.yml"), "").unwrap();
        std::fs::write(temp.path().join("a.json"), "").unwrap();
        std::fs::write(temp.path().join("notes.txt"), "").unwrap();
        std::fs::create_dir(temp.path().join(".git")).unwrap();
        std::fs::write(temp.path().join(".git").join("c.yaml"), "").unwrap();

        let sources = collect_sources(&[temp.path().to_string_lossy().to_string()]).unwrap();
        let names: Vec<String> = sources
            .iter()
            .map(|s| match s {
                Source::File { path, .. } => path.file_name().unwrap().to_string_lossy().to_string(),
                _ => String::new(),
            })
            .collect();
        assert_eq!(names, vec!["a.json", "b.yml"]);
        assert!(sources.iter().all(Source::is_discovered));
    }

    #[test]
    fn test_missing_path_is_an_error() {
        assert!(collect_sources(&["/definitely/not/here.yaml".to_string()]).is_err());
    }

    #[test]
    fn test_load_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("api.yaml");
        std::fs::write(&file, "openapi: 3.0.0\npaths: {}\n").unwrap();
        let source = Source::File {
            path: file,
            explicit: true,
        };
        let doc = source.load(Duration::from_secs(1)).unwrap();
        assert_eq!(doc.spec_version(), Some("3.0.0"));
    }
}
