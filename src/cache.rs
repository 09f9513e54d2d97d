//! Permalink cache for audit results.
//!
//! Stored reports are kept in memory and mirrored to one JSON file per id
//! under the user cache directory (e.g. ~/.cache/oasregex/results/), so
//! `oasregex show <ID>` works from a later process. Entries expire after a
//! TTL; beyond the entry limit the oldest entry is evicted.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::detect::AuditReport;
use crate::error::{AuditError, Result};

/// Default time-to-live for stored results.
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// Default maximum number of stored results.
pub const DEFAULT_MAX_ENTRIES: usize = 500;

static ID_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Orders stores within one process; timestamps only have second resolution.
static STORE_SEQ: AtomicU64 = AtomicU64::new(0);

/// In-memory + file-based store of audit reports.
pub struct ResultsCache {
    memory: RwLock<HashMap<String, CacheEntry>>,
    /// Directory for the file mirror; `None` keeps results in memory only
    cache_dir: Option<PathBuf>,
    ttl_secs: u64,
    max_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    report: AuditReport,
    stored_at: u64, // Unix timestamp in seconds
    #[serde(default)]
    seq: u64,
}

impl ResultsCache {
    /// Create a cache mirrored under the user cache directory.
    pub fn new(ttl_secs: u64, max_entries: usize) -> Self {
        let cache_dir =
            ProjectDirs::from("", "", "oasregex").map(|dirs| dirs.cache_dir().join("results"));
        Self::with_dir(cache_dir, ttl_secs, max_entries)
    }

    /// Create a cache mirrored under `dir`, or memory-only for `None`.
    pub fn with_dir(dir: Option<PathBuf>, ttl_secs: u64, max_entries: usize) -> Self {
        if let Some(ref dir) = dir {
            if let Err(e) = fs::create_dir_all(dir) {
                warn!(dir = %dir.display(), error = %e, "cache directory unavailable");
            }
        }

        Self {
            memory: RwLock::new(HashMap::new()),
            cache_dir: dir,
            ttl_secs,
            max_entries: max_entries.max(1),
        }
    }

    /// Store a report under a freshly minted id.
    pub fn insert(&self, report: &AuditReport) -> Result<String> {
        let id = mint_id();
        self.store(&id, report)?;
        Ok(id)
    }

    /// Store a copy of `report` under `id`, returning the stored copy.
    /// A later store under the same id replaces the earlier one.
    pub fn store(&self, id: &str, report: &AuditReport) -> Result<AuditReport> {
        validate_id(id)?;
        let entry = CacheEntry {
            report: report.clone(),
            stored_at: current_timestamp(),
            seq: STORE_SEQ.fetch_add(1, Ordering::Relaxed),
        };

        {
            let mut cache = self
                .memory
                .write()
                .map_err(|_| AuditError::Cache("cache lock poisoned".to_string()))?;
            cache.insert(id.to_string(), entry.clone());
            while cache.len() > self.max_entries {
                let Some(oldest) = oldest_key(&cache) else {
                    break;
                };
                cache.remove(&oldest);
                self.remove_file(&oldest);
                debug!(id = %oldest, "evicted oldest cached result");
            }
        }

        self.write_file(id, &entry)?;
        if let Some(dir) = &self.cache_dir {
            self.prune_dir(dir);
        }
        Ok(entry.report)
    }

    /// Get a stored report if it exists and has not expired.
    pub fn get(&self, id: &str) -> Option<AuditReport> {
        validate_id(id).ok()?;
        let now = current_timestamp();

        {
            let cache = self.memory.read().ok()?;
            if let Some(entry) = cache.get(id) {
                if self.is_fresh(entry, now) {
                    return Some(entry.report.clone());
                }
            }
        }

        let entry = self.read_file(id)?;
        if !self.is_fresh(&entry, now) {
            self.remove(id);
            return None;
        }

        // Promote to memory
        if let Ok(mut cache) = self.memory.write() {
            cache.insert(id.to_string(), entry.clone());
        }
        Some(entry.report)
    }

    /// Drop a stored report.
    pub fn remove(&self, id: &str) {
        if let Ok(mut cache) = self.memory.write() {
            cache.remove(id);
        }
        self.remove_file(id);
    }

    /// Number of entries held in memory.
    pub fn len(&self) -> usize {
        self.memory.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_fresh(&self, entry: &CacheEntry, now: u64) -> bool {
        now.saturating_sub(entry.stored_at) < self.ttl_secs
    }

    fn read_file(&self, id: &str) -> Option<CacheEntry> {
        let path = self.cache_file_path(id)?;
        let content = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(id, error = %e, "discarding unreadable cached result");
                None
            }
        }
    }

    fn write_file(&self, id: &str, entry: &CacheEntry) -> Result<()> {
        let Some(path) = self.cache_file_path(id) else {
            return Ok(());
        };
        let content =
            serde_json::to_string(entry).map_err(|e| AuditError::Cache(e.to_string()))?;
        fs::write(&path, content)?;
        Ok(())
    }

    fn remove_file(&self, id: &str) {
        if let Some(path) = self.cache_file_path(id) {
            let _ = fs::remove_file(path);
        }
    }

    /// Keep the on-disk mirror within `max_entries` by modification time.
    fn prune_dir(&self, dir: &Path) {
        let Ok(read) = fs::read_dir(dir) else {
            return;
        };
        let mut files: Vec<(SystemTime, PathBuf)> = read
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
            .filter_map(|p| {
                let modified = fs::metadata(&p).and_then(|m| m.modified()).ok()?;
                Some((modified, p))
            })
            .collect();

        if files.len() <= self.max_entries {
            return;
        }
        files.sort();
        let excess = files.len() - self.max_entries;
        for (_, path) in files.into_iter().take(excess) {
            let _ = fs::remove_file(path);
        }
    }

    fn cache_file_path(&self, id: &str) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", id)))
    }
}

fn oldest_key(cache: &HashMap<String, CacheEntry>) -> Option<String> {
    cache
        .iter()
        .min_by_key(|(_, entry)| (entry.stored_at, entry.seq))
        .map(|(k, _)| k.clone())
}

/// Ids double as file names, so only short alphanumeric ids are accepted.
fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > 64 || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AuditError::Cache(format!("invalid result id {:?}", id)));
    }
    Ok(())
}

/// Eight lower-case hex characters from the clock and a process counter.
pub fn mint_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos() as u64;
    let count = ID_COUNTER.fetch_add(1, Ordering::Relaxed) as u64;
    let mixed = (nanos ^ count.wrapping_mul(0x9E37_79B9_7F4A_7C15)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    format!("{:08x}", (mixed >> 32) as u32)
}

/// Get current Unix timestamp in seconds.
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}
