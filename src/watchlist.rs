//! Watch-list persistence and merge
//!
//! The watch list is a JSON array of lowercase wallet addresses. Discovery
//! results are unioned into it; nothing but an explicit removal ever takes
//! an address out.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::AppResult;
use crate::models::normalize_address;

/// Result of a watch-list merge
#[derive(Debug, Clone)]
pub struct MergeResult {
    /// Addresses that were not on the list before
    pub added: Vec<String>,
    /// Size of the merged list
    pub total: usize,
    /// Timestamp of merge
    pub merged_at: DateTime<Utc>,
}

impl MergeResult {
    pub fn changed(&self) -> bool {
        !self.added.is_empty()
    }
}

/// Union `discovered` into `existing`.
///
/// Order is preserved: existing entries first, then new ones in discovery
/// order. Invalid addresses are dropped with a warning.
pub fn merge_watchlist(existing: &[String], discovered: &[String]) -> (Vec<String>, MergeResult) {
    let mut merged = normalize_list(existing);
    let mut added = Vec::new();

    for raw in discovered {
        let Some(address) = normalize_address(raw) else {
            warn!(address = %raw, "Ignoring invalid discovered address");
            continue;
        };
        if !merged.contains(&address) {
            merged.push(address.clone());
            added.push(address);
        }
    }

    let result = MergeResult {
        added,
        total: merged.len(),
        merged_at: Utc::now(),
    };
    (merged, result)
}

/// Lowercase, validate and de-duplicate, keeping first occurrences
pub fn normalize_list(addresses: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(addresses.len());
    for raw in addresses {
        match normalize_address(raw) {
            Some(address) if !out.contains(&address) => out.push(address),
            Some(_) => {}
            None => warn!(address = %raw, "Dropping invalid wallet address"),
        }
    }
    out
}

/// File-backed watch list
#[derive(Debug, Clone)]
pub struct WatchListStore {
    path: PathBuf,
}

impl WatchListStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the list; a missing or unreadable file yields an empty list
    pub fn load(&self) -> Vec<String> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "Watch list not found, starting empty");
                return Vec::new();
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read watch list, starting empty"
                );
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(addresses) => normalize_list(&addresses),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Corrupt watch list, starting empty"
                );
                Vec::new()
            }
        }
    }

    /// Persist the list atomically (temp file, then rename)
    pub fn save(&self, addresses: &[String]) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let body = serde_json::to_string_pretty(addresses)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &self.path)?;

        info!(path = %self.path.display(), wallets = addresses.len(), "Saved watch list");
        Ok(())
    }
}
