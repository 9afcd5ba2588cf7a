//! Read-only startup snapshot.
//!
//! # Design Decisions
//! - The snapshot is written only by the build pass, never at runtime
//! - A snapshot that is absent, unreadable, or built from a different
//!   configuration is ignored; every value can be recomputed directly
//! - Entries live for the process lifetime and are never invalidated

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Snapshot format version; bumped on incompatible layout changes.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Entry key: deduced environment name.
pub const KEY_ENVIRONMENT: &str = "environment";
/// Entry key: resolved JWKS endpoint, saving the discovery round trip.
pub const KEY_JWKS_URI: &str = "jwks_uri";

/// A precomputed map of startup values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,

    /// Fingerprint of the configuration the snapshot was built from. A
    /// mismatch means the snapshot describes a different deployment and
    /// must not be trusted.
    pub config_fingerprint: String,

    pub entries: BTreeMap<String, String>,
}

impl Snapshot {
    pub fn new(config_fingerprint: String) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            config_fingerprint,
            entries: BTreeMap::new(),
        }
    }

    /// Look up a precomputed value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Record a value. Build-pass only.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Load a snapshot from disk if it exists and matches the given config
    /// fingerprint. Any failure degrades to `None`; startup then recomputes.
    pub fn load(path: &Path, config_fingerprint: &str) -> Option<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No startup snapshot present");
            return None;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unreadable startup snapshot, recomputing");
                return None;
            }
        };

        let snapshot: Snapshot = match serde_json::from_str(&content) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unparsable startup snapshot, recomputing");
                return None;
            }
        };

        if snapshot.version != SNAPSHOT_VERSION {
            tracing::warn!(
                version = snapshot.version,
                "Startup snapshot version mismatch, recomputing"
            );
            return None;
        }

        if snapshot.config_fingerprint != config_fingerprint {
            tracing::warn!("Startup snapshot built from a different configuration, recomputing");
            return None;
        }

        tracing::info!(
            path = %path.display(),
            entries = snapshot.entries.len(),
            "Startup snapshot loaded"
        );
        Some(snapshot)
    }

    /// Write the snapshot to disk. Build-pass only.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::info!(path = %path.display(), entries = self.entries.len(), "Startup snapshot written");
        Ok(())
    }
}
