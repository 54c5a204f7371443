//! Local Snapshot Cache
//!
//! A small durable cache keyed by editing context, read synchronously during
//! hydration so the last known graph can render before the backend answers.
//! Unreadable entries are reported as [`CacheRead::Corrupt`] so the caller can
//! discard them and carry on as if nothing was cached.

use crate::config::EditorConfig;
use crate::models::GraphSnapshot;
use crate::persistence::{CacheError, HydrationError};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Result of reading one cache entry
#[derive(Debug, Clone, PartialEq)]
pub enum CacheRead {
    Hit(GraphSnapshot),
    /// Definitive miss: nothing was ever cached for the key
    Miss,
    Corrupt(HydrationError),
}

pub trait SnapshotCache: Send + Sync {
    fn read(&self, key: &str) -> CacheRead;

    fn write(&self, key: &str, snapshot: &GraphSnapshot) -> Result<(), CacheError>;

    /// Drop an entry; removing a missing entry is not an error
    fn remove(&self, key: &str) -> Result<(), CacheError>;
}

/// One JSON file per context key under a cache directory
#[derive(Debug, Clone)]
pub struct FileSnapshotCache {
    dir: PathBuf,
}

impl FileSnapshotCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache under the configured directory, created if missing
    pub fn from_config(config: &EditorConfig) -> Result<Self, CacheError> {
        let dir = config.resolve_cache_dir()?;
        fs::create_dir_all(&dir)?;
        tracing::info!("Graph snapshot cache at {}", dir.display());
        Ok(Self::new(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing a context key
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }
}

impl SnapshotCache for FileSnapshotCache {
    fn read(&self, key: &str) -> CacheRead {
        let path = self.path_for(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return CacheRead::Miss,
            Err(e) => {
                return CacheRead::Corrupt(HydrationError::corrupt_cache(key, e.to_string()));
            }
        };

        match GraphSnapshot::from_json_str(&raw) {
            Ok(snapshot) => CacheRead::Hit(snapshot),
            Err(e) => CacheRead::Corrupt(e),
        }
    }

    /// Atomic write: temp file, then rename over the entry
    fn write(&self, key: &str, snapshot: &GraphSnapshot) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for(key);
        let temp = path.with_extension("json.tmp");
        let serialized = serde_json::to_string(snapshot)?;

        fs::write(&temp, serialized)?;
        fs::rename(&temp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process cache holding serialized entries
#[derive(Debug, Default)]
pub struct MemorySnapshotCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw text under a key, bypassing serialization
    pub fn insert_raw(&self, key: &str, raw: impl Into<String>) -> Result<(), CacheError> {
        self.entries
            .lock()
            .map_err(|_| CacheError::LockPoisoned)?
            .insert(key.to_string(), raw.into());
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }
}

impl SnapshotCache for MemorySnapshotCache {
    fn read(&self, key: &str) -> CacheRead {
        let entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(_) => {
                return CacheRead::Corrupt(HydrationError::corrupt_cache(key, "cache lock poisoned"))
            }
        };

        match entries.get(key) {
            None => CacheRead::Miss,
            Some(raw) => match GraphSnapshot::from_json_str(raw) {
                Ok(snapshot) => CacheRead::Hit(snapshot),
                Err(e) => CacheRead::Corrupt(e),
            },
        }
    }

    fn write(&self, key: &str, snapshot: &GraphSnapshot) -> Result<(), CacheError> {
        let serialized = serde_json::to_string(snapshot)?;
        self.insert_raw(key, serialized)
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries
            .lock()
            .map_err(|_| CacheError::LockPoisoned)?
            .remove(key);
        Ok(())
    }
}

/// Make a context key safe to use as a file name
fn sanitize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '<' | '>' | '|' | '"' | ' ' => '-',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Node, NodeKind, Position};
    use chrono::Utc;
    use serde_json::json;
    use tempfile::TempDir;

    fn snapshot() -> GraphSnapshot {
        let mut snapshot = GraphSnapshot::empty(Utc::now());
        snapshot.nodes.push(Node::new(
            NodeKind::Model,
            Position::new(1.0, 2.0),
            json!({"title": "Model"}),
        ));
        snapshot
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("graph:model/42"), "graph-model-42");
        assert_eq!(sanitize_key("a\u{0007}b"), "ab");
    }

    #[test]
    fn test_file_cache_write_then_read() {
        let dir = TempDir::new().unwrap();
        let cache = FileSnapshotCache::new(dir.path().join("cache"));
        let snapshot = snapshot();

        assert_eq!(cache.read("graph:m1"), CacheRead::Miss);

        cache.write("graph:m1", &snapshot).unwrap();
        assert_eq!(cache.read("graph:m1"), CacheRead::Hit(snapshot));
        assert!(!cache.path_for("graph:m1").with_extension("json.tmp").exists());

        cache.remove("graph:m1").unwrap();
        cache.remove("graph:m1").unwrap();
        assert_eq!(cache.read("graph:m1"), CacheRead::Miss);
    }

    #[test]
    fn test_file_cache_from_config_creates_directory() {
        let dir = TempDir::new().unwrap();
        let config = EditorConfig {
            cache_dir: Some(dir.path().join("nested").join("graph-cache")),
            ..EditorConfig::default()
        };

        let cache = FileSnapshotCache::from_config(&config).unwrap();
        assert_eq!(cache.dir(), dir.path().join("nested").join("graph-cache"));
        assert!(cache.dir().is_dir());
    }

    #[test]
    fn test_file_cache_corrupt_entry() {
        let dir = TempDir::new().unwrap();
        let cache = FileSnapshotCache::new(dir.path());
        fs::write(cache.path_for("graph:m1"), "{ not json").unwrap();

        assert!(matches!(
            cache.read("graph:m1"),
            CacheRead::Corrupt(HydrationError::Parse(_))
        ));
    }

    #[test]
    fn test_memory_cache_reports_newer_schema_as_corrupt() {
        let cache = MemorySnapshotCache::new();
        cache
            .insert_raw(
                "graph:m1",
                r#"{"nodes":[],"edges":[],"schemaVersion":99,"updatedAt":"2024-01-01T00:00:00Z"}"#,
            )
            .unwrap();

        assert_eq!(
            cache.read("graph:m1"),
            CacheRead::Corrupt(HydrationError::UnsupportedSchemaVersion {
                found: 99,
                supported: 1
            })
        );
    }
}
