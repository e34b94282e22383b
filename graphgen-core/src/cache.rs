//! # Result cache
//!
//! Host-owned key-value cache for oracle results. The session memoises
//! explanation text here; nothing in the core reads it implicitly.

use crate::error::{self, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Cache backend trait
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<serde_json::Value>;
    fn set(&mut self, key: &str, value: serde_json::Value) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
    fn contains(&self, key: &str) -> bool;
    fn keys(&self) -> Vec<String>;
    fn clear(&mut self) -> Result<()>;
}

/// In-memory cache, dropped with the process
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryCache {
    data: HashMap<String, serde_json::Value>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: serde_json::Value) -> Result<()> {
        self.data.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.data.remove(key);
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    fn clear(&mut self) -> Result<()> {
        self.data.clear();
        Ok(())
    }
}

/// One file on disk: the original key travels with the value
#[derive(Debug, Serialize, Deserialize)]
struct FileEntry {
    key: String,
    value: serde_json::Value,
}

/// File-based cache, one JSON file per key
pub struct FileCache {
    base_path: PathBuf,
}

impl FileCache {
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path).map_err(|e| {
            error::cache_failed(format!("Failed to create cache dir: {}", e))
                .with_context("path", base_path.display().to_string())
        })?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    // Keys are free text (whole questions), so file names are a stable hash
    fn key_to_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{:016x}.json", fnv1a(key.as_bytes())))
    }

    fn entries(&self) -> Vec<(PathBuf, FileEntry)> {
        let Ok(dir) = std::fs::read_dir(&self.base_path) else {
            return Vec::new();
        };
        dir.filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|path| path.extension().map(|ext| ext == "json").unwrap_or(false))
            .filter_map(|path| {
                let content = std::fs::read_to_string(&path).ok()?;
                let entry = serde_json::from_str::<FileEntry>(&content).ok()?;
                Some((path, entry))
            })
            .collect()
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

impl CacheBackend for FileCache {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        let path = self.key_to_path(key);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<FileEntry>(&content) {
            Ok(entry) if entry.key == key => Some(entry.value),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: serde_json::Value) -> Result<()> {
        let path = self.key_to_path(key);
        let entry = FileEntry {
            key: key.to_string(),
            value,
        };
        let content = serde_json::to_string_pretty(&entry)
            .map_err(|e| error::serialization_error(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| {
            error::cache_failed(format!("Failed to write {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.key_to_path(key);
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| {
                error::cache_failed(format!("Failed to delete {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn keys(&self) -> Vec<String> {
        self.entries().into_iter().map(|(_, entry)| entry.key).collect()
    }

    fn clear(&mut self) -> Result<()> {
        for (path, _) in self.entries() {
            std::fs::remove_file(&path).map_err(|e| {
                error::cache_failed(format!("Failed to delete {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }
}

/// High-level cache handle owned by a session
pub struct ResultCache {
    backend: Box<dyn CacheBackend>,
    /// Namespace prefix for keys
    namespace: Option<String>,
}

impl ResultCache {
    /// Create a cache with the in-memory backend
    pub fn memory() -> Self {
        Self::with_backend(MemoryCache::new())
    }

    /// Create a cache with the file backend
    pub fn file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::with_backend(FileCache::new(path)?))
    }

    pub fn with_backend(backend: impl CacheBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            namespace: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    fn full_key(&self, key: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{}:{}", ns, key),
            None => key.to_string(),
        }
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.backend.get(&self.full_key(key))
    }

    /// Get a typed value; entries of the wrong shape read as missing
    pub fn get_typed<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| serde_json::from_value(v).ok())
    }

    pub fn set(&mut self, key: &str, value: serde_json::Value) -> Result<()> {
        let full_key = self.full_key(key);
        self.backend.set(&full_key, value)
    }

    pub fn set_typed<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_value(value)
            .map_err(|e| error::serialization_error(e.to_string()))?;
        self.set(key, json)
    }

    pub fn remove(&mut self, key: &str) -> Result<()> {
        let full_key = self.full_key(key);
        self.backend.remove(&full_key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.backend.contains(&self.full_key(key))
    }

    /// Keys in this namespace, without the prefix
    pub fn keys(&self) -> Vec<String> {
        let prefix = self.namespace.as_ref().map(|ns| format!("{}:", ns));
        self.backend
            .keys()
            .into_iter()
            .filter_map(|k| match prefix {
                Some(ref p) => k.strip_prefix(p).map(|s| s.to_string()),
                None => Some(k),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry in the backend
    pub fn clear(&mut self) -> Result<()> {
        self.backend.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_cache() {
        let mut cache = ResultCache::memory();

        cache.set("key1", json!("value1")).unwrap();
        cache.set("key2", json!(42)).unwrap();

        assert_eq!(cache.get("key1"), Some(json!("value1")));
        assert_eq!(cache.get("key2"), Some(json!(42)));
        assert_eq!(cache.get("key3"), None);

        cache.remove("key1").unwrap();
        assert_eq!(cache.get("key1"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_namespace() {
        let mut cache = ResultCache::memory().with_namespace("explain");
        cache.set("plot y = x", json!("draw a line")).unwrap();

        assert_eq!(cache.get("plot y = x"), Some(json!("draw a line")));
        assert_eq!(cache.keys(), vec!["plot y = x".to_string()]);
    }

    #[test]
    fn test_typed_values() {
        let mut cache = ResultCache::memory();
        cache.set_typed("answer", &"Plot x on the horizontal axis".to_string()).unwrap();

        let text: Option<String> = cache.get_typed("answer");
        assert_eq!(text.as_deref(), Some("Plot x on the horizontal axis"));
        assert_eq!(cache.get_typed::<u32>("answer"), None);
    }

    #[test]
    fn test_file_cache_persists_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let question = "How do I plot points (1,2), (3,4)?";

        {
            let mut cache = ResultCache::file(dir.path()).unwrap();
            cache.set_typed(question, &"Mark each point".to_string()).unwrap();
        }

        let mut cache = ResultCache::file(dir.path()).unwrap();
        assert!(cache.contains(question));
        assert_eq!(cache.keys(), vec![question.to_string()]);
        assert_eq!(cache.get_typed::<String>(question).as_deref(), Some("Mark each point"));

        cache.clear().unwrap();
        assert!(cache.is_empty());
        assert!(!cache.contains(question));
    }

    #[test]
    fn test_file_cache_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep me").unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();

        let mut cache = FileCache::new(dir.path()).unwrap();
        cache.set("k", json!(1)).unwrap();
        assert_eq!(cache.keys(), vec!["k".to_string()]);

        cache.clear().unwrap();
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_fnv_is_stable() {
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_ne!(fnv1a(b"a"), fnv1a(b"b"));
    }
}
