use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use log::{error, info};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

const MEMORY_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    timestamp: f64,
    data: Value,
}

impl CacheEntry {
    fn is_fresh(&self, now: f64, ttl: Duration) -> bool {
        now - self.timestamp < ttl.as_secs_f64()
    }
}

/// Response cache: one JSON file per request, fronted by an in-memory LRU.
#[derive(Debug)]
pub struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
    memory: Mutex<LruCache<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> std::io::Result<Self> {
        let dir = dir.into();
        info!("Checking cache directory: {}", dir.display());
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            info!("Created cache directory: {}", dir.display());
        }

        let capacity = NonZeroUsize::new(MEMORY_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            dir,
            ttl,
            memory: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    /// Fresh cached data for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = unix_now();

        if let Ok(mut memory) = self.memory.lock() {
            let cached = memory
                .get(key)
                .map(|entry| (entry.is_fresh(now, self.ttl), entry.data.clone()));
            match cached {
                Some((true, data)) => return Some(data),
                Some((false, _)) => {
                    memory.pop(key);
                }
                None => {}
            }
        }

        let path = self.file_for(key);
        if !path.exists() {
            return None;
        }

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                error!("Error reading cache file {}: {}", path.display(), e);
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                error!("Corrupted cache file {}: {}. Deleting file.", path.display(), e);
                remove_quietly(&path);
                return None;
            }
        };

        if !entry.is_fresh(now, self.ttl) {
            info!("Cache expired for {}, fetching new data", key);
            remove_quietly(&path);
            return None;
        }

        info!("Using cached data for {}", key);
        let data = entry.data.clone();
        if let Ok(mut memory) = self.memory.lock() {
            memory.put(key.to_string(), entry);
        }
        Some(data)
    }

    /// Store `data` under `key`. Failures are logged, never returned.
    pub fn put(&self, key: &str, data: &Value) {
        let entry = CacheEntry {
            timestamp: unix_now(),
            data: data.clone(),
        };
        let path = self.file_for(key);

        match serde_json::to_string_pretty(&entry) {
            Ok(body) => match fs::write(&path, body) {
                Ok(()) => info!("Cached response for {} to {}", key, path.display()),
                Err(e) => error!("Failed to cache response for {}: {}", key, e),
            },
            Err(e) => error!("Failed to cache response for {}: {}", key, e),
        }

        if let Ok(mut memory) = self.memory.lock() {
            memory.put(key.to_string(), entry);
        }
    }

    /// Delete every cached response. Returns the number of files removed.
    pub fn clear(&self) -> usize {
        if let Ok(mut memory) = self.memory.lock() {
            memory.clear();
        }

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Failed to list cache directory {}: {}", self.dir.display(), e);
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.filter_map(|entry| entry.ok()) {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => error!("Failed to delete cache file {}: {}", path.display(), e),
            }
        }
        removed
    }
}

fn unix_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        error!("Failed to delete cache file {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_put_then_get_from_disk() {
        let dir = tempdir().unwrap();
        let cache = ResponseCache::new(dir.path(), Duration::from_secs(300)).unwrap();
        cache.put("https://mempool.space/api/v1/fees/recommended", &json!({"fastestFee": 12}));

        // a second instance has a cold memory layer and must hit the file
        let cold = ResponseCache::new(dir.path(), Duration::from_secs(300)).unwrap();
        let hit = cold.get("https://mempool.space/api/v1/fees/recommended");
        assert_eq!(hit, Some(json!({"fastestFee": 12})));
    }

    #[test]
    fn test_corrupted_file_is_deleted() {
        let dir = tempdir().unwrap();
        let cache = ResponseCache::new(dir.path(), Duration::from_secs(300)).unwrap();
        let path = cache.file_for("key");
        fs::write(&path, "{not json").unwrap();

        assert_eq!(cache.get("key"), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_expired_file_is_deleted() {
        let dir = tempdir().unwrap();
        let cache = ResponseCache::new(dir.path(), Duration::from_secs(300)).unwrap();
        let path = cache.file_for("key");
        let stale = json!({"timestamp": unix_now() - 301.0, "data": [1, 2, 3]});
        fs::write(&path, stale.to_string()).unwrap();

        assert_eq!(cache.get("key"), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_on_disk_format() {
        let dir = tempdir().unwrap();
        let cache = ResponseCache::new(dir.path(), Duration::from_secs(300)).unwrap();
        cache.put("key", &json!("plain text body"));

        let raw: Value = serde_json::from_str(&fs::read_to_string(cache.file_for("key")).unwrap()).unwrap();
        assert_eq!(raw["data"], json!("plain text body"));
        assert!(raw["timestamp"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_clear_only_removes_json_files() {
        let dir = tempdir().unwrap();
        let cache = ResponseCache::new(dir.path(), Duration::from_secs(300)).unwrap();
        cache.put("a", &json!(1));
        cache.put("b", &json!(2));
        fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        assert_eq!(cache.clear(), 2);
        assert_eq!(cache.get("a"), None);
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("cache").join("responses");
        let cache = ResponseCache::new(&nested, Duration::from_secs(300)).unwrap();
        assert!(cache.dir().is_dir());
    }
}
