use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{RepoDigestError, Result};

/// Key-value store with per-entry expiry, keyed by repository source.
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
}

#[derive(Debug)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// Process-local cache; entries vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<BTreeMap<String, MemoryEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, MemoryEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries();
        match entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.entries().insert(
            key.to_string(),
            MemoryEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    value: String,
    expires_at_unix: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredCache {
    entries: BTreeMap<String, StoredEntry>,
}

/// Cache persisted as a JSON document so results survive between runs.
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<StoredCache> {
        if !self.path.exists() {
            return Ok(StoredCache::default());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            RepoDigestError::io(format!("reading cache '{}'", self.path.display()), e)
        })?;

        match serde_json::from_str(&content) {
            Ok(stored) => Ok(stored),
            Err(err) => {
                warn!(cache_path = %self.path.display(), error = %err, "cache file is corrupt; starting empty");
                Ok(StoredCache::default())
            }
        }
    }

    fn save(&self, stored: &StoredCache) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                RepoDigestError::io(format!("creating cache directory '{}'", parent.display()), e)
            })?;
        }

        let content = serde_json::to_string_pretty(stored)
            .map_err(|e| RepoDigestError::Cache(format!("serializing cache: {e}")))?;
        fs::write(&self.path, content).map_err(|e| {
            RepoDigestError::io(format!("writing cache '{}'", self.path.display()), e)
        })
    }
}

impl ResultCache for FileCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut stored = self.load()?;
        let now = unix_now();

        match stored.entries.get(key) {
            Some(entry) if now < entry.expires_at_unix => Ok(Some(entry.value.clone())),
            Some(_) => {
                debug!(cache_key = key, "cache_entry_expired");
                stored.entries.retain(|_, entry| now < entry.expires_at_unix);
                self.save(&stored)?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut stored = self.load()?;
        let now = unix_now();
        stored.entries.retain(|_, entry| now < entry.expires_at_unix);
        stored.entries.insert(
            key.to_string(),
            StoredEntry {
                value,
                expires_at_unix: now.saturating_add(ttl.as_secs()),
            },
        );
        self.save(&stored)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
