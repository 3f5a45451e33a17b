use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use eyre::{Context, Result};
use tracing::{debug, warn};

/// A string key-value store shared by the caches.
///
/// Reads never fail: a missing or unreadable value is reported as `None`.
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete the value stored under `key`, if any.
    fn remove(&self, key: &str) -> Result<()>;
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory storage, used in tests and for ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.entries).insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// Storage persisted as a single JSON object on disk.
///
/// Every write rewrites the whole file through a temporary sibling and a rename.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open the store at `path`. A missing or malformed file starts an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(path = %path.display(), err = %e, "Ignoring malformed storage file");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e)
                    .wrap_err_with(|| format!("failed to read storage file {}", path.display()));
            }
        };
        debug!(path = %path.display(), keys = entries.len(), "Opened storage file");
        Ok(Self { path, entries: Mutex::new(entries) })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let text = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, text)
            .wrap_err_with(|| format!("failed to write storage file {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .wrap_err_with(|| format!("failed to replace storage file {}", self.path.display()))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = lock(&self.entries);
        entries.insert(key.to_owned(), value.to_owned());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = lock(&self.entries);
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}
