//! Key-value persistence backends for client-local state
//!
//! The file backend keeps every key in one JSON object at
//! `<data_dir>/storage.json`, guarded by an exclusive fs2 lock on a sibling
//! lock file and rewritten with write-to-temp + rename.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Minimal get/set storage, modelled on browser local storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Return the stored value, storing `value` first if the key is absent
    fn get_or_insert(&self, key: &str, value: &str) -> Result<String> {
        self.get_or_replace(key, value, &|_| false)
    }

    /// Like `get_or_insert`, but a stored value for which `stale` returns
    /// true is overwritten as if it were absent.
    ///
    /// Backends shared between processes override this to make the
    /// read-and-create a single atomic step.
    fn get_or_replace(&self, key: &str, value: &str, stale: &dyn Fn(&str) -> bool) -> Result<String> {
        if let Some(existing) = self.get(key)? {
            if !stale(&existing) {
                return Ok(existing);
            }
        }
        self.set(key, value)?;
        Ok(value.to_string())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn get_or_insert(&self, key: &str, value: &str) -> Result<String> {
        (**self).get_or_insert(key, value)
    }

    fn get_or_replace(&self, key: &str, value: &str, stale: &dyn Fn(&str) -> bool) -> Result<String> {
        (**self).get_or_replace(key, value, stale)
    }
}

/// In-process storage for tests and ephemeral runs
#[derive(Debug, Default)]
pub struct MemoryKv {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|e| anyhow::anyhow!("memory storage poisoned: {}", e))
    }

    /// Drop every key, as if the user cleared site data
    pub fn clear(&self) -> Result<()> {
        self.values()?.clear();
        Ok(())
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_or_replace(&self, key: &str, value: &str, stale: &dyn Fn(&str) -> bool) -> Result<String> {
        let mut values = self.values()?;
        if let Some(existing) = values.get(key).filter(|v| !stale(v.as_str())) {
            return Ok(existing.clone());
        }
        values.insert(key.to_string(), value.to_string());
        Ok(value.to_string())
    }
}

/// Durable storage in a JSON file
#[derive(Debug, Clone)]
pub struct FileKv {
    path: PathBuf,
}

impl FileKv {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read storage file: {}", self.path.display()))?;

        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse storage file: {}", self.path.display()))
    }

    fn save(&self, values: &HashMap<String, String>) -> Result<()> {
        let contents =
            serde_json::to_string_pretty(values).context("Failed to serialize storage")?;
        atomic_write(&self.path, &contents)
    }

    /// Run `f` on the stored map while holding the exclusive lock
    fn with_lock<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create storage directory: {}", parent.display())
            })?;
        }

        let lock_path = self.path.with_extension("lock");
        let lock = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;

        lock.lock_exclusive()
            .context("Failed to acquire exclusive lock on storage file")?;

        // Lock is released when `lock` is dropped
        f(self)
    }
}

impl KeyValueStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_lock(|store| {
            let mut values = store.load()?;
            values.insert(key.to_string(), value.to_string());
            store.save(&values)
        })
    }

    fn get_or_replace(&self, key: &str, value: &str, stale: &dyn Fn(&str) -> bool) -> Result<String> {
        self.with_lock(|store| {
            let mut values = store.load()?;
            if let Some(existing) = values.get(key).filter(|v| !stale(v.as_str())) {
                return Ok(existing.clone());
            }
            values.insert(key.to_string(), value.to_string());
            store.save(&values)?;
            Ok(value.to_string())
        })
    }
}

/// Atomically replace a file using write-to-temp + rename
pub fn atomic_write(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("Invalid path: {}", path.display()))?;

    // Temp file in the same directory so the rename stays on one filesystem
    let temp_path = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown"),
        std::process::id()
    ));

    fs::write(&temp_path, contents)
        .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;

    fs::rename(&temp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_get_or_insert_keeps_first_value() {
        let kv = MemoryKv::new();
        assert_eq!(kv.get_or_insert("k", "first").unwrap(), "first");
        assert_eq!(kv.get_or_insert("k", "second").unwrap(), "first");

        kv.clear().unwrap();
        assert_eq!(kv.get("k").unwrap(), None);
    }

    #[test]
    fn test_file_roundtrip_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storage.json");

        FileKv::new(&path).set("theme", "rain").unwrap();
        FileKv::new(&path).set("volume", "3").unwrap();

        let reopened = FileKv::new(&path);
        assert_eq!(reopened.get("theme").unwrap().as_deref(), Some("rain"));
        assert_eq!(reopened.get("volume").unwrap().as_deref(), Some("3"));
        assert_eq!(reopened.get("missing").unwrap(), None);
    }

    #[test]
    fn test_file_get_or_insert_is_create_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/storage.json");

        let first = FileKv::new(&path).get_or_insert("k", "one").unwrap();
        let second = FileKv::new(&path).get_or_insert("k", "two").unwrap();
        assert_eq!(first, "one");
        assert_eq!(second, "one");
    }

    #[test]
    fn test_get_or_replace_overwrites_stale_value_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storage.json");
        FileKv::new(&path).set("k", "").unwrap();

        let blank = |v: &str| v.is_empty();
        let first = FileKv::new(&path).get_or_replace("k", "one", &blank).unwrap();
        let second = FileKv::new(&path).get_or_replace("k", "two", &blank).unwrap();
        assert_eq!(first, "one");
        assert_eq!(second, "one");

        let kv = MemoryKv::new();
        kv.set("k", "").unwrap();
        assert_eq!(kv.get_or_replace("k", "one", &blank).unwrap(), "one");
        assert_eq!(kv.get_or_insert("k", "two").unwrap(), "one");
    }

    #[test]
    fn test_file_unparseable_storage_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storage.json");
        fs::write(&path, "[1, 2").unwrap();

        let err = FileKv::new(&path).get("k").unwrap_err();
        assert!(err.to_string().contains("Failed to parse storage file"));
    }

    #[test]
    fn test_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storage.json");

        atomic_write(&path, "{\"a\": \"b\"}").unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "{\"a\": \"b\"}");
    }
}
