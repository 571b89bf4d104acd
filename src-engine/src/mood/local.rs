//! File-backed table store
//!
//! Each table is one JSON array under `<data_dir>/tables/<table>.json`:
//! - Rewrites go through temp file + fsync + rename, so readers never see a
//!   partial table
//! - A sibling `<table>.lock` file serialises writers (fs2 advisory locks)
//! - Strict permissions on Unix (0700 dir, 0600 files)
//! - If the directory cannot be created the store reports itself unavailable

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde_json::Value;

use super::remote::{apply_select, with_row_id, RemoteError, RemoteStore, Select, Table};

#[derive(Debug, Clone)]
pub struct LocalStore {
    /// `<data_dir>/tables`
    base_dir: PathBuf,
    available: bool,
}

impl LocalStore {
    pub fn new(data_dir: &Path) -> Self {
        let base_dir = data_dir.join("tables");
        let available = ensure_base_dir(&base_dir);
        Self {
            base_dir,
            available,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn table_path(&self, table: Table) -> PathBuf {
        self.base_dir.join(format!("{}.json", table.as_str()))
    }

    fn check_available(&self) -> Result<(), RemoteError> {
        if self.available {
            Ok(())
        } else {
            Err(RemoteError::Unavailable(format!(
                "table directory {} could not be created",
                self.base_dir.display()
            )))
        }
    }
}

fn ensure_base_dir(dir: &Path) -> bool {
    match fs::create_dir_all(dir) {
        Ok(()) => {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Err(e) = fs::set_permissions(dir, fs::Permissions::from_mode(0o700)) {
                    tracing::warn!(dir = %dir.display(), error = %e, "failed to restrict table directory");
                    return false;
                }
            }
            true
        }
        Err(e) => {
            tracing::error!(dir = %dir.display(), error = %e, "failed to create table directory");
            false
        }
    }
}

fn open_lock(table_path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(table_path.with_extension("lock"))
}

fn read_rows(path: &Path) -> Result<Vec<Value>, RemoteError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&contents)?)
}

fn write_rows(path: &Path, rows: &[Value]) -> Result<(), RemoteError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("table.json");
    let temp_path = path.with_file_name(format!(".{}.tmp.{}", file_name, std::process::id()));

    let json = serde_json::to_string_pretty(rows)?;
    let mut file = File::create(&temp_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, path)?;
    Ok(())
}

fn insert_blocking(path: &Path, record: Value) -> Result<Value, RemoteError> {
    let lock = open_lock(path)?;
    lock.lock_exclusive()?;

    let mut rows = read_rows(path)?;
    let row = with_row_id(record);
    rows.push(row.clone());
    write_rows(path, &rows)?;

    // Lock is released when `lock` is dropped
    Ok(row)
}

fn select_blocking(path: &Path, query: &Select) -> Result<Vec<Value>, RemoteError> {
    let lock = open_lock(path)?;
    FileExt::lock_shared(&lock)?;
    let rows = read_rows(path)?;
    Ok(apply_select(rows, query))
}

fn join_error(e: tokio::task::JoinError) -> RemoteError {
    RemoteError::Unavailable(format!("file store task failed: {}", e))
}

impl RemoteStore for LocalStore {
    async fn insert(&self, table: Table, record: Value) -> Result<Value, RemoteError> {
        self.check_available()?;
        let path = self.table_path(table);
        tokio::task::spawn_blocking(move || insert_blocking(&path, record))
            .await
            .map_err(join_error)?
    }

    async fn select(&self, query: &Select) -> Result<Vec<Value>, RemoteError> {
        self.check_available()?;
        let path = self.table_path(query.table);
        let query = query.clone();
        tokio::task::spawn_blocking(move || select_blocking(&path, &query))
            .await
            .map_err(join_error)?
    }
}
