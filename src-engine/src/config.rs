// Environment configuration for the engine
// Resolves the data directory, the remote store endpoint and timing knobs

use std::path::PathBuf;
use std::time::Duration;

use crate::breathing::DEFAULT_TICK;
use crate::mood::history::DEFAULT_REMOTE_TIMEOUT;

/// Hosted table endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory for persistent state (storage.json, local tables)
    pub data_dir: PathBuf,
    /// Hosted store; `None` means the local file store is used
    pub remote: Option<RemoteConfig>,
    /// Bound on any single remote read or write
    pub remote_timeout: Duration,
    /// Breathing timer cadence
    pub tick_interval: Duration,
}

impl Config {
    /// Create configuration using default paths and no hosted store
    pub fn default_paths() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
            remote: None,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            tick_interval: DEFAULT_TICK,
        }
    }

    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default_paths();

        if let Some(dir) = lookup("MINDHUB_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }

        // Both halves are needed to talk to the hosted store
        match (lookup("MINDHUB_REMOTE_URL"), lookup("MINDHUB_REMOTE_KEY")) {
            (Some(url), Some(api_key)) if !url.trim().is_empty() => {
                config.remote = Some(RemoteConfig {
                    url: url.trim().to_string(),
                    api_key,
                });
            }
            (Some(_), None) => {
                tracing::warn!("MINDHUB_REMOTE_URL is set without MINDHUB_REMOTE_KEY; using local store");
            }
            _ => {}
        }

        if let Some(timeout) = millis_var(&lookup, "MINDHUB_REMOTE_TIMEOUT_MS") {
            config.remote_timeout = timeout;
        }
        if let Some(tick) = millis_var(&lookup, "MINDHUB_TICK_MS") {
            config.tick_interval = tick;
        }

        config
    }

    /// Get the default data directory
    fn default_data_dir() -> PathBuf {
        // All platforms: ~/.mindhub/ (or /tmp/mindhub if home unavailable)
        dirs::home_dir()
            .map(|h| h.join(".mindhub"))
            .unwrap_or_else(|| PathBuf::from("/tmp/mindhub"))
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    /// Key-value storage file (holds the session id)
    pub fn storage_file(&self) -> PathBuf {
        self.data_dir.join("storage.json")
    }

    /// Ensure the data directory exists, private to the user on Unix
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.data_dir, std::fs::Permissions::from_mode(0o700))?;
        }

        Ok(())
    }
}

/// Positive millisecond duration from a variable; invalid values are ignored
fn millis_var(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<Duration> {
    let raw = lookup(name)?;
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => {
            tracing::warn!(variable = name, value = %raw, "ignoring invalid duration");
            None
        }
    }
}
