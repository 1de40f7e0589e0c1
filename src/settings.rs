use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;

/// Shared detection configuration. Persists across page lifetimes; writes
/// are whole-value replacements with no merge semantics, so the last writer
/// wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "backendUrl", default = "default_backend_url")]
    pub backend_url: String,
    #[serde(rename = "pollIntervalMs", default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(rename = "isDetecting", default)]
    pub is_detecting: bool,
}

impl Settings {
    /// Polling interval as a duration. Clamped to at least one millisecond;
    /// a zero interval would make the polling timer spin.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            is_detecting: false,
        }
    }
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Host-provided persistent store for [`Settings`].
pub trait SettingsStore: Send + Sync {
    /// Loads the persisted settings, seeding defaults when none exist yet.
    fn load(&self) -> Result<Settings>;

    fn save(&self, settings: &Settings) -> Result<()>;
}

/// JSON file store under the user's config directory.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new() -> Result<Self> {
        let dir = dirs::config_dir().context("no config directory for this user")?;
        Ok(Self {
            path: dir.join("spoofwatch").join("settings.json"),
        })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileStore {
    fn load(&self) -> Result<Settings> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Settings::default()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read settings at {}", self.path.display()));
            }
        };

        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse settings at {}", self.path.display()))
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, payload)
            .with_context(|| format!("failed to write settings at {}", self.path.display()))
    }
}

/// In-memory store for tests and embedded hosts.
#[derive(Default)]
pub struct MemoryStore {
    settings: Mutex<Settings>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Settings> {
        Ok(self
            .settings
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone())
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        *self.settings.lock().unwrap_or_else(|err| err.into_inner()) = settings.clone();
        Ok(())
    }
}
