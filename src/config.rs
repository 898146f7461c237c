use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};

use crate::caller::Caller;

const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_PAGE_SIZE: u32 = 20;

/// Runtime configuration, read from `PHOTOBOOK_*` environment variables.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    pub data_dir: PathBuf,
    pub caller: Caller,
    /// Upper bound on a single remote round-trip before it counts as unreachable.
    pub remote_timeout: Duration,
    pub page_size: u32,
    pub debug: bool,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            caller: Caller::new("local-device"),
            remote_timeout: Duration::from_millis(DEFAULT_REMOTE_TIMEOUT_MS),
            page_size: DEFAULT_PAGE_SIZE,
            debug: false,
        }
    }
}

impl StorefrontConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(dir) = lookup("PHOTOBOOK_DATA_DIR").filter(|v| !v.is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(caller) = lookup("PHOTOBOOK_CALLER").filter(|v| !v.is_empty()) {
            config.caller = Caller::new(caller);
        }
        if let Some(raw) = lookup("PHOTOBOOK_REMOTE_TIMEOUT_MS") {
            let millis: u64 = raw
                .parse()
                .with_context(|| format!("invalid PHOTOBOOK_REMOTE_TIMEOUT_MS '{raw}'"))?;
            config.remote_timeout = Duration::from_millis(millis);
        }
        if let Some(raw) = lookup("PHOTOBOOK_PAGE_SIZE") {
            config.page_size = raw
                .parse()
                .with_context(|| format!("invalid PHOTOBOOK_PAGE_SIZE '{raw}'"))?;
        }
        config.debug = lookup("PHOTOBOOK_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(config)
    }

    pub fn remote_db_path(&self) -> PathBuf {
        self.data_dir.join("remote.sqlite3")
    }

    pub fn cache_db_path(&self) -> PathBuf {
        self.data_dir.join("cache.sqlite3")
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join("preferences.json")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("photobook"))
        .unwrap_or_else(|| PathBuf::from(".photobook"))
}
