//! Device preferences persisted as one JSON document.
//!
//! Each block is a plain value with last-write-wins semantics. A missing or
//! unreadable file yields defaults instead of failing startup.

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Default,
    Dark,
    Fresh,
    Ocean,
    Purple,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationPrefs {
    pub booking_remind: bool,
    pub system_notify: bool,
    pub new_work_notify: bool,
    pub message_notify: bool,
    pub email_notify: bool,
    pub sound_notify: bool,
    pub vibrate_notify: bool,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            booking_remind: true,
            system_notify: true,
            new_work_notify: true,
            message_notify: true,
            email_notify: false,
            sound_notify: true,
            vibrate_notify: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivacyPrefs {
    pub public_favorites: bool,
    pub public_bookings: bool,
    pub allow_search: bool,
    pub show_online_status: bool,
    pub allow_comment: bool,
    pub allow_download: bool,
}

impl Default for PrivacyPrefs {
    fn default() -> Self {
        Self {
            public_favorites: false,
            public_bookings: false,
            allow_search: true,
            show_online_status: true,
            allow_comment: true,
            allow_download: false,
        }
    }
}

/// Profile fields the device shows without asking the remote store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct CachedProfile {
    pub nick_name: String,
    pub avatar_url: String,
    pub phone: String,
    pub bio: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
struct Preferences {
    theme: Theme,
    notifications: NotificationPrefs,
    privacy: PrivacyPrefs,
    profile: Option<CachedProfile>,
    photographer_mode: bool,
}

pub struct PreferencesStore {
    path: PathBuf,
    data: RwLock<Preferences>,
}

impl PreferencesStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read preferences from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring unreadable preferences at {}: {err}",
                    path.display()
                );
                Preferences::default()
            })
        } else {
            Preferences::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Preferences> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Preferences> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn update(&self, change: impl FnOnce(&mut Preferences)) -> Result<()> {
        let mut guard = self.write();
        change(&mut guard);
        self.persist(&guard)
    }

    pub fn theme(&self) -> Theme {
        self.read().theme
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        self.update(|prefs| prefs.theme = theme)
    }

    pub fn notifications(&self) -> NotificationPrefs {
        self.read().notifications.clone()
    }

    pub fn set_notifications(&self, notifications: NotificationPrefs) -> Result<()> {
        self.update(|prefs| prefs.notifications = notifications)
    }

    pub fn privacy(&self) -> PrivacyPrefs {
        self.read().privacy.clone()
    }

    pub fn set_privacy(&self, privacy: PrivacyPrefs) -> Result<()> {
        self.update(|prefs| prefs.privacy = privacy)
    }

    pub fn profile(&self) -> Option<CachedProfile> {
        self.read().profile.clone()
    }

    pub fn set_profile(&self, profile: Option<CachedProfile>) -> Result<()> {
        self.update(|prefs| prefs.profile = profile)
    }

    pub fn photographer_mode(&self) -> bool {
        self.read().photographer_mode
    }

    pub fn set_photographer_mode(&self, enabled: bool) -> Result<()> {
        self.update(|prefs| prefs.photographer_mode = enabled)
    }

    /// Drop every block back to its default.
    pub fn reset(&self) -> Result<()> {
        self.update(|prefs| *prefs = Preferences::default())
    }

    fn persist(&self, data: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write preferences to {}", self.path.display()))
    }
}
