use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::pipeline::{PipelineConfig, PipelineProfile, PixelTransform};

const DEBUG_ENV: &str = "MEDSCAN_DEBUG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScannerSettings {
    pub profile: PipelineProfile,
    /// Replaces the profile's pixel transform when set.
    pub transform: Option<PixelTransform>,
    pub ocr_timeout_secs: Option<u64>,
    pub tesseract_binary: String,
}

impl ScannerSettings {
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::for_profile(self.profile);
        if let Some(transform) = self.transform {
            config.transform = transform;
        }
        config.ocr_timeout = self.ocr_timeout_secs.map(Duration::from_secs);
        config
    }
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            profile: PipelineProfile::default(),
            transform: None,
            ocr_timeout_secs: Some(60),
            tesseract_binary: "tesseract".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReminderSettings {
    pub poll_interval_secs: u64,
    pub early_warning_minutes: u32,
}

impl ReminderSettings {
    /// `MEDSCAN_DEBUG=1` polls every second.
    pub fn poll_interval(&self) -> Duration {
        if debug_mode() {
            Duration::from_secs(1)
        } else {
            Duration::from_secs(self.poll_interval_secs.max(1))
        }
    }
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            early_warning_minutes: 10,
        }
    }
}

pub fn debug_mode() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct UserSettings {
    scanner: ScannerSettings,
    reminders: ReminderSettings,
}

/// `settings.json` in the data directory. A missing or unreadable file falls
/// back to defaults.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring invalid settings in {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn scanner(&self) -> ScannerSettings {
        self.read().scanner.clone()
    }

    pub fn reminders(&self) -> ReminderSettings {
        self.read().reminders.clone()
    }

    pub fn update_scanner(&self, settings: ScannerSettings) -> Result<()> {
        let mut guard = self.write();
        guard.scanner = settings;
        self.persist(&guard)
    }

    pub fn update_reminders(&self, settings: ReminderSettings) -> Result<()> {
        let mut guard = self.write();
        guard.reminders = settings;
        self.persist(&guard)
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
