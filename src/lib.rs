#[cfg(feature = "audio")]
pub mod audio;
pub mod camera;
pub mod db;
pub mod error;
pub mod history;
pub mod notify;
pub mod pipeline;
pub mod reminders;
pub mod scanner;
pub mod settings;
pub mod speech;
pub mod utils;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use tokio::sync::Mutex;

use db::Database;
use history::HistoryStore;
use notify::{LogNotifier, Notifier};
use pipeline::{ScanPipeline, TesseractRecognizer};
use reminders::{ReminderClock, ScheduleStore};
use scanner::ScanSession;
use settings::SettingsStore;
use speech::SpeechSynthesizer;

pub const DATA_DIR_ENV: &str = "MEDSCAN_DATA_DIR";
pub const DEFAULT_DATA_DIR: &str = "./medscan-data";

const DB_FILE: &str = "medscan.sqlite3";
const SETTINGS_FILE: &str = "settings.json";

/// `--data-dir`, then `MEDSCAN_DATA_DIR`, then `./medscan-data`.
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Everything rooted in one data directory.
pub struct AppState {
    data_dir: PathBuf,
    pub db: Database,
    pub settings: SettingsStore,
    pub history: HistoryStore,
}

impl AppState {
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;

        let db = Database::new(data_dir.join(DB_FILE))?;
        let settings = SettingsStore::new(data_dir.join(SETTINGS_FILE))?;
        let history = HistoryStore::new(db.clone());

        log::info!("medscan database at {}", db.path().display());

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            db,
            settings,
            history,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn scan_pipeline(&self) -> ScanPipeline {
        ScanPipeline::new(self.settings.scanner().pipeline_config())
    }

    pub fn scan_session(&self, speech: Arc<dyn SpeechSynthesizer>) -> ScanSession {
        let recognizer = TesseractRecognizer::new(self.settings.scanner().tesseract_binary);
        ScanSession::new(self.scan_pipeline(), Arc::new(recognizer), speech)
    }

    pub async fn schedule(&self) -> Result<ScheduleStore> {
        ScheduleStore::load(self.db.clone()).await
    }

    pub async fn reminder_clock(&self, notifier: Arc<dyn Notifier>) -> Result<ReminderClock> {
        let schedule = self.schedule().await?;
        Ok(ReminderClock::new(
            Arc::new(Mutex::new(schedule)),
            notifier,
            &self.settings.reminders(),
        ))
    }
}

/// Log-only delivery, plus a real alarm tone when built with `audio`.
pub fn default_notifier() -> Arc<dyn Notifier> {
    #[cfg(feature = "audio")]
    {
        Arc::new(audio::AlarmNotifier::new(Arc::new(LogNotifier)))
    }

    #[cfg(not(feature = "audio"))]
    {
        Arc::new(LogNotifier)
    }
}
