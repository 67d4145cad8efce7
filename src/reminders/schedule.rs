use anyhow::Result;

use crate::db::Database;
use crate::error::ValidationError;

use super::state::{validate_day, AlertKind, ReminderEntry, ReminderMap, ReminderTime};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Day-of-month reminders. Every change is a single read-modify-write in the
/// database, so several stores (or processes) on one file see each other's
/// days after `reload`.
pub struct ScheduleStore {
    db: Database,
    entries: ReminderMap,
}

impl ScheduleStore {
    pub async fn load(db: Database) -> Result<Self> {
        let entries = db.load_reminders().await?;
        log_info!("loaded {} reminder(s)", entries.len());
        Ok(Self { db, entries })
    }

    /// Pick up changes written by other stores.
    pub async fn reload(&mut self) -> Result<()> {
        self.entries = self.db.load_reminders().await?;
        log_debug!("reloaded {} reminder(s)", self.entries.len());
        Ok(())
    }

    /// Create or overwrite the reminder for `day`. Both notification flags
    /// start cleared. Nothing changes when validation fails.
    pub async fn set(&mut self, day: u32, time: &str, text: &str) -> Result<()> {
        let day = validate_day(day)?;
        if text.trim().is_empty() {
            return Err(ValidationError::MissingReminderText.into());
        }
        let time = ReminderTime::parse(time)?;

        self.entries = self
            .db
            .upsert_reminder(day, ReminderEntry::new(time, text))
            .await?;
        log_info!("reminder set for day {day} at {time}");
        Ok(())
    }

    /// Remove the reminder for `day`. Absent days are a no-op.
    pub async fn delete(&mut self, day: u32) -> Result<bool> {
        let day = validate_day(day)?;
        let (removed, entries) = self.db.remove_reminder(day).await?;
        self.entries = entries;
        if removed {
            log_info!("reminder deleted for day {day}");
        }
        Ok(removed)
    }

    pub fn get(&self, day: u8) -> Option<&ReminderEntry> {
        self.entries.get(&day)
    }

    pub fn entries(&self) -> &ReminderMap {
        &self.entries
    }

    /// Days carrying a reminder, ascending.
    pub fn active_days(&self) -> Vec<u8> {
        self.entries.keys().copied().collect()
    }

    /// Record `kinds` as delivered for the `evaluated` entry of `day`.
    pub(crate) async fn mark_fired(
        &mut self,
        day: u8,
        evaluated: &ReminderEntry,
        kinds: &[AlertKind],
    ) -> Result<()> {
        self.entries = self
            .db
            .mark_reminder_fired(day, evaluated.clone(), kinds.to_vec())
            .await?;
        Ok(())
    }
}
