use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::db::{helpers::REMINDERS_KEY, read_value, write_value, Database};
use crate::reminders::{AlertKind, ReminderEntry, ReminderMap};

impl Database {
    pub async fn load_reminders(&self) -> Result<ReminderMap> {
        Ok(self
            .get_json::<ReminderMap>(REMINDERS_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Replace the whole persisted map.
    pub async fn save_reminders(&self, reminders: &ReminderMap) -> Result<()> {
        self.put_json(REMINDERS_KEY, reminders).await
    }

    /// Insert or overwrite one day. Returns the map as stored.
    pub async fn upsert_reminder(&self, day: u8, entry: ReminderEntry) -> Result<ReminderMap> {
        self.execute(move |conn| {
            let ((), map) = update_reminders(conn, |map| {
                map.insert(day, entry);
            })?;
            Ok(map)
        })
        .await
    }

    /// Remove one day. Returns whether it existed and the map as stored.
    pub async fn remove_reminder(&self, day: u8) -> Result<(bool, ReminderMap)> {
        self.execute(move |conn| update_reminders(conn, |map| map.remove(&day).is_some()))
            .await
    }

    /// Set the flags for `kinds` on `day`, but only while the stored entry is
    /// still the one that was evaluated. Other days are left as stored.
    pub async fn mark_reminder_fired(
        &self,
        day: u8,
        evaluated: ReminderEntry,
        kinds: Vec<AlertKind>,
    ) -> Result<ReminderMap> {
        self.execute(move |conn| {
            let ((), map) = update_reminders(conn, |map| {
                if let Some(entry) = map.get_mut(&day) {
                    if entry.time == evaluated.time && entry.text == evaluated.text {
                        for kind in kinds {
                            entry.mark_fired(kind);
                        }
                    }
                }
            })?;
            Ok(map)
        })
        .await
    }
}

/// Read, change and write the map on the DB thread so concurrent writers
/// only race per call, never across a whole in-memory copy.
fn update_reminders<T>(
    conn: &mut Connection,
    change: impl FnOnce(&mut ReminderMap) -> T,
) -> Result<(T, ReminderMap)> {
    let mut map: ReminderMap = match read_value(conn, REMINDERS_KEY)? {
        Some(raw) => serde_json::from_str(&raw).context("reminder map is corrupt")?,
        None => ReminderMap::new(),
    };
    let result = change(&mut map);
    let serialized = serde_json::to_string(&map)?;
    write_value(conn, REMINDERS_KEY, &serialized)?;
    Ok((result, map))
}
