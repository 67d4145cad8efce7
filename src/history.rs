use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, TimeZone};

use crate::db::{Database, ParsedDrugRecord, SavedDrugEntry};
use crate::error::ValidationError;

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Append-only list of drugs the user confirmed after a scan.
#[derive(Clone)]
pub struct HistoryStore {
    db: Database,
}

impl HistoryStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Append `record` stamped with `now`. A blank name is rejected and
    /// nothing is written.
    pub async fn commit<Tz>(
        &self,
        record: &ParsedDrugRecord,
        now: &DateTime<Tz>,
    ) -> Result<SavedDrugEntry>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        if record.name.trim().is_empty() {
            return Err(ValidationError::MissingDrugName.into());
        }

        let entry = SavedDrugEntry::from_record(record, now);
        let count = self.db.append_saved_drug(entry.clone()).await?;
        log_info!("saved '{}' to history ({count} entries)", entry.name);
        Ok(entry)
    }

    pub async fn list(&self) -> Result<Vec<SavedDrugEntry>> {
        self.db.list_saved_drugs().await
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;
    use crate::db::test_database;

    fn bangkok_now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 9, 14, 5, 0)
            .unwrap()
    }

    fn record(name: &str) -> ParsedDrugRecord {
        ParsedDrugRecord {
            name: name.into(),
            dose: "2".into(),
            meal_timing: "หลังอาหาร เช้า เย็น".into(),
        }
    }

    #[tokio::test]
    async fn commit_appends_entry() {
        let (_dir, db) = test_database();
        let history = HistoryStore::new(db);

        let entry = history
            .commit(&record("Paracetamol (พาราเซตามอล)"), &bangkok_now())
            .await
            .unwrap();
        assert_eq!(entry.description, "ทานครั้งละ 2 เม็ด หลังอาหาร เช้า เย็น");
        assert_eq!(entry.timestamp, "9/3/2568 14:05");

        let listed = history.list().await.unwrap();
        assert_eq!(listed, vec![entry]);
    }

    #[tokio::test]
    async fn blank_name_is_rejected_without_writing() {
        let (_dir, db) = test_database();
        let history = HistoryStore::new(db);
        history.commit(&record("Amoxicillin"), &bangkok_now()).await.unwrap();

        for name in ["", "   "] {
            let err = history.commit(&record(name), &bangkok_now()).await.unwrap_err();
            assert_eq!(
                err.downcast_ref::<ValidationError>(),
                Some(&ValidationError::MissingDrugName)
            );
        }
        assert_eq!(history.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_fields_leave_empty_description() {
        let (_dir, db) = test_database();
        let history = HistoryStore::new(db);
        let entry = history
            .commit(&ParsedDrugRecord::default(), &bangkok_now())
            .await
            .unwrap();
        assert_eq!(entry.name, crate::db::models::NAME_NOT_FOUND);
        assert_eq!(entry.description, "");
    }
}
