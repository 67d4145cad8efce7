use anyhow::{Context, Result};

use crate::db::{
    helpers::SAVED_DRUGS_KEY, models::SavedDrugEntry, read_value, write_value, Database,
};

impl Database {
    /// All saved drugs in insertion order.
    pub async fn list_saved_drugs(&self) -> Result<Vec<SavedDrugEntry>> {
        Ok(self
            .get_json::<Vec<SavedDrugEntry>>(SAVED_DRUGS_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Append one entry. The read and write happen inside a single DB task so
    /// two appends from this process never lose each other. Returns the new
    /// list length.
    pub async fn append_saved_drug(&self, entry: SavedDrugEntry) -> Result<usize> {
        self.execute(move |conn| {
            let mut entries: Vec<SavedDrugEntry> = match read_value(conn, SAVED_DRUGS_KEY)? {
                Some(raw) => serde_json::from_str(&raw).context("saved drug list is corrupt")?,
                None => Vec::new(),
            };
            entries.push(entry);
            let serialized = serde_json::to_string(&entries)?;
            write_value(conn, SAVED_DRUGS_KEY, &serialized)?;
            Ok(entries.len())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{test_database, SavedDrugEntry};

    fn entry(name: &str) -> SavedDrugEntry {
        SavedDrugEntry {
            name: name.into(),
            description: "ทานครั้งละ 1 เม็ด ".into(),
            timestamp: "1/1/2569 08:00".into(),
        }
    }

    #[tokio::test]
    async fn appends_keep_order() {
        let (_dir, db) = test_database();
        assert!(db.list_saved_drugs().await.unwrap().is_empty());

        assert_eq!(db.append_saved_drug(entry("A")).await.unwrap(), 1);
        assert_eq!(db.append_saved_drug(entry("B")).await.unwrap(), 2);

        let names: Vec<_> = db
            .list_saved_drugs()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }
}
