//! Drug scan data models.
//!
//! `ParsedDrugRecord` is what a scan produces and the user edits;
//! `SavedDrugEntry` is the immutable history row committed from it.

use chrono::{DateTime, Datelike, TimeZone};
use serde::{Deserialize, Serialize};

/// Shown when no rule could determine the drug name.
pub const NAME_NOT_FOUND: &str = "ไม่พบชื่อยา";

/// Dose or meal timing that could not be determined.
pub const UNKNOWN_FIELD: &str = "-";

const BUDDHIST_ERA_OFFSET: i32 = 543;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDrugRecord {
    pub name: String,
    pub dose: String,
    pub meal_timing: String,
}

impl ParsedDrugRecord {
    pub fn has_dose(&self) -> bool {
        is_present(&self.dose)
    }

    pub fn has_meal_timing(&self) -> bool {
        is_present(&self.meal_timing)
    }

    /// History description, e.g. `ทานครั้งละ 2 เม็ด หลังอาหาร เช้า`.
    pub fn describe(&self) -> String {
        let mut description = String::new();
        if self.has_dose() {
            description.push_str(&format!("ทานครั้งละ {} เม็ด ", self.dose));
        }
        if self.has_meal_timing() {
            description.push_str(&self.meal_timing);
        }
        description
    }
}

impl Default for ParsedDrugRecord {
    fn default() -> Self {
        Self {
            name: NAME_NOT_FOUND.to_string(),
            dose: UNKNOWN_FIELD.to_string(),
            meal_timing: UNKNOWN_FIELD.to_string(),
        }
    }
}

fn is_present(value: &str) -> bool {
    !value.is_empty() && value != UNKNOWN_FIELD
}

/// One committed history row. Field names on disk are kept short
/// (`name`, `desc`, `date`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedDrugEntry {
    pub name: String,
    #[serde(rename = "desc")]
    pub description: String,
    #[serde(rename = "date")]
    pub timestamp: String,
}

impl SavedDrugEntry {
    pub fn from_record<Tz: TimeZone>(record: &ParsedDrugRecord, saved_at: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            name: record.name.clone(),
            description: record.describe(),
            timestamp: thai_timestamp(saved_at),
        }
    }
}

/// `d/m/yyyy HH:MM` with the Buddhist-era year, as the Thai locale prints it.
pub fn thai_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}/{}/{} {}",
        at.day(),
        at.month(),
        at.year() + BUDDHIST_ERA_OFFSET,
        at.format("%H:%M")
    )
}
