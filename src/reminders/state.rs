use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Reminders are keyed by day of month on a synthetic 31-day calendar.
pub const DAYS_IN_CALENDAR: u8 = 31;

pub type ReminderMap = BTreeMap<u8, ReminderEntry>;

pub fn validate_day(day: u32) -> Result<u8, ValidationError> {
    if (1..=DAYS_IN_CALENDAR as u32).contains(&day) {
        Ok(day as u8)
    } else {
        Err(ValidationError::InvalidDay(day))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReminderTime {
    hour: u8,
    minute: u8,
}

impl ReminderTime {
    /// `HH:MM` on a 24-hour clock.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let time = NaiveTime::parse_from_str(value.trim(), "%H:%M")
            .map_err(|_| ValidationError::InvalidTime(value.to_string()))?;
        Ok(Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        })
    }

    pub fn minute_of_day(&self) -> u32 {
        self.hour as u32 * 60 + self.minute as u32
    }
}

impl fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl TryFrom<String> for ReminderTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ReminderTime> for String {
    fn from(value: ReminderTime) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertKind {
    Early,
    OnTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderEntry {
    pub time: ReminderTime,
    pub text: String,
    #[serde(default)]
    pub notified_early: bool,
    #[serde(default)]
    pub notified_on_time: bool,
}

impl ReminderEntry {
    /// Fresh entry; both notification flags start cleared.
    pub fn new(time: ReminderTime, text: impl Into<String>) -> Self {
        Self {
            time,
            text: text.into(),
            notified_early: false,
            notified_on_time: false,
        }
    }

    /// Alerts due at `now_minute` (minutes since midnight). Each instant is an
    /// exact-minute match, and an early instant before midnight never wraps to
    /// the previous day.
    pub fn due_alerts(&self, now_minute: u32, early_minutes: u32) -> Vec<AlertKind> {
        let target = self.time.minute_of_day() as i64;
        let now = now_minute as i64;
        let mut due = Vec::new();

        if now == target - early_minutes as i64 && !self.notified_early {
            due.push(AlertKind::Early);
        }
        if now == target && !self.notified_on_time {
            due.push(AlertKind::OnTime);
        }
        due
    }

    pub fn mark_fired(&mut self, kind: AlertKind) {
        match kind {
            AlertKind::Early => self.notified_early = true,
            AlertKind::OnTime => self.notified_on_time = true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32) -> u32 {
        hour * 60 + minute
    }

    #[test]
    fn parses_and_formats_times() {
        let time = ReminderTime::parse("08:05").unwrap();
        assert_eq!(time.minute_of_day(), 485);
        assert_eq!(time.to_string(), "08:05");
        assert_eq!(ReminderTime::parse("8:05").unwrap().to_string(), "08:05");
        assert!(ReminderTime::parse("24:00").is_err());
        assert!(ReminderTime::parse("12:60").is_err());
        assert!(ReminderTime::parse("1205").is_err());
        assert!(ReminderTime::parse("").is_err());
        assert!(ReminderTime::parse("+8:+5").is_err());
        assert!(ReminderTime::parse("-1:30").is_err());
    }

    #[test]
    fn early_and_on_time_are_exact_minutes() {
        let entry = ReminderEntry::new(ReminderTime::parse("08:00").unwrap(), "Paracetamol");
        assert_eq!(entry.due_alerts(at(7, 50), 10), vec![AlertKind::Early]);
        assert!(entry.due_alerts(at(7, 51), 10).is_empty());
        assert!(entry.due_alerts(at(7, 49), 10).is_empty());
        assert_eq!(entry.due_alerts(at(8, 0), 10), vec![AlertKind::OnTime]);
        assert!(entry.due_alerts(at(8, 1), 10).is_empty());
    }

    #[test]
    fn fired_flags_suppress_repeats() {
        let mut entry = ReminderEntry::new(ReminderTime::parse("08:00").unwrap(), "x");
        entry.mark_fired(AlertKind::Early);
        assert!(entry.due_alerts(at(7, 50), 10).is_empty());
        assert_eq!(entry.due_alerts(at(8, 0), 10), vec![AlertKind::OnTime]);
        entry.mark_fired(AlertKind::OnTime);
        assert!(entry.due_alerts(at(8, 0), 10).is_empty());
    }

    #[test]
    fn early_instant_does_not_wrap_past_midnight() {
        let entry = ReminderEntry::new(ReminderTime::parse("00:05").unwrap(), "x");
        assert!(entry.due_alerts(at(23, 55), 10).is_empty());
        assert_eq!(entry.due_alerts(at(0, 5), 10), vec![AlertKind::OnTime]);
    }

    #[test]
    fn map_serializes_with_day_keys() {
        let mut map = ReminderMap::new();
        map.insert(1, ReminderEntry::new(ReminderTime::parse("08:00").unwrap(), "Medicine"));
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "1": {
                    "time": "08:00",
                    "text": "Medicine",
                    "notifiedEarly": false,
                    "notifiedOnTime": false
                }
            })
        );
        let back: ReminderMap = serde_json::from_value(json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn day_range_is_enforced() {
        assert_eq!(validate_day(1), Ok(1));
        assert_eq!(validate_day(31), Ok(31));
        assert_eq!(validate_day(0), Err(ValidationError::InvalidDay(0)));
        assert_eq!(validate_day(32), Err(ValidationError::InvalidDay(32)));
    }
}
