//! Alert delivery boundary for the reminder clock.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::reminders::{AlertKind, ReminderTime};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

pub const NOTIFICATION_TITLE: &str = "แจ้งเตือนกินยา";
pub const NOTIFICATION_ICON: &str = "https://cdn-icons-png.flaticon.com/512/3076/3076136.png";

/// On/off durations in milliseconds.
pub const VIBRATION_PATTERN: [u64; 5] = [500, 200, 500, 200, 1000];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    pub day: u8,
    pub kind: AlertKind,
    pub time: ReminderTime,
    pub text: String,
    /// How far ahead of `time` an early alert fires.
    pub lead_minutes: u32,
}

impl AlertEvent {
    pub fn message(&self) -> String {
        match self.kind {
            AlertKind::Early => format!("⏳ อีก {} นาที: {}", self.lead_minutes, self.text),
            AlertKind::OnTime => format!("⏰ ถึงเวลาแล้ว: {}", self.text),
        }
    }

    pub fn notification(&self) -> Notification {
        Notification {
            title: NOTIFICATION_TITLE.to_string(),
            body: self.message(),
            icon_url: NOTIFICATION_ICON.to_string(),
            require_interaction: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon_url: String,
    pub require_interaction: bool,
}

pub trait Notifier: Send + Sync {
    fn show(&self, notification: &Notification) -> Result<()>;

    /// Audible alarm plus vibration.
    fn alarm(&self, vibration: &[u64]) -> Result<()>;
}

/// Alarm first, then the notification. Failures are logged and swallowed so
/// the caller can still record the alert as delivered.
pub fn deliver(notifier: &dyn Notifier, event: &AlertEvent) {
    if let Err(err) = notifier.alarm(&VIBRATION_PATTERN) {
        log_warn!("alarm playback failed for day {}: {err:#}", event.day);
    }
    if let Err(err) = notifier.show(&event.notification()) {
        log_warn!("notification failed for day {}: {err:#}", event.day);
    }
}

#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show(&self, notification: &Notification) -> Result<()> {
        log::info!("[{}] {}", notification.title, notification.body);
        Ok(())
    }

    fn alarm(&self, vibration: &[u64]) -> Result<()> {
        log::info!("alarm (vibration {:?})", vibration);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use anyhow::bail;

    use super::*;

    #[derive(Default)]
    pub struct RecordingNotifier {
        pub shown: Mutex<Vec<Notification>>,
        pub alarms: Mutex<usize>,
        pub fail: bool,
    }

    impl Notifier for RecordingNotifier {
        fn show(&self, notification: &Notification) -> Result<()> {
            if self.fail {
                bail!("permission denied");
            }
            self.shown.lock().unwrap().push(notification.clone());
            Ok(())
        }

        fn alarm(&self, _vibration: &[u64]) -> Result<()> {
            if self.fail {
                bail!("no audio device");
            }
            *self.alarms.lock().unwrap() += 1;
            Ok(())
        }
    }
}
