use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use tokio::{sync::Mutex, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::notify::{self, AlertEvent, Notifier};
use crate::settings::ReminderSettings;

use super::schedule::ScheduleStore;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

struct Ticker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Polls the wall clock and fires the current day's reminder alerts.
#[derive(Clone)]
pub struct ReminderClock {
    schedule: Arc<Mutex<ScheduleStore>>,
    notifier: Arc<dyn Notifier>,
    poll_interval: Duration,
    early_minutes: u32,
    ticker: Arc<Mutex<Option<Ticker>>>,
}

impl ReminderClock {
    pub fn new(
        schedule: Arc<Mutex<ScheduleStore>>,
        notifier: Arc<dyn Notifier>,
        settings: &ReminderSettings,
    ) -> Self {
        Self {
            schedule,
            notifier,
            poll_interval: settings.poll_interval(),
            early_minutes: settings.early_warning_minutes,
            ticker: Arc::new(Mutex::new(None)),
        }
    }

    pub fn schedule(&self) -> Arc<Mutex<ScheduleStore>> {
        self.schedule.clone()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Evaluate one instant against the stored schedule. Fired flags are
    /// persisted before returning, even when the notifier fails.
    pub async fn poll_at(&self, now: NaiveDateTime) -> Result<Vec<AlertEvent>> {
        let day = now.day() as u8;
        let now_minute = now.hour() * 60 + now.minute();

        let mut schedule = self.schedule.lock().await;
        schedule.reload().await?;
        let Some(entry) = schedule.get(day).cloned() else {
            return Ok(Vec::new());
        };

        let due = entry.due_alerts(now_minute, self.early_minutes);
        if due.is_empty() {
            return Ok(Vec::new());
        }

        let mut fired = Vec::with_capacity(due.len());
        for &kind in &due {
            let event = AlertEvent {
                day,
                kind,
                time: entry.time,
                text: entry.text.clone(),
                lead_minutes: self.early_minutes,
            };
            log_info!("reminder alert {:?} for day {day} ({})", kind, entry.time);
            notify::deliver(self.notifier.as_ref(), &event);
            fired.push(event);
        }

        schedule.mark_fired(day, &entry, &due).await?;
        Ok(fired)
    }

    pub async fn is_running(&self) -> bool {
        self.ticker.lock().await.is_some()
    }

    /// Spawn the polling task, replacing any running one.
    pub async fn start(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(previous) = ticker_guard.take() {
            previous.cancel.cancel();
            previous.handle.abort();
        }

        let cancel = CancellationToken::new();
        let clock = self.clone();
        let token = cancel.clone();
        let poll_interval = self.poll_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(poll_interval);
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }

                if let Err(err) = clock.poll_at(Local::now().naive_local()).await {
                    log_error!("reminder poll failed: {err:#}");
                }
            }
            log_info!("reminder clock stopped");
        });

        log_info!("reminder clock started (every {:?})", poll_interval);
        *ticker_guard = Some(Ticker { cancel, handle });
    }

    pub async fn stop(&self) {
        let ticker = self.ticker.lock().await.take();
        if let Some(ticker) = ticker {
            ticker.cancel.cancel();
            if let Err(err) = ticker.handle.await {
                if !err.is_cancelled() {
                    log_error!("reminder clock task failed: {err}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db::{test_database, Database};
    use crate::notify::testing::RecordingNotifier;
    use crate::reminders::AlertKind;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 30)
            .unwrap()
    }

    async fn clock_with(
        db: Database,
        notifier: Arc<RecordingNotifier>,
    ) -> ReminderClock {
        let mut store = ScheduleStore::load(db).await.unwrap();
        store.set(12, "08:00", "Paracetamol").await.unwrap();
        ReminderClock::new(
            Arc::new(Mutex::new(store)),
            notifier,
            &ReminderSettings::default(),
        )
    }

    #[tokio::test]
    async fn early_then_on_time_each_fire_once() {
        let (_dir, db) = test_database();
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = clock_with(db, notifier.clone()).await;

        let fired = clock.poll_at(at(12, 7, 50)).await.unwrap();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].kind, AlertKind::Early);
        assert_eq!(fired[0].message(), "⏳ อีก 10 นาที: Paracetamol");
        assert!(clock.schedule().lock().await.get(12).unwrap().notified_early);

        assert!(clock.poll_at(at(12, 7, 50)).await.unwrap().is_empty());

        let fired = clock.poll_at(at(12, 8, 0)).await.unwrap();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].kind, AlertKind::OnTime);
        assert!(clock.poll_at(at(12, 8, 0)).await.unwrap().is_empty());

        assert_eq!(notifier.shown.lock().unwrap().len(), 2);
        assert_eq!(*notifier.alarms.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn other_days_and_minutes_are_quiet() {
        let (_dir, db) = test_database();
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = clock_with(db, notifier.clone()).await;

        assert!(clock.poll_at(at(11, 7, 50)).await.unwrap().is_empty());
        assert!(clock.poll_at(at(12, 7, 55)).await.unwrap().is_empty());
        assert!(clock.poll_at(at(12, 8, 1)).await.unwrap().is_empty());
        assert!(notifier.shown.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fired_flags_are_persisted() {
        let (_dir, db) = test_database();
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = clock_with(db.clone(), notifier).await;

        clock.poll_at(at(12, 7, 50)).await.unwrap();
        let stored = db.load_reminders().await.unwrap();
        let entry = stored.get(&12).unwrap();
        assert!(entry.notified_early);
        assert!(!entry.notified_on_time);
    }

    #[tokio::test]
    async fn edit_after_firing_rearms_alerts() {
        let (_dir, db) = test_database();
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = clock_with(db, notifier).await;

        clock.poll_at(at(12, 7, 50)).await.unwrap();
        clock.poll_at(at(12, 8, 0)).await.unwrap();

        clock
            .schedule()
            .lock()
            .await
            .set(12, "08:00", "Paracetamol 500")
            .await
            .unwrap();
        let fired = clock.poll_at(at(12, 7, 50)).await.unwrap();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].text, "Paracetamol 500");
    }

    #[tokio::test]
    async fn reminders_added_elsewhere_fire_and_survive() {
        let (_dir, db) = test_database();
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = clock_with(db.clone(), notifier.clone()).await;

        let mut other = ScheduleStore::load(db.clone()).await.unwrap();
        other.set(20, "09:00", "Vitamin D").await.unwrap();

        let fired = clock.poll_at(at(20, 9, 0)).await.unwrap();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].text, "Vitamin D");

        assert_eq!(clock.poll_at(at(12, 8, 0)).await.unwrap().len(), 1);
        let stored = db.load_reminders().await.unwrap();
        assert_eq!(stored.keys().copied().collect::<Vec<_>>(), vec![12, 20]);
        assert!(stored[&20].notified_on_time);
        assert!(stored[&12].notified_on_time);

        other.delete(20).await.unwrap();
        clock.poll_at(at(12, 7, 50)).await.unwrap();
        assert_eq!(db.load_reminders().await.unwrap().len(), 1);
        assert_eq!(clock.schedule().lock().await.active_days(), vec![12]);
    }

    #[tokio::test]
    async fn notifier_failure_still_marks_fired() {
        let (_dir, db) = test_database();
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let clock = clock_with(db, notifier).await;

        assert_eq!(clock.poll_at(at(12, 8, 0)).await.unwrap().len(), 1);
        assert!(clock.schedule().lock().await.get(12).unwrap().notified_on_time);
        assert!(clock.poll_at(at(12, 8, 0)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn start_and_stop_toggle_ticker() {
        let (_dir, db) = test_database();
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = clock_with(db, notifier).await;

        assert!(!clock.is_running().await);
        clock.start().await;
        assert!(clock.is_running().await);
        clock.start().await;
        assert!(clock.is_running().await);
        clock.stop().await;
        assert!(!clock.is_running().await);
        clock.stop().await;
    }
}
