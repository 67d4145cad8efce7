mod controller;
mod schedule;
mod state;

pub use controller::ReminderClock;
pub use schedule::ScheduleStore;
pub use state::{
    validate_day, AlertKind, ReminderEntry, ReminderMap, ReminderTime, DAYS_IN_CALENDAR,
};
