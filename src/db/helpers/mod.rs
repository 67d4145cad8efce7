/// Key holding the day -> reminder map.
pub const REMINDERS_KEY: &str = "reminders";

/// Key holding the append-only saved drug list.
pub const SAVED_DRUGS_KEY: &str = "saved_drugs";
