mod reminders;
mod saved_drugs;
