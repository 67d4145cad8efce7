pub mod drug;

pub use drug::{ParsedDrugRecord, SavedDrugEntry, NAME_NOT_FOUND, UNKNOWN_FIELD};
