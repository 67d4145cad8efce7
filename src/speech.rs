//! Spoken read-back of a parsed label.

use serde::{Deserialize, Serialize};

use crate::db::models::ParsedDrugRecord;

const ENABLE_LOGS: bool = true;

use crate::log_info;

pub const SPEECH_RATE: f32 = 0.9;
pub const SPEECH_VOLUME: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    /// BCP 47 tag such as `th-TH`.
    pub lang: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub lang: String,
    pub voice: Option<Voice>,
    pub rate: f32,
    pub volume: f32,
}

/// Fire-and-forget speech output.
pub trait SpeechSynthesizer: Send + Sync {
    fn voices(&self) -> Vec<Voice>;
    /// Drop anything queued or playing.
    fn cancel(&self);
    fn speak(&self, utterance: Utterance);
}

pub fn contains_thai(text: &str) -> bool {
    text.chars().any(|c| ('\u{0E01}'..='\u{0E59}').contains(&c))
}

pub fn compose_announcement(record: &ParsedDrugRecord) -> String {
    let mut text = format!("ชื่อยา... {} . ", record.name);
    if record.has_dose() {
        text.push_str(&format!("รับประทาน... ครั้งละ {} เม็ด . ", record.dose));
    }
    if record.has_meal_timing() {
        text.push_str(&format!("{} .", record.meal_timing));
    }
    text
}

/// Thai voice for Thai drug names, English otherwise.
pub fn build_utterance(record: &ParsedDrugRecord, voices: &[Voice]) -> Utterance {
    let (lang, prefix) = if contains_thai(&record.name) {
        ("th-TH", "th")
    } else {
        ("en-US", "en")
    };
    let voice = voices.iter().find(|v| v.lang.contains(prefix)).cloned();

    Utterance {
        text: compose_announcement(record),
        lang: lang.to_string(),
        voice,
        rate: SPEECH_RATE,
        volume: SPEECH_VOLUME,
    }
}

/// Writes utterances to the log instead of a speaker.
#[derive(Debug, Default, Clone)]
pub struct LogSpeaker;

impl SpeechSynthesizer for LogSpeaker {
    fn voices(&self) -> Vec<Voice> {
        Vec::new()
    }

    fn cancel(&self) {}

    fn speak(&self, utterance: Utterance) {
        log_info!("[speech {}] {}", utterance.lang, utterance.text);
    }
}
