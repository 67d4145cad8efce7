//! Rule-based field extraction from cleaned label text.
//!
//! Every rule resolves to a sentinel on a miss; nothing here can fail.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::clean::CleanedText;
use super::recognize::RecognizedText;
use crate::db::models::{ParsedDrugRecord, NAME_NOT_FOUND, UNKNOWN_FIELD};

static BASIC_DOSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(รับประทาน|กิน|ทาน|ครั้งละ)\s*([0-9]+)\s*(เม็ด|แคปซูล)").unwrap()
});

static ENHANCED_DOSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(รับประทาน|กิน|ทาน|ครั้งละ)\s*([0-9๐-๙]+(?:\.[0-9๐-๙]+)?|half|ครึ่ง)\s*(เม็ด|แคปซูล|capsule|tablet)",
    )
    .unwrap()
});

static UPPERCASE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z]{4,}").unwrap());

pub const HALF_DOSE: &str = "0.5";

/// Which generation of dose and meal rules to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleSet {
    /// Thai keywords and Arabic digits only.
    Basic,
    /// Adds Thai digits, half doses, English units and English meal words.
    Enhanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRules {
    pub use_dictionary: bool,
    pub uppercase_heuristic: bool,
    /// A fallback name line must be strictly longer than this.
    pub min_name_chars: usize,
    /// Treat `:` as filler when rejecting number-only lines.
    pub colon_is_filler: bool,
    pub rule_set: RuleSet,
}

impl ExtractionRules {
    pub fn basic() -> Self {
        Self {
            use_dictionary: false,
            uppercase_heuristic: false,
            min_name_chars: 4,
            colon_is_filler: false,
            rule_set: RuleSet::Basic,
        }
    }

    pub fn enhanced() -> Self {
        Self {
            use_dictionary: true,
            uppercase_heuristic: true,
            min_name_chars: 5,
            colon_is_filler: true,
            rule_set: RuleSet::Enhanced,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub key: String,
    pub display_name: String,
}

/// Ordered substring table; the first key found wins, regardless of where it
/// appears in the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugDictionary {
    entries: Vec<DictionaryEntry>,
}

impl DrugDictionary {
    pub fn new(entries: Vec<DictionaryEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| DictionaryEntry {
                key: entry.key.to_lowercase(),
                display_name: entry.display_name,
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[DictionaryEntry] {
        &self.entries
    }

    pub fn lookup(&self, text: &str) -> Option<&str> {
        let haystack = text.to_lowercase();
        self.entries
            .iter()
            .find(|entry| haystack.contains(&entry.key))
            .map(|entry| entry.display_name.as_str())
    }
}

impl Default for DrugDictionary {
    fn default() -> Self {
        const TABLE: &[(&str, &str)] = &[
            ("paracetamol", "Paracetamol (พาราเซตามอล)"),
            ("พาราเซตามอล", "Paracetamol (พาราเซตามอล)"),
            ("amoxicillin", "Amoxicillin (อะม็อกซีซิลลิน)"),
            ("amoxy", "Amoxicillin (อะม็อกซีซิลลิน)"),
            ("loratadine", "Loratadine (ลอราทาดีน)"),
            ("ลอราทาดีน", "Loratadine (ลอราทาดีน)"),
            ("ibuprofen", "Ibuprofen (ไอบูโพรเฟน)"),
            ("ไอบูโพรเฟน", "Ibuprofen (ไอบูโพรเฟน)"),
            ("cetirizine", "Cetirizine (เซทิริซีน)"),
            ("เซทิริซีน", "Cetirizine (เซทิริซีน)"),
        ];
        Self::new(
            TABLE
                .iter()
                .map(|(key, display_name)| DictionaryEntry {
                    key: (*key).to_string(),
                    display_name: (*display_name).to_string(),
                })
                .collect(),
        )
    }
}

struct MealRule {
    label: &'static str,
    thai: &'static [&'static str],
    english: &'static [&'static str],
}

/// Output order is this table's order, never the order found in the text.
const MEAL_RULES: &[MealRule] = &[
    MealRule {
        label: "หลังอาหาร",
        thai: &["หลังอาหาร", "หลัง"],
        english: &["after meal", "after food"],
    },
    MealRule {
        label: "ก่อนอาหาร",
        thai: &["ก่อนอาหาร", "ก่อน"],
        english: &["before meal", "before food"],
    },
    MealRule {
        label: "เช้า",
        thai: &["เช้า"],
        english: &["morning"],
    },
    MealRule {
        label: "กลางวัน",
        thai: &["กลางวัน", "เที่ยง"],
        english: &["noon", "lunch"],
    },
    MealRule {
        label: "เย็น",
        thai: &["เย็น"],
        english: &["evening", "dinner"],
    },
    MealRule {
        label: "ก่อนนอน",
        thai: &["ก่อนนอน"],
        english: &["bedtime", "before bed"],
    },
];

#[derive(Debug, Clone)]
pub struct FieldExtractor {
    rules: ExtractionRules,
    dictionary: DrugDictionary,
}

impl FieldExtractor {
    pub fn new(rules: ExtractionRules) -> Self {
        Self {
            rules,
            dictionary: DrugDictionary::default(),
        }
    }

    pub fn with_dictionary(mut self, dictionary: DrugDictionary) -> Self {
        self.dictionary = dictionary;
        self
    }

    pub fn extract(&self, cleaned: &CleanedText, raw: &RecognizedText) -> ParsedDrugRecord {
        let collapsed = cleaned.collapsed();
        ParsedDrugRecord {
            name: self.extract_name(cleaned, raw),
            dose: self.extract_dose(&collapsed),
            meal_timing: self.extract_meal_timing(&collapsed),
        }
    }

    pub fn extract_name(&self, cleaned: &CleanedText, raw: &RecognizedText) -> String {
        if self.rules.use_dictionary {
            let found = self
                .dictionary
                .lookup(raw.as_str())
                .or_else(|| self.dictionary.lookup(cleaned.as_str()));
            if let Some(name) = found {
                return name.to_string();
            }
        }

        if self.rules.uppercase_heuristic {
            if let Some(line) = cleaned.lines().find(|line| UPPERCASE_RUN_RE.is_match(line)) {
                return line.trim().to_string();
            }
        }

        cleaned
            .lines()
            .find(|line| {
                line.chars().count() > self.rules.min_name_chars && !self.is_filler_line(line)
            })
            .map(|line| line.trim().to_string())
            .unwrap_or_else(|| NAME_NOT_FOUND.to_string())
    }

    fn is_filler_line(&self, line: &str) -> bool {
        !line.is_empty()
            && line.chars().all(|c| {
                c.is_ascii_digit()
                    || c.is_whitespace()
                    || c == '.'
                    || (self.rules.colon_is_filler && c == ':')
            })
    }

    /// Quantity from the first keyword/quantity/unit match.
    pub fn extract_dose(&self, collapsed: &str) -> String {
        let regex = match self.rules.rule_set {
            RuleSet::Basic => &*BASIC_DOSE_RE,
            RuleSet::Enhanced => &*ENHANCED_DOSE_RE,
        };

        let Some(captures) = regex.captures(collapsed) else {
            return UNKNOWN_FIELD.to_string();
        };
        let quantity = &captures[2];

        if quantity.eq_ignore_ascii_case("half") || quantity == "ครึ่ง" {
            HALF_DOSE.to_string()
        } else {
            quantity.chars().map(thai_digit_to_ascii).collect()
        }
    }

    pub fn extract_meal_timing(&self, collapsed: &str) -> String {
        let lowered = collapsed.to_lowercase();
        let labels: Vec<&str> = MEAL_RULES
            .iter()
            .filter(|rule| {
                rule.thai.iter().any(|kw| collapsed.contains(kw))
                    || (self.rules.rule_set == RuleSet::Enhanced
                        && rule.english.iter().any(|kw| lowered.contains(kw)))
            })
            .map(|rule| rule.label)
            .collect();

        if labels.is_empty() {
            UNKNOWN_FIELD.to_string()
        } else {
            labels.join(" ")
        }
    }
}

fn thai_digit_to_ascii(c: char) -> char {
    match c {
        '๐'..='๙' => char::from_u32(c as u32 - '๐' as u32 + '0' as u32).unwrap_or(c),
        other => other,
    }
}
