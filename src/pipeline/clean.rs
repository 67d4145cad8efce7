use serde::{Deserialize, Serialize};

/// Lines with this many meaningful characters or fewer are noise.
pub const SHORT_LINE_MAX_CHARS: usize = 2;

const THAI_FIRST: char = '\u{0E01}';
const THAI_LAST: char = '\u{0E59}';

/// Recognized text after character-class filtering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CleanedText(String);

impl CleanedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.0.split('\n')
    }

    /// Every whitespace run folded into one space.
    pub fn collapsed(&self) -> String {
        self.0.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

pub fn is_kept_char(c: char) -> bool {
    (THAI_FIRST..=THAI_LAST).contains(&c)
        || c.is_ascii_alphanumeric()
        || c.is_whitespace()
        || matches!(c, '.' | ',' | '(' | ')' | '/' | '-' | '%')
}

fn meaningful_chars(line: &str) -> usize {
    line.chars()
        .filter(|c| is_kept_char(*c) && !c.is_whitespace())
        .count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextCleaner {
    pub drop_short_lines: bool,
}

impl TextCleaner {
    pub fn new(drop_short_lines: bool) -> Self {
        Self { drop_short_lines }
    }

    /// Replace every character outside the label alphabet with a space. With
    /// `drop_short_lines`, noise lines go first. Running it twice changes
    /// nothing.
    pub fn clean(&self, raw: &str) -> CleanedText {
        let kept: Vec<&str> = if self.drop_short_lines {
            raw.split('\n')
                .filter(|line| meaningful_chars(line) > SHORT_LINE_MAX_CHARS)
                .collect()
        } else {
            raw.split('\n').collect()
        };

        let filtered = kept
            .join("\n")
            .chars()
            .map(|c| if is_kept_char(c) { c } else { ' ' })
            .collect();
        CleanedText(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_each_foreign_char_with_one_space() {
        let cleaned = TextCleaner::new(false).clean("Para@#cetamol 500mg*");
        assert_eq!(cleaned.as_str(), "Para  cetamol 500mg ");
    }

    #[test]
    fn keeps_thai_digits_and_punctuation() {
        let input = "ยาแก้ปวด ๕๐๐ (500 mg) 1/2 - 10%, ok.";
        assert_eq!(TextCleaner::new(false).clean(input).as_str(), input);
    }

    #[test]
    fn drops_noise_lines_when_enabled() {
        let raw = "ab\n  x \nParacetamol\n@@@z\n12\nรับประทาน";
        let cleaned = TextCleaner::new(true).clean(raw);
        assert_eq!(cleaned.as_str(), "Paracetamol\nรับประทาน");

        let kept = TextCleaner::new(false).clean(raw);
        assert_eq!(kept.lines().count(), 6);
    }

    #[test]
    fn cleaning_is_idempotent() {
        let samples = [
            "Amoxy!! 250 แคปซูล\n~~\nทาน ครั้งละ 1 เม็ด: หลังอาหาร",
            "a@b\n\n\t?x?\nLORATADINE 10mg",
            "",
        ];
        for cleaner in [TextCleaner::new(true), TextCleaner::new(false)] {
            for sample in samples {
                let once = cleaner.clean(sample);
                let twice = cleaner.clean(once.as_str());
                assert_eq!(once, twice);
            }
        }
    }

    #[test]
    fn collapsed_folds_whitespace() {
        let cleaned = TextCleaner::new(false).clean("ทาน \n\t 2   เม็ด");
        assert_eq!(cleaned.collapsed(), "ทาน 2 เม็ด");
    }
}
