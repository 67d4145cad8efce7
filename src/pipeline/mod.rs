//! Label interpretation: normalize → recognize → clean → extract.

pub mod clean;
pub mod extract;
pub mod normalize;
pub mod recognize;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use clean::{CleanedText, TextCleaner};
pub use extract::{DrugDictionary, ExtractionRules, FieldExtractor, RuleSet};
pub use normalize::{ImageFrame, ImageNormalizer, NormalizedImage, PixelTransform};
pub use recognize::{
    PageSegmentation, RecognitionOptions, RecognitionRequest, RecognizedText, TesseractRecognizer,
    TextRecognizer,
};

use crate::db::models::ParsedDrugRecord;
use crate::error::ImageError;

/// Named bundles of the two rule generations seen in the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineProfile {
    /// Hard threshold, noise-line dropping, Thai-only rules.
    Basic,
    /// Contrast stretch, drug dictionary, bilingual rules.
    #[default]
    Enhanced,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub transform: PixelTransform,
    pub cleaner: TextCleaner,
    pub rules: ExtractionRules,
    pub recognition: RecognitionOptions,
    pub ocr_timeout: Option<Duration>,
}

impl PipelineConfig {
    pub fn for_profile(profile: PipelineProfile) -> Self {
        match profile {
            PipelineProfile::Basic => Self {
                transform: PixelTransform::Binarize {
                    threshold: normalize::DEFAULT_BINARIZE_THRESHOLD,
                },
                cleaner: TextCleaner::new(true),
                rules: ExtractionRules::basic(),
                recognition: RecognitionOptions::default()
                    .with_page_segmentation(PageSegmentation::UniformBlock),
                ocr_timeout: None,
            },
            PipelineProfile::Enhanced => Self {
                transform: PixelTransform::ContrastStretch {
                    amount: normalize::DEFAULT_CONTRAST_AMOUNT,
                },
                cleaner: TextCleaner::new(false),
                rules: ExtractionRules::enhanced(),
                recognition: RecognitionOptions::default()
                    .with_page_segmentation(PageSegmentation::Auto),
                ocr_timeout: None,
            },
        }
    }
}

impl From<PipelineProfile> for PipelineConfig {
    fn from(profile: PipelineProfile) -> Self {
        Self::for_profile(profile)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::for_profile(PipelineProfile::default())
    }
}

/// One configured pipeline; cheap to clone into worker tasks.
#[derive(Debug, Clone)]
pub struct ScanPipeline {
    normalizer: ImageNormalizer,
    cleaner: TextCleaner,
    extractor: FieldExtractor,
    recognition: RecognitionOptions,
    ocr_timeout: Option<Duration>,
}

impl ScanPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            normalizer: ImageNormalizer::new(config.transform),
            cleaner: config.cleaner,
            extractor: FieldExtractor::new(config.rules),
            recognition: config.recognition,
            ocr_timeout: config.ocr_timeout,
        }
    }

    pub fn with_dictionary(mut self, dictionary: DrugDictionary) -> Self {
        self.extractor = self.extractor.with_dictionary(dictionary);
        self
    }

    pub fn normalizer(&self) -> ImageNormalizer {
        self.normalizer
    }

    pub fn ocr_timeout(&self) -> Option<Duration> {
        self.ocr_timeout
    }

    /// Normalize the frame and wrap it as a recognizer request.
    pub fn prepare(&self, frame: &ImageFrame) -> Result<RecognitionRequest, ImageError> {
        let normalized = self.normalizer.normalize(frame)?;
        Ok(RecognitionRequest {
            image_png: normalized.to_png()?,
            options: self.recognition.clone(),
        })
    }

    pub fn interpret(&self, raw: &RecognizedText) -> (CleanedText, ParsedDrugRecord) {
        let cleaned = self.cleaner.clean(raw.as_str());
        let record = self.extractor.extract(&cleaned, raw);
        (cleaned, record)
    }
}

impl Default for ScanPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_pick_their_policies() {
        let basic = PipelineConfig::for_profile(PipelineProfile::Basic);
        assert_eq!(basic.transform, PixelTransform::Binarize { threshold: 100 });
        assert!(basic.cleaner.drop_short_lines);
        assert_eq!(basic.rules.rule_set, RuleSet::Basic);
        assert_eq!(basic.recognition.page_segmentation.psm(), 6);

        let enhanced = PipelineConfig::default();
        assert!(matches!(enhanced.transform, PixelTransform::ContrastStretch { .. }));
        assert!(!enhanced.cleaner.drop_short_lines);
        assert!(enhanced.rules.use_dictionary);
    }

    #[test]
    fn interpret_runs_clean_then_extract() {
        let pipeline = ScanPipeline::default();
        let raw = RecognizedText::new(
            "Paracetamol 500mg ★\nรับประทาน ครั้งละ 2 เม็ด\nหลังอาหาร เช้า เย็น",
        );
        let (cleaned, record) = pipeline.interpret(&raw);
        assert!(!cleaned.as_str().contains('★'));
        assert_eq!(record.name, "Paracetamol (พาราเซตามอล)");
        assert_eq!(record.dose, "2");
        assert_eq!(record.meal_timing, "หลังอาหาร เช้า เย็น");
    }

    #[test]
    fn prepare_emits_png_with_options() {
        let pipeline = ScanPipeline::new(PipelineProfile::Basic.into());
        let frame = ImageFrame::from_rgba(10, 10, vec![180; 400]).unwrap();
        let request = pipeline.prepare(&frame).unwrap();
        assert_eq!(&request.image_png[1..4], b"PNG");
        assert_eq!(request.options.page_segmentation, PageSegmentation::UniformBlock);
    }

    #[test]
    fn custom_dictionary_replaces_table() {
        let dictionary = DrugDictionary::new(vec![extract::DictionaryEntry {
            key: "Metformin".into(),
            display_name: "Metformin (เมทฟอร์มิน)".into(),
        }]);
        let pipeline = ScanPipeline::default().with_dictionary(dictionary);
        let (_, record) = pipeline.interpret(&RecognizedText::new("METFORMIN 500\nParacetamol"));
        assert_eq!(record.name, "Metformin (เมทฟอร์มิน)");
    }
}
