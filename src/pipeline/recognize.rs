//! OCR engine boundary.
//!
//! The engine itself is an external collaborator; this module only defines
//! how it is asked and ships a `tesseract` process adapter.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{io::AsyncWriteExt, process::Command};

use crate::error::RecognitionError;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Digits, Thai consonants/vowels/tone marks, Latin letters and the label
/// punctuation set.
pub const CHARACTER_WHITELIST: &str = "0123456789กขฃคฅฆงจฉชซฌญฎฏฐฑฒณดตถทธนบปผฝพฟภมยรฤลวศษสหฬอฮฯะัาำิีึืฺุูเแโใไๅๆ็่้๊๋์abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ.,:/()%+- ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageSegmentation {
    /// Treat the crop as one uniform block of text.
    UniformBlock,
    /// Let the engine work out the layout.
    Auto,
}

impl PageSegmentation {
    pub fn psm(&self) -> u8 {
        match self {
            PageSegmentation::UniformBlock => 6,
            PageSegmentation::Auto => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionOptions {
    pub languages: Vec<String>,
    pub whitelist: String,
    pub page_segmentation: PageSegmentation,
}

impl RecognitionOptions {
    pub fn with_page_segmentation(mut self, page_segmentation: PageSegmentation) -> Self {
        self.page_segmentation = page_segmentation;
        self
    }

    /// `tha+eng` style language hint.
    pub fn language_hint(&self) -> String {
        self.languages.join("+")
    }
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            languages: vec!["tha".into(), "eng".into()],
            whitelist: CHARACTER_WHITELIST.into(),
            page_segmentation: PageSegmentation::UniformBlock,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    pub image_png: Vec<u8>,
    pub options: RecognitionOptions,
}

/// Engine output. `confidence` is carried along for logging only.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecognizedText {
    pub text: String,
    pub confidence: Option<f32>,
}

impl RecognizedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(
        &self,
        request: RecognitionRequest,
    ) -> Result<RecognizedText, RecognitionError>;
}

/// Runs the `tesseract` CLI, piping the PNG through stdin. The child is killed
/// if the returned future is dropped.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: PathBuf,
}

impl TesseractRecognizer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn command_args(options: &RecognitionOptions) -> Vec<String> {
        vec![
            "stdin".into(),
            "stdout".into(),
            "-l".into(),
            options.language_hint(),
            "--psm".into(),
            options.page_segmentation.psm().to_string(),
            "-c".into(),
            format!("tessedit_char_whitelist={}", options.whitelist),
        ]
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize(
        &self,
        request: RecognitionRequest,
    ) -> Result<RecognizedText, RecognitionError> {
        let args = Self::command_args(&request.options);
        log_debug!("running {} {:?}", self.binary.display(), args);

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                RecognitionError::new(format!("failed to start {}: {err}", self.binary.display()))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RecognitionError::new("tesseract stdin unavailable"))?;
        let image = request.image_png;
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&image).await;
            drop(stdin);
            result
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|err| RecognitionError::new(format!("tesseract did not finish: {err}")))?;

        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log_warn!("failed to stream image to tesseract: {err}"),
            Err(err) => log_warn!("tesseract stdin writer panicked: {err}"),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognitionError::new(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8(output.stdout)
            .map_err(|_| RecognitionError::new("tesseract produced non UTF-8 output"))?;
        Ok(RecognizedText::new(text))
    }
}
