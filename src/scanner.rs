//! Scan controller: camera → pipeline → recognizer → speech.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::Local;
use tokio::time;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::camera::{CameraSession, CameraSource};
use crate::db::{ParsedDrugRecord, SavedDrugEntry};
use crate::error::{DeviceError, ScanError};
use crate::history::HistoryStore;
use crate::pipeline::{
    CleanedText, ImageFrame, RecognitionRequest, RecognizedText, ScanPipeline, TextRecognizer,
};
use crate::speech::{build_utterance, SpeechSynthesizer, Voice};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub scan_id: String,
    pub raw_text: RecognizedText,
    pub cleaned_text: CleanedText,
    pub record: ParsedDrugRecord,
}

pub struct ScanSession {
    camera: CameraSession,
    pipeline: ScanPipeline,
    recognizer: Arc<dyn TextRecognizer>,
    speech: Arc<dyn SpeechSynthesizer>,
    voices: Vec<Voice>,
}

impl ScanSession {
    pub fn new(
        pipeline: ScanPipeline,
        recognizer: Arc<dyn TextRecognizer>,
        speech: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        let voices = speech.voices();
        Self {
            camera: CameraSession::new(),
            pipeline,
            recognizer,
            speech,
            voices,
        }
    }

    pub fn pipeline(&self) -> &ScanPipeline {
        &self.pipeline
    }

    pub async fn start_camera(&mut self, source: &dyn CameraSource) -> Result<(), DeviceError> {
        self.camera.start(source).await
    }

    pub fn stop_camera(&mut self) {
        self.camera.stop();
    }

    /// Capture the current frame and read the label. The stream stays paused
    /// on success so the result can be reviewed; any failure resumes it.
    pub async fn scan(&mut self, cancel: &CancellationToken) -> Result<ScanOutcome, ScanError> {
        let scan_id = Uuid::new_v4().to_string();

        let frame = {
            let stream = self.camera.stream_mut()?;
            let frame = stream.grab_frame()?;
            stream.pause();
            frame
        };
        log_info!(
            "scan {scan_id}: captured {}x{} frame",
            frame.width(),
            frame.height()
        );

        let raw = match self.read_frame(frame, cancel).await {
            Ok(raw) => raw,
            Err(err) => {
                log_warn!("scan {scan_id} failed: {err}");
                self.camera.resume();
                return Err(err);
            }
        };
        log_debug!("scan {scan_id}: recognized {:?}", raw.text);

        let (cleaned_text, record) = self.pipeline.interpret(&raw);
        log_info!(
            "scan {scan_id}: name='{}' dose='{}' meals='{}'",
            record.name,
            record.dose,
            record.meal_timing
        );

        self.announce(&record);

        Ok(ScanOutcome {
            scan_id,
            raw_text: raw,
            cleaned_text,
            record,
        })
    }

    /// Speak `record`, cutting off anything still playing.
    pub fn announce(&mut self, record: &ParsedDrugRecord) {
        self.speech.cancel();
        if self.voices.is_empty() {
            self.voices = self.speech.voices();
        }
        self.speech.speak(build_utterance(record, &self.voices));
    }

    /// Close the result: silence speech and resume the video.
    pub fn dismiss(&mut self) {
        self.speech.cancel();
        self.camera.resume();
    }

    pub async fn commit(
        &self,
        record: &ParsedDrugRecord,
        history: &HistoryStore,
    ) -> Result<SavedDrugEntry> {
        history.commit(record, &Local::now()).await
    }

    async fn read_frame(
        &self,
        frame: ImageFrame,
        cancel: &CancellationToken,
    ) -> Result<RecognizedText, ScanError> {
        let pipeline = self.pipeline.clone();
        let request = tokio::task::spawn_blocking(move || pipeline.prepare(&frame))
            .await
            .map_err(|err| ScanError::Worker(err.to_string()))??;

        let recognizer = self.recognizer.clone();
        let timeout = self.pipeline.ocr_timeout();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ScanError::Cancelled),
            result = recognize_within(recognizer.as_ref(), request, timeout) => result,
        }
    }
}

async fn recognize_within(
    recognizer: &dyn TextRecognizer,
    request: RecognitionRequest,
    timeout: Option<Duration>,
) -> Result<RecognizedText, ScanError> {
    let recognition = recognizer.recognize(request);
    match timeout {
        Some(limit) => time::timeout(limit, recognition)
            .await
            .map_err(|_| ScanError::Timeout(limit))?
            .map_err(ScanError::from),
        None => recognition.await.map_err(ScanError::from),
    }
}
