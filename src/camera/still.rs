use std::path::PathBuf;

use async_trait::async_trait;

use super::{CameraSource, CameraStream, CaptureRequest};
use crate::error::DeviceError;
use crate::pipeline::ImageFrame;

/// Serves a photo from disk as if it were a live camera.
#[derive(Debug, Clone)]
pub struct StillImageSource {
    path: PathBuf,
}

impl StillImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CameraSource for StillImageSource {
    async fn open(&self, _request: CaptureRequest) -> Result<Box<dyn CameraStream>, DeviceError> {
        let path = self.path.clone();
        let frame = tokio::task::spawn_blocking(move || ImageFrame::load(&path))
            .await
            .map_err(|err| DeviceError::Unavailable(format!("image loader failed: {err}")))?
            .map_err(|err| DeviceError::Unavailable(format!("{err:#}")))?;

        Ok(Box::new(StillStream {
            frame: Some(frame),
            paused: false,
        }))
    }
}

struct StillStream {
    frame: Option<ImageFrame>,
    paused: bool,
}

impl CameraStream for StillStream {
    fn grab_frame(&mut self) -> Result<ImageFrame, DeviceError> {
        self.frame.clone().ok_or(DeviceError::NotStarted)
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn stop(&mut self) {
        self.frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[tokio::test]
    async fn serves_decoded_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label.png");
        RgbaImage::from_pixel(6, 3, Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let mut stream = StillImageSource::new(&path)
            .open(CaptureRequest::Any)
            .await
            .unwrap();
        let frame = stream.grab_frame().unwrap();
        assert_eq!((frame.width(), frame.height()), (6, 3));

        stream.stop();
        assert!(matches!(stream.grab_frame(), Err(DeviceError::NotStarted)));
    }

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let err = StillImageSource::new("/nonexistent/label.png")
            .open(CaptureRequest::rear_4k())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DeviceError::Unavailable(_)));
    }
}
