//! Camera collaborator boundary and the session that owns the live stream.

mod still;

pub use still::StillImageSource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DeviceError;
use crate::pipeline::ImageFrame;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FacingMode {
    Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaptureRequest {
    Preferred {
        facing: FacingMode,
        ideal_width: u32,
        ideal_height: u32,
    },
    Any,
}

impl CaptureRequest {
    /// Rear camera at 4K, the best case for reading small label print.
    pub fn rear_4k() -> Self {
        CaptureRequest::Preferred {
            facing: FacingMode::Environment,
            ideal_width: 3840,
            ideal_height: 2160,
        }
    }
}

pub trait CameraStream: Send {
    fn grab_frame(&mut self) -> Result<ImageFrame, DeviceError>;
    fn pause(&mut self);
    fn resume(&mut self);
    fn is_paused(&self) -> bool;
    /// Release every track. The stream must not be used afterwards.
    fn stop(&mut self);
}

#[async_trait]
pub trait CameraSource: Send + Sync {
    async fn open(&self, request: CaptureRequest) -> Result<Box<dyn CameraStream>, DeviceError>;
}

/// Holds at most one open stream.
#[derive(Default)]
pub struct CameraSession {
    stream: Option<Box<dyn CameraStream>>,
}

impl CameraSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_started(&self) -> bool {
        self.stream.is_some()
    }

    /// Stop any previous stream, then try the rear 4K camera and fall back to
    /// whatever the source offers.
    pub async fn start(&mut self, source: &dyn CameraSource) -> Result<(), DeviceError> {
        self.stop();

        let stream = match source.open(CaptureRequest::rear_4k()).await {
            Ok(stream) => stream,
            Err(preferred_err) => {
                log_warn!("rear camera unavailable ({preferred_err}); retrying with any camera");
                source.open(CaptureRequest::Any).await.map_err(|err| {
                    DeviceError::Unavailable(match err {
                        DeviceError::Unavailable(message) => message,
                        other => other.to_string(),
                    })
                })?
            }
        };

        log_info!("camera stream started");
        self.stream = Some(stream);
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            log_info!("camera stream stopped");
        }
    }

    pub fn stream_mut(&mut self) -> Result<&mut (dyn CameraStream + 'static), DeviceError> {
        self.stream.as_deref_mut().ok_or(DeviceError::NotStarted)
    }

    pub fn resume(&mut self) {
        if let Some(stream) = self.stream.as_deref_mut() {
            stream.resume();
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.stop();
    }
}
