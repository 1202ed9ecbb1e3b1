//! Camera abstraction and single-stream session.
//!
//! A [`CameraSession`] holds at most one live stream. Every path out of the
//! session (capture, reset, restart) stops the stream's tracks.

use std::sync::Arc;

use async_trait::async_trait;
use payguide_core::{CameraFailure, ImageBuffer, ScanError};
use tracing::{debug, info};

/// Requested capture settings. `None` keeps the device's native value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraConstraints {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A camera that can be asked for a live stream.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    fn name(&self) -> &str;

    /// Request access. May block while the platform prompts the user.
    async fn open(&self, constraints: &CameraConstraints) -> Result<Box<dyn CameraStream>, CameraFailure>;
}

/// A live video source.
#[async_trait]
pub trait CameraStream: Send {
    /// Grab the next complete frame as an encoded image.
    async fn grab_frame(&mut self) -> Result<ImageBuffer, CameraFailure>;

    /// Stop all underlying tracks. Calling it twice is a no-op.
    fn stop(&mut self);

    fn is_active(&self) -> bool;
}

pub struct CameraSession {
    device: Arc<dyn CameraDevice>,
    constraints: CameraConstraints,
    stream: Option<Box<dyn CameraStream>>,
}

impl CameraSession {
    pub fn new(device: Arc<dyn CameraDevice>, constraints: CameraConstraints) -> Self {
        Self {
            device,
            constraints,
            stream: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.stream.as_ref().is_some_and(|s| s.is_active())
    }

    /// Open a fresh stream, releasing any previous one first.
    pub async fn start(&mut self) -> Result<(), CameraFailure> {
        self.release();
        info!(device = %self.device.name(), "Requesting camera stream");
        let stream = self.device.open(&self.constraints).await?;
        self.stream = Some(stream);
        Ok(())
    }

    /// Grab one frame and release the stream, whether or not the grab worked.
    pub async fn capture(&mut self) -> Result<ImageBuffer, ScanError> {
        let Some(mut stream) = self.stream.take() else {
            return Err(ScanError::CameraUnavailable(CameraFailure::NoDevice));
        };
        let frame = stream.grab_frame().await;
        stream.stop();
        debug!(device = %self.device.name(), ok = frame.is_ok(), "Camera released after capture");
        frame.map_err(ScanError::CameraUnavailable)
    }

    /// Stop the current stream, if any. Returns whether one was running.
    pub fn release(&mut self) -> bool {
        match self.stream.take() {
            Some(mut stream) => {
                stream.stop();
                debug!(device = %self.device.name(), "Camera stream released");
                true
            }
            None => false,
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.release();
    }
}
