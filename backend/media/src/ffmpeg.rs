//! Camera stream backed by an `ffmpeg` child process.
//!
//! ffmpeg reads the capture device and writes a continuous MJPEG stream to
//! stdout; frames are cut on JPEG start/end markers. Stopping the stream kills
//! the process, which closes the device.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use payguide_core::{CameraFailure, ImageBuffer};
use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::camera::{CameraConstraints, CameraDevice, CameraStream};

/// How long to wait for a frame before giving up.
const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest buffered frame before the stream is considered corrupt.
const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

pub struct FfmpegCamera {
    ffmpeg_path: String,
    /// ffmpeg input format: `v4l2`, `avfoundation`, or `dshow`.
    input_format: String,
    device: String,
}

impl FfmpegCamera {
    pub fn new(ffmpeg_path: impl Into<String>, input_format: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            input_format: input_format.into(),
            device: device.into(),
        }
    }

    fn command(&self, constraints: &CameraConstraints) -> Command {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.args(["-hide_banner", "-loglevel", "error", "-f", &self.input_format]);
        if let (Some(w), Some(h)) = (constraints.width, constraints.height) {
            cmd.arg("-video_size").arg(format!("{w}x{h}"));
        }
        cmd.arg("-i")
            .arg(&self.device)
            .args(["-f", "mjpeg", "-q:v", "3", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Device nodes can be checked before ffmpeg is involved.
    fn probe_device_node(&self) -> Result<(), CameraFailure> {
        if self.input_format != "v4l2" {
            return Ok(());
        }
        let path = Path::new(&self.device);
        match std::fs::File::open(path) {
            Ok(_) => Ok(()),
            Err(e) => Err(classify_io_error(&e)),
        }
    }
}

fn classify_io_error(e: &std::io::Error) -> CameraFailure {
    match e.kind() {
        std::io::ErrorKind::NotFound => CameraFailure::NoDevice,
        std::io::ErrorKind::PermissionDenied => CameraFailure::PermissionDenied,
        _ => CameraFailure::Unsupported,
    }
}

/// Map ffmpeg's stderr to a failure reason.
pub fn classify_ffmpeg_stderr(stderr: &str) -> CameraFailure {
    let lower = stderr.to_lowercase();
    if lower.contains("permission denied") || lower.contains("not authorized") {
        CameraFailure::PermissionDenied
    } else if lower.contains("no such file") || lower.contains("no such device") || lower.contains("could not find") {
        CameraFailure::NoDevice
    } else if lower.contains("unknown input format") {
        CameraFailure::Unsupported
    } else {
        CameraFailure::ConstraintsUnsatisfiable
    }
}

#[async_trait]
impl CameraDevice for FfmpegCamera {
    fn name(&self) -> &str {
        &self.device
    }

    async fn open(&self, constraints: &CameraConstraints) -> Result<Box<dyn CameraStream>, CameraFailure> {
        self.probe_device_node()?;

        let mut child = self.command(constraints).spawn().map_err(|e| {
            warn!(ffmpeg = %self.ffmpeg_path, error = %e, "Failed to launch ffmpeg");
            CameraFailure::Unsupported
        })?;
        let stdout = child.stdout.take().ok_or(CameraFailure::Unsupported)?;

        let mut stream = FfmpegStream {
            child: Some(child),
            stdout: Some(BufReader::new(stdout)),
            buf: Vec::new(),
            source: self.device.clone(),
        };

        // The first frame proves the device accepted the settings.
        if let Err(failure) = stream.grab_frame().await {
            let reason = stream.failure_reason().await.unwrap_or(failure);
            stream.stop();
            return Err(reason);
        }

        info!(device = %self.device, "Camera stream live");
        Ok(Box::new(stream))
    }
}

pub struct FfmpegStream {
    child: Option<Child>,
    stdout: Option<BufReader<ChildStdout>>,
    buf: Vec<u8>,
    source: String,
}

impl FfmpegStream {
    /// Read stderr of an exited ffmpeg to find out why it stopped.
    async fn failure_reason(&mut self) -> Option<CameraFailure> {
        let child = self.child.as_mut()?;
        let mut stderr = child.stderr.take()?;
        let mut text = String::new();
        let read = tokio::time::timeout(Duration::from_secs(1), stderr.read_to_string(&mut text)).await;
        if read.is_err() || text.trim().is_empty() {
            return None;
        }
        debug!(stderr = %text.trim(), "ffmpeg exited");
        Some(classify_ffmpeg_stderr(&text))
    }

    async fn read_frame(&mut self) -> Result<Vec<u8>, CameraFailure> {
        let stdout = self.stdout.as_mut().ok_or(CameraFailure::NoDevice)?;
        let mut chunk = [0u8; 64 * 1024];
        loop {
            if let Some(frame) = extract_jpeg(&mut self.buf) {
                return Ok(frame);
            }
            if self.buf.len() > MAX_FRAME_BYTES {
                self.buf.clear();
                return Err(CameraFailure::ConstraintsUnsatisfiable);
            }
            let n = stdout
                .read(&mut chunk)
                .await
                .map_err(|e| classify_io_error(&e))?;
            if n == 0 {
                return Err(CameraFailure::ConstraintsUnsatisfiable);
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}

#[async_trait]
impl CameraStream for FfmpegStream {
    async fn grab_frame(&mut self) -> Result<ImageBuffer, CameraFailure> {
        let frame = tokio::time::timeout(FRAME_TIMEOUT, self.read_frame())
            .await
            .map_err(|_| CameraFailure::ConstraintsUnsatisfiable)??;
        Ok(ImageBuffer::new(frame, "image/jpeg", self.source.clone()))
    }

    fn stop(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                debug!(error = %e, "ffmpeg already exited");
            }
        }
    }

    fn is_active(&self) -> bool {
        self.child.is_some()
    }
}

impl Drop for FfmpegStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Cut the first complete JPEG (SOI `FF D8` .. EOI `FF D9`) out of `buf`.
///
/// Bytes before the SOI marker are discarded.
pub fn extract_jpeg(buf: &mut Vec<u8>) -> Option<Vec<u8>> {
    let start = buf.windows(2).position(|w| w == [0xFF, 0xD8])?;
    if start > 0 {
        buf.drain(..start);
    }
    let end = buf[2..].windows(2).position(|w| w == [0xFF, 0xD9])? + 2 + 2;
    Some(buf.drain(..end).collect())
}
