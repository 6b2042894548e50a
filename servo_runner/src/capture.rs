use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use servo_vision::{CaptureError, Frame, FrameSource, FRAME_HEIGHT, FRAME_WIDTH};
use std::path::PathBuf;
use tracing::{info, warn};

/// Where frames come from.
#[derive(Debug, Clone)]
pub enum CaptureTarget {
    /// A local camera by device index.
    Device(i32),
    /// A recorded video file, replayed as if it were live.
    File(PathBuf),
}

impl CaptureTarget {
    fn describe(&self) -> String {
        match self {
            CaptureTarget::Device(index) => format!("camera {index}"),
            CaptureTarget::File(path) => format!("video file {}", path.display()),
        }
    }
}

/// An OpenCV-backed frame source. Frames are resized to 640x480 and converted
/// from BGR to RGB before they enter the engine.
pub struct CameraSource {
    capture: VideoCapture,
    raw: Mat,
    resized: Mat,
    rgb: Mat,
}

impl CameraSource {
    /// Opens the device. Failing here aborts the run before the loop starts.
    pub fn open(target: &CaptureTarget) -> Result<Self, CaptureError> {
        let unavailable = |reason: String| CaptureError::Unavailable {
            device: target.describe(),
            reason,
        };

        let capture = match target {
            CaptureTarget::Device(index) => VideoCapture::new(*index, videoio::CAP_ANY),
            CaptureTarget::File(path) => {
                let path = path.to_str().ok_or_else(|| unavailable("path is not valid UTF-8".to_string()))?;
                VideoCapture::from_file(path, videoio::CAP_ANY)
            }
        }
        .map_err(|e| unavailable(e.message))?;

        if !capture.is_opened().map_err(|e| unavailable(e.message))? {
            return Err(unavailable("device did not open".to_string()));
        }

        info!("Capture opened: {}", target.describe());
        Ok(Self {
            capture,
            raw: Mat::default(),
            resized: Mat::default(),
            rgb: Mat::default(),
        })
    }

    fn convert(&mut self) -> opencv::Result<Frame> {
        imgproc::resize(
            &self.raw,
            &mut self.resized,
            core::Size::new(FRAME_WIDTH as i32, FRAME_HEIGHT as i32),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;
        imgproc::cvt_color(&self.resized, &mut self.rgb, imgproc::COLOR_BGR2RGB, 0)?;
        let bytes = self.rgb.data_bytes()?.to_vec();
        Frame::from_rgb_bytes(FRAME_WIDTH, FRAME_HEIGHT, bytes)
            .ok_or_else(|| opencv::Error::new(core::StsError, "frame buffer size mismatch".to_string()))
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Option<Frame> {
        match self.capture.read(&mut self.raw) {
            Ok(true) if !self.raw.empty() => {}
            Ok(_) => return None,
            Err(e) => {
                warn!("Error reading frame, treating as end of stream: {}", e);
                return None;
            }
        }

        match self.convert() {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!("Could not convert captured frame, treating as end of stream: {}", e);
                None
            }
        }
    }
}
