use opencv::{
    core::{self, Mat, Rect, Scalar},
    highgui, imgproc,
    prelude::*,
};
use servo_vision::{CycleReport, Frame, LoopControl};
use tokio::sync::watch;
use tracing::warn;

const FRAME_WINDOW: &str = "Motion Detection";
const MASK_WINDOW: &str = "Mask";
const CANCEL_KEY: i32 = 'q' as i32;

/// The two diagnostic windows. Closed again when dropped.
pub struct DiagnosticDisplay {
    canvas: Mat,
}

impl DiagnosticDisplay {
    pub fn open() -> opencv::Result<Self> {
        highgui::named_window(FRAME_WINDOW, highgui::WINDOW_AUTOSIZE)?;
        highgui::named_window(MASK_WINDOW, highgui::WINDOW_AUTOSIZE)?;
        Ok(Self { canvas: Mat::default() })
    }

    /// Draws the frame with a green box around every blob, shows the mask,
    /// and polls the keyboard once. Returns true if the cancel key was pressed.
    pub fn show(&mut self, frame: &Frame, report: &CycleReport) -> opencv::Result<bool> {
        let size = core::Size::new(frame.width() as i32, frame.height() as i32);

        let mut rgb = Mat::new_size_with_default(size, core::CV_8UC3, Scalar::all(0.0))?;
        rgb.data_bytes_mut()?.copy_from_slice(frame.as_raw());
        imgproc::cvt_color(&rgb, &mut self.canvas, imgproc::COLOR_RGB2BGR, 0)?;

        for blob in &report.blobs {
            let bbox = blob.bounding_box;
            let rect = Rect::new(bbox.x, bbox.y, bbox.width, bbox.height);
            let green = Scalar::new(0.0, 255.0, 0.0, 0.0);
            imgproc::rectangle(&mut self.canvas, rect, green, 2, imgproc::LINE_8, 0)?;
        }

        let mut mask = Mat::new_size_with_default(size, core::CV_8UC1, Scalar::all(0.0))?;
        mask.data_bytes_mut()?.copy_from_slice(report.mask.as_raw());

        highgui::imshow(FRAME_WINDOW, &self.canvas)?;
        highgui::imshow(MASK_WINDOW, &mask)?;

        let key = highgui::wait_key(1)?;
        Ok(key >= 0 && (key & 0xFF) == CANCEL_KEY)
    }
}

impl Drop for DiagnosticDisplay {
    fn drop(&mut self) {
        // Best effort teardown on drop
        let _ = highgui::destroy_all_windows();
    }
}

/// Polls the operator's cancel signals once per cycle: the `q` key in the
/// diagnostic window (when there is one) and Ctrl-C from the terminal.
pub struct OperatorConsole {
    display: Option<DiagnosticDisplay>,
    interrupted: watch::Receiver<bool>,
}

impl OperatorConsole {
    pub fn new(display: Option<DiagnosticDisplay>, interrupted: watch::Receiver<bool>) -> Self {
        Self { display, interrupted }
    }

    pub fn poll(&mut self, frame: &Frame, report: &CycleReport) -> LoopControl {
        if *self.interrupted.borrow() {
            return LoopControl::Cancel;
        }

        let Some(display) = self.display.as_mut() else {
            return LoopControl::Continue;
        };

        match display.show(frame, report) {
            Ok(true) => LoopControl::Cancel,
            Ok(false) => LoopControl::Continue,
            Err(e) => {
                warn!("Diagnostic display failed, continuing headless: {}", e);
                self.display = None;
                LoopControl::Continue
            }
        }
    }
}
