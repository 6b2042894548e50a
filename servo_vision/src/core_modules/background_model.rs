// THEORY:
// The `BackgroundModel` is the temporal analysis layer of the servo engine. It
// is a stateful, learning entity that keeps a running statistical estimate of
// what the static scene looks like at every pixel, and classifies each new
// pixel as background, shadow, or foreground against that estimate.
//
// Per pixel it keeps:
// 1.  **Mean**: the running average colour of the background (RGB, f32).
// 2.  **Variance**: a single isotropic variance shared by the three channels.
//
// Classification of a pixel `x` against mean `m` and variance `v`:
// - Background when the squared distance `|x - m|^2` is below
//   `var_threshold * v`. The mean and variance adapt towards `x`.
// - Shadow when `x` is a darker copy of `m`: the brightness ratio
//   `a = (x . m) / (m . m)` lies in `[shadow_tau, 1]` and `x` is close to
//   `a * m`. Shadows are labelled `SHADOW_VALUE` so the binarization step can
//   drop them.
// - Foreground otherwise. Only the mean adapts (slowly), so an object that stops
//   moving is absorbed into the background after roughly `history` frames.
//
// The learning rate is `1 / min(2 * frames_seen, history)`: fast while the model
// is young, settling to `1 / history` once it has seen enough frames. The very
// first frame seeds the model and is reported as pure background.

use crate::core_modules::frame::frame::Frame;
use image::{GrayImage, Luma};

/// Mask value of a background pixel.
pub const BACKGROUND_VALUE: u8 = 0;
/// Mask value of a pixel classified as a cast shadow.
pub const SHADOW_VALUE: u8 = 127;
/// Mask value of a foreground pixel.
pub const FOREGROUND_VALUE: u8 = 255;

/// Tunables of the adaptive background model.
#[derive(Debug, Clone)]
pub struct BackgroundModelConfig {
    /// Number of frames the model effectively remembers.
    pub history: u32,
    /// Squared-distance threshold, in units of the pixel variance.
    pub var_threshold: f32,
    /// Variance assigned to every pixel when the model is seeded.
    pub var_init: f32,
    pub var_min: f32,
    pub var_max: f32,
    /// Label darker copies of the background as shadows instead of foreground.
    pub detect_shadows: bool,
    /// Lowest brightness ratio still accepted as a shadow.
    pub shadow_tau: f32,
}

impl Default for BackgroundModelConfig {
    fn default() -> Self {
        Self {
            history: 500,
            var_threshold: 16.0,
            var_init: 15.0,
            var_min: 4.0,
            var_max: 75.0,
            detect_shadows: true,
            shadow_tau: 0.5,
        }
    }
}

/// A per-frame classification of every pixel, same dimensions as the frame.
#[derive(Debug, Clone)]
pub struct ForegroundMask {
    mask: GrayImage,
}

impl ForegroundMask {
    pub fn new(mask: GrayImage) -> Self {
        Self { mask }
    }

    pub fn width(&self) -> u32 {
        self.mask.width()
    }

    pub fn height(&self) -> u32 {
        self.mask.height()
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.mask.get_pixel(x, y).0[0]
    }

    pub fn as_raw(&self) -> &[u8] {
        self.mask.as_raw()
    }

    pub fn image(&self) -> &GrayImage {
        &self.mask
    }

    /// Thresholds the mask to strict binary: values above `threshold` become
    /// `FOREGROUND_VALUE`, everything else `BACKGROUND_VALUE`.
    pub fn binarize(&self, threshold: u8) -> ForegroundMask {
        let mut binary = self.mask.clone();
        for pixel in binary.pixels_mut() {
            pixel.0[0] = if pixel.0[0] > threshold { FOREGROUND_VALUE } else { BACKGROUND_VALUE };
        }
        ForegroundMask { mask: binary }
    }

    /// Number of pixels with the foreground value.
    pub fn foreground_count(&self) -> usize {
        self.mask.as_raw().iter().filter(|&&v| v == FOREGROUND_VALUE).count()
    }
}

/// The running statistical estimate of the static scene.
pub struct BackgroundModel {
    config: BackgroundModelConfig,
    width: u32,
    height: u32,
    /// Background colour estimate, one entry per pixel.
    mean: Vec<[f32; 3]>,
    /// Background variance estimate, one entry per pixel.
    variance: Vec<f32>,
    frames_seen: u32,
}

impl BackgroundModel {
    pub fn new(config: BackgroundModelConfig) -> Self {
        Self {
            config,
            width: 0,
            height: 0,
            mean: Vec::new(),
            variance: Vec::new(),
            frames_seen: 0,
        }
    }

    /// How many frames have been folded into the model.
    pub fn frames_seen(&self) -> u32 {
        self.frames_seen
    }

    /// Classifies every pixel of `frame` and folds the frame into the model.
    pub fn classify(&mut self, frame: &Frame) -> ForegroundMask {
        if self.frames_seen == 0 || frame.width() != self.width || frame.height() != self.height {
            self.seed(frame);
            return ForegroundMask::new(GrayImage::new(frame.width(), frame.height()));
        }

        self.frames_seen = self.frames_seen.saturating_add(1);
        let alpha = self.learning_rate();
        let threshold = self.config.var_threshold;
        let mut mask = GrayImage::new(self.width, self.height);

        for (i, rgb) in frame.as_raw().chunks_exact(3).enumerate() {
            let x = [rgb[0] as f32, rgb[1] as f32, rgb[2] as f32];
            let m = self.mean[i];
            let v = self.variance[i];
            let d = [x[0] - m[0], x[1] - m[1], x[2] - m[2]];
            let dist2 = d[0] * d[0] + d[1] * d[1] + d[2] * d[2];

            let label = if dist2 < threshold * v {
                self.mean[i] = [m[0] + alpha * d[0], m[1] + alpha * d[1], m[2] + alpha * d[2]];
                self.variance[i] = (v + alpha * (dist2 - v)).clamp(self.config.var_min, self.config.var_max);
                BACKGROUND_VALUE
            } else {
                self.mean[i] = [m[0] + alpha * d[0], m[1] + alpha * d[1], m[2] + alpha * d[2]];
                if self.config.detect_shadows && self.is_shadow(&x, &m, v) {
                    SHADOW_VALUE
                } else {
                    FOREGROUND_VALUE
                }
            };

            let px = i as u32 % self.width;
            let py = i as u32 / self.width;
            mask.put_pixel(px, py, Luma([label]));
        }

        ForegroundMask::new(mask)
    }

    fn seed(&mut self, frame: &Frame) {
        self.width = frame.width();
        self.height = frame.height();
        self.mean = frame
            .as_raw()
            .chunks_exact(3)
            .map(|rgb| [rgb[0] as f32, rgb[1] as f32, rgb[2] as f32])
            .collect();
        self.variance = vec![self.config.var_init; self.mean.len()];
        self.frames_seen = 1;
    }

    fn learning_rate(&self) -> f32 {
        let window = (2 * self.frames_seen as u64).min(self.config.history.max(1) as u64);
        1.0 / window as f32
    }

    /// A shadow is a uniformly darkened copy of the background colour.
    fn is_shadow(&self, x: &[f32; 3], m: &[f32; 3], variance: f32) -> bool {
        let denom = m[0] * m[0] + m[1] * m[1] + m[2] * m[2];
        if denom <= f32::EPSILON {
            return false;
        }
        let a = (x[0] * m[0] + x[1] * m[1] + x[2] * m[2]) / denom;
        if a < self.config.shadow_tau || a > 1.0 {
            return false;
        }
        let residual = [a * m[0] - x[0], a * m[1] - x[1], a * m[2] - x[2]];
        let dist2 = residual[0] * residual[0] + residual[1] * residual[1] + residual[2] * residual[2];
        dist2 < self.config.var_threshold * variance * a * a
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn uniform(value: u8) -> Frame {
        Frame::normalize(RgbImage::from_pixel(640, 480, Rgb([value, value, value])))
    }

    fn with_square(background: u8, colour: [u8; 3], x0: u32, y0: u32, size: u32) -> Frame {
        let mut image = RgbImage::from_pixel(640, 480, Rgb([background; 3]));
        for y in y0..y0 + size {
            for x in x0..x0 + size {
                image.put_pixel(x, y, Rgb(colour));
            }
        }
        Frame::normalize(image)
    }

    #[test]
    fn first_frame_seeds_an_empty_mask() {
        let mut model = BackgroundModel::new(BackgroundModelConfig::default());
        let mask = model.classify(&uniform(80));
        assert_eq!(mask.foreground_count(), 0);
        assert_eq!((mask.width(), mask.height()), (640, 480));
        assert_eq!(model.frames_seen(), 1);
    }

    #[test]
    fn static_scene_stays_background() {
        let mut model = BackgroundModel::new(BackgroundModelConfig::default());
        for _ in 0..10 {
            let mask = model.classify(&uniform(80));
            assert_eq!(mask.foreground_count(), 0);
        }
    }

    #[test]
    fn bright_object_is_foreground() {
        let mut model = BackgroundModel::new(BackgroundModelConfig::default());
        for _ in 0..5 {
            model.classify(&uniform(40));
        }
        let mask = model.classify(&with_square(40, [255, 255, 255], 100, 100, 50));
        assert_eq!(mask.get(120, 120), FOREGROUND_VALUE);
        assert_eq!(mask.get(10, 10), BACKGROUND_VALUE);
        assert_eq!(mask.foreground_count(), 50 * 50);
    }

    #[test]
    fn darkened_patch_is_a_shadow() {
        let mut model = BackgroundModel::new(BackgroundModelConfig::default());
        for _ in 0..5 {
            model.classify(&uniform(200));
        }
        let mask = model.classify(&with_square(200, [140, 140, 140], 300, 200, 40));
        assert_eq!(mask.get(310, 210), SHADOW_VALUE);

        let binary = mask.binarize(127);
        assert_eq!(binary.get(310, 210), BACKGROUND_VALUE);
        assert_eq!(binary.foreground_count(), 0);
    }

    #[test]
    fn shadows_can_be_disabled() {
        let config = BackgroundModelConfig {
            detect_shadows: false,
            ..BackgroundModelConfig::default()
        };
        let mut model = BackgroundModel::new(config);
        for _ in 0..5 {
            model.classify(&uniform(200));
        }
        let mask = model.classify(&with_square(200, [140, 140, 140], 300, 200, 40));
        assert_eq!(mask.get(310, 210), FOREGROUND_VALUE);
    }

    #[test]
    fn binarize_is_strictly_above_threshold() {
        let mut gray = GrayImage::new(3, 1);
        gray.put_pixel(0, 0, Luma([50]));
        gray.put_pixel(1, 0, Luma([51]));
        gray.put_pixel(2, 0, Luma([255]));
        let binary = ForegroundMask::new(gray).binarize(50);
        assert_eq!(binary.as_raw(), &[0, 255, 255]);
    }

    #[test]
    fn stopped_object_is_absorbed() {
        let config = BackgroundModelConfig {
            history: 4,
            ..BackgroundModelConfig::default()
        };
        let mut model = BackgroundModel::new(config);
        model.classify(&uniform(40));
        model.classify(&uniform(40));

        let parked = with_square(40, [255, 255, 255], 200, 200, 30);
        let first = model.classify(&parked);
        assert_eq!(first.foreground_count(), 30 * 30);

        let mut last = first;
        for _ in 0..20 {
            last = model.classify(&parked);
        }
        assert_eq!(last.foreground_count(), 0);
    }
}
