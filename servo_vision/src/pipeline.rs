// THEORY:
// The `pipeline` module is the per-frame API of the servo engine. It strings the
// core modules together into one call:
//
//   Frame -> BackgroundModel -> binarize -> BlobExtractor -> TargetSelector
//         -> ActuatorController -> (command to transmit, if any)
//
// `ServoPipeline` owns the two pieces of state that survive between frames: the
// background model and the current `ActuatorState`. Everything else in a
// `CycleReport` is derived from the current frame and dropped with it.
//
// The pipeline does no I/O. Capturing, transmitting and journaling are done by
// the `servo_loop` driver, which makes the whole control law testable with
// synthetic frames.

use crate::core_modules::actuator_controller::{ActuatorController, ActuatorState, ControllerConfig};
use crate::core_modules::background_model::{BackgroundModel, BackgroundModelConfig, ForegroundMask};
use crate::core_modules::blob::Blob;
use crate::core_modules::blob_extractor::{blob_extractor, DEFAULT_MIN_BLOB_AREA};
use crate::core_modules::frame::frame::Frame;
use crate::core_modules::target_selector::{target_selector, Target};
use tracing::debug;

/// When a command is sent to the actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitPolicy {
    /// Every cycle with a target, even if the angles did not change.
    EveryTarget,
    /// Only cycles in which the angles actually changed.
    OnAdjustment,
}

/// Configuration for the ServoPipeline.
#[derive(Debug, Clone)]
pub struct ServoConfig {
    pub background: BackgroundModelConfig,
    /// Mask values strictly above this become foreground; shadows sit at 127.
    pub mask_threshold: u8,
    /// Blobs must have strictly more pixels than this.
    pub min_blob_area: u32,
    pub controller: ControllerConfig,
    pub initial_state: ActuatorState,
    pub transmit_policy: TransmitPolicy,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            background: BackgroundModelConfig::default(),
            mask_threshold: 127,
            min_blob_area: DEFAULT_MIN_BLOB_AREA,
            controller: ControllerConfig::default(),
            initial_state: ActuatorState::CENTERED,
            transmit_policy: TransmitPolicy::EveryTarget,
        }
    }
}

/// Everything the pipeline derived from one frame.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// The binary foreground mask.
    pub mask: ForegroundMask,
    /// All filtered blobs, in extraction order.
    pub blobs: Vec<Blob>,
    pub target: Option<Target>,
    /// Actuator state after this cycle.
    pub state: ActuatorState,
    /// The state to transmit this cycle, if any.
    pub command: Option<ActuatorState>,
}

/// The main, top-level struct for one frame's worth of sensing and control.
pub struct ServoPipeline {
    background_model: BackgroundModel,
    controller: ActuatorController,
    config: ServoConfig,
    state: ActuatorState,
}

impl ServoPipeline {
    pub fn new(config: ServoConfig) -> Self {
        let controller = ActuatorController::new(config.controller.clone());
        let state = controller.clamp(config.initial_state);
        Self {
            background_model: BackgroundModel::new(config.background.clone()),
            controller,
            config,
            state,
        }
    }

    pub fn process_frame(&mut self, frame: &Frame) -> CycleReport {
        // Stage 1: Background Subtraction
        let raw_mask = self.background_model.classify(frame);
        let mask = raw_mask.binarize(self.config.mask_threshold);

        // Stage 2: Blob Extraction
        let blobs = blob_extractor::find_blobs(&mask, self.config.min_blob_area);

        // Stage 3: Target Selection
        let target = target_selector::select(&blobs);

        // Stage 4: Proportional Control
        let previous = self.state;
        self.state = self.controller.update(target.as_ref(), previous);

        let command = match (&target, self.config.transmit_policy) {
            (None, _) => None,
            (Some(_), TransmitPolicy::EveryTarget) => Some(self.state),
            (Some(_), TransmitPolicy::OnAdjustment) => (self.state != previous).then_some(self.state),
        };

        debug!(
            blobs = blobs.len(),
            centroid = ?target.as_ref().map(|t| (t.centroid().x, t.centroid().y)),
            x_angle = self.state.x_angle,
            y_angle = self.state.y_angle,
            "cycle processed"
        );

        CycleReport {
            mask,
            blobs,
            target,
            state: self.state,
            command,
        }
    }

    pub fn state(&self) -> ActuatorState {
        self.state
    }

    pub fn config(&self) -> &ServoConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::blob::Point;
    use image::{Rgb, RgbImage};

    fn scene(square_center: Option<(u32, u32)>) -> Frame {
        let mut image = RgbImage::from_pixel(640, 480, Rgb([40, 40, 40]));
        if let Some((cx, cy)) = square_center {
            for y in cy - 30..cy + 30 {
                for x in cx - 30..cx + 30 {
                    image.put_pixel(x, y, Rgb([250, 250, 250]));
                }
            }
        }
        Frame::normalize(image)
    }

    fn warmed_up(config: ServoConfig) -> ServoPipeline {
        let mut pipeline = ServoPipeline::new(config);
        for _ in 0..3 {
            let report = pipeline.process_frame(&scene(None));
            assert!(report.target.is_none());
            assert!(report.command.is_none());
        }
        pipeline
    }

    #[test]
    fn empty_scene_leaves_the_head_centered() {
        let pipeline = warmed_up(ServoConfig::default());
        assert_eq!(pipeline.state(), ActuatorState::CENTERED);
    }

    #[test]
    fn object_right_of_center_yields_command() {
        let mut pipeline = warmed_up(ServoConfig::default());
        let report = pipeline.process_frame(&scene(Some((400, 240))));

        assert_eq!(report.blobs.len(), 1);
        assert_eq!(report.target.as_ref().map(Target::centroid), Some(Point { x: 400, y: 240 }));
        assert_eq!(report.state, ActuatorState::new(89, 90));
        assert_eq!(report.command, Some(ActuatorState::new(89, 90)));
    }

    #[test]
    fn centered_object_still_commands_by_default() {
        let mut pipeline = warmed_up(ServoConfig::default());
        let report = pipeline.process_frame(&scene(Some((320, 240))));
        assert_eq!(report.command, Some(ActuatorState::CENTERED));
    }

    #[test]
    fn on_adjustment_policy_skips_unchanged_state() {
        let config = ServoConfig {
            transmit_policy: TransmitPolicy::OnAdjustment,
            ..ServoConfig::default()
        };
        let mut pipeline = warmed_up(config);
        let report = pipeline.process_frame(&scene(Some((320, 240))));
        assert!(report.target.is_some());
        assert_eq!(report.command, None);
    }

    #[test]
    fn initial_state_is_clamped() {
        let config = ServoConfig {
            initial_state: ActuatorState::new(250, -3),
            ..ServoConfig::default()
        };
        let pipeline = ServoPipeline::new(config);
        assert_eq!(pipeline.state(), ActuatorState::new(180, 0));
    }
}
