// THEORY:
// The `ActuatorController` turns "where is the target in the image" into
// "where should the pan/tilt head point". It is a single-step proportional law
// with a deadband, and it is a pure function of (target, previous state):
//
// 1.  **Offset**: `offset = target.centroid - frame_center`.
// 2.  **Deadband**: an axis whose |offset| is at or below `movement_threshold`
//     is left untouched this cycle.
// 3.  **Proportional Step**: `step = offset / gain_divisor` (rounded down by
//     default). The pan axis moves against the offset (`x -= step`), the tilt
//     axis follows it (`y += step`), which matches a mirrored pan servo.
// 4.  **Clamp**: both angles are saturated into `[min_angle, max_angle]` before
//     the state is handed back, so a transmitted command is always in range.
//
// The only state carried across frames is the `ActuatorState` itself, and it is
// owned by the caller. No integral or derivative terms, no time dependence.

use crate::core_modules::frame::frame::{FRAME_HEIGHT, FRAME_WIDTH};
use crate::core_modules::target_selector::Target;

/// Commanded pan (`x_angle`) and tilt (`y_angle`) angles, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActuatorState {
    pub x_angle: i32,
    pub y_angle: i32,
}

impl ActuatorState {
    /// The head pointing straight ahead.
    pub const CENTERED: ActuatorState = ActuatorState { x_angle: 90, y_angle: 90 };

    pub fn new(x_angle: i32, y_angle: i32) -> Self {
        Self { x_angle, y_angle }
    }
}

impl Default for ActuatorState {
    fn default() -> Self {
        Self::CENTERED
    }
}

/// How the pixel offset is scaled down to a whole-degree step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepRounding {
    /// Round towards negative infinity: `floor(offset / divisor)`.
    Floor,
    /// Round towards zero, symmetric for both directions.
    Truncate,
}

/// Gains and limits of the proportional law.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// The pixel the target is steered onto.
    pub frame_center: (i32, i32),
    /// Deadband half-width in pixels.
    pub movement_threshold: i32,
    /// Pixels of offset per degree of correction.
    pub gain_divisor: i32,
    pub min_angle: i32,
    pub max_angle: i32,
    pub rounding: StepRounding,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            frame_center: ((FRAME_WIDTH / 2) as i32, (FRAME_HEIGHT / 2) as i32),
            movement_threshold: 10,
            gain_divisor: 50,
            min_angle: 0,
            max_angle: 180,
            rounding: StepRounding::Floor,
        }
    }
}

/// The proportional pan/tilt controller.
#[derive(Debug, Clone, Default)]
pub struct ActuatorController {
    config: ControllerConfig,
}

impl ActuatorController {
    pub fn new(config: ControllerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Computes the next state. With no target the state is returned unchanged.
    pub fn update(&self, target: Option<&Target>, state: ActuatorState) -> ActuatorState {
        let Some(target) = target else {
            return state;
        };

        let centroid = target.centroid();
        let offset_x = centroid.x - self.config.frame_center.0;
        let offset_y = centroid.y - self.config.frame_center.1;

        let mut next = state;
        if offset_x.abs() > self.config.movement_threshold {
            next.x_angle -= self.step(offset_x);
        }
        if offset_y.abs() > self.config.movement_threshold {
            next.y_angle += self.step(offset_y);
        }

        self.clamp(next)
    }

    /// Saturates both angles into the configured range.
    pub fn clamp(&self, state: ActuatorState) -> ActuatorState {
        ActuatorState {
            x_angle: state.x_angle.clamp(self.config.min_angle, self.config.max_angle),
            y_angle: state.y_angle.clamp(self.config.min_angle, self.config.max_angle),
        }
    }

    fn step(&self, offset: i32) -> i32 {
        let divisor = self.config.gain_divisor.max(1);
        match self.config.rounding {
            StepRounding::Floor => offset.div_euclid(divisor),
            StepRounding::Truncate => offset / divisor,
        }
    }
}
