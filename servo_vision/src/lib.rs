// THEORY:
// This file is the main entry point for the `servo_vision` library crate.
//
// The crate is a closed-loop visual servo engine: it watches a frame stream,
// finds the dominant moving object, and keeps a pan/tilt head pointed at it
// while journaling every tracked position. The public surface is small:
// - `pipeline::ServoPipeline` turns one frame into a `CycleReport`
//   (mask, blobs, target, new actuator state, command to send).
// - `servo_loop::ServoLoop` owns the frame source, actuator link and motion
//   journal, and runs the sequential capture/control/transmit cycle.
// - `core_modules` holds the individual stages, usable on their own.
// - `error` holds the I/O failure taxonomy.

pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod servo_loop;

pub use crate::core_modules::actuator_controller::{ActuatorController, ActuatorState, ControllerConfig, StepRounding};
pub use crate::core_modules::actuator_link::{encode_command, ActuatorLink, SerialSettings};
pub use crate::core_modules::blob::{Blob, BoundingBox, Point};
pub use crate::core_modules::frame::frame::{Frame, FrameSource, FRAME_HEIGHT, FRAME_WIDTH};
pub use crate::core_modules::motion_journal::{MotionJournal, MotionLogEntry};
pub use crate::core_modules::target_selector::Target;
pub use crate::error::{CaptureError, JournalFlushError, LinkError, ServoError, TransmissionError};
pub use crate::pipeline::{CycleReport, ServoConfig, ServoPipeline, TransmitPolicy};
pub use crate::servo_loop::{CycleObserver, LoopControl, RunSummary, ServoLoop, StopReason};
