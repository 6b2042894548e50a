// THEORY:
// The `servo_loop` module is the driver that closes the loop. It owns the frame
// source, the actuator link, the pipeline and the motion journal for the whole
// run, and executes strictly sequential cycles:
//
//   capture -> detect -> select -> control -> transmit -> journal -> observe
//
// There is one thread and no overlap between cycles, so the actuator state and
// the journal need no locking. Cancellation is cooperative: after every cycle the
// observer (the operator console in the binary) is asked whether to continue.
//
// Exit paths:
// - The source runs dry: normal end of stream.
// - The observer asks to stop: normal cancellation.
// Both end with one journal flush, then the source and the link are released.
// A transmission failure is only logged; the next cycle tries again on the same
// channel. A failed journal flush is the terminal error of the run.

use crate::core_modules::actuator_link::ActuatorLink;
use crate::core_modules::frame::frame::{Frame, FrameSource};
use crate::core_modules::motion_journal::{MotionJournal, MotionLogEntry};
use crate::error::ServoError;
use crate::pipeline::{CycleReport, ServoPipeline};
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// What the observer wants the loop to do after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Cancel,
}

/// Called once per cycle with the frame and what was derived from it.
/// This is where the operator's cancel signal is polled.
pub trait CycleObserver {
    fn observe(&mut self, frame: &Frame, report: &CycleReport) -> LoopControl;
}

impl<F> CycleObserver for F
where
    F: FnMut(&Frame, &CycleReport) -> LoopControl,
{
    fn observe(&mut self, frame: &Frame, report: &CycleReport) -> LoopControl {
        self(frame, report)
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    Cancelled,
}

/// Counters reported once the run is over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub targets: u64,
    pub commands_sent: u64,
    pub transmission_failures: u64,
    pub journal_entries: usize,
    pub stop_reason: StopReason,
}

/// The closed sensing/actuation loop and the resources it owns.
pub struct ServoLoop<S: FrameSource, W: Write> {
    source: S,
    link: ActuatorLink<W>,
    pipeline: ServoPipeline,
    journal: MotionJournal,
    journal_path: PathBuf,
}

impl<S: FrameSource, W: Write> ServoLoop<S, W> {
    pub fn new(source: S, link: ActuatorLink<W>, pipeline: ServoPipeline, journal_path: impl Into<PathBuf>) -> Self {
        Self {
            source,
            link,
            pipeline,
            journal: MotionJournal::new(),
            journal_path: journal_path.into(),
        }
    }

    /// Runs until the source is exhausted or the observer cancels, then flushes
    /// the journal and releases the source and the link.
    pub fn run<O: CycleObserver>(self, observer: &mut O) -> Result<RunSummary, ServoError> {
        let ServoLoop {
            mut source,
            mut link,
            mut pipeline,
            mut journal,
            journal_path,
        } = self;

        info!("Servo loop started at {:?}", pipeline.state());
        let mut cycles: u64 = 0;
        let mut targets: u64 = 0;

        let stop_reason = loop {
            // --- 1. Capture ---
            let Some(frame) = source.next_frame() else {
                info!("Frame source exhausted after {} cycles", cycles);
                break StopReason::EndOfStream;
            };
            cycles += 1;

            // --- 2. Detect, Select, Control ---
            let report = pipeline.process_frame(&frame);

            // --- 3. Transmit ---
            if let Some(command) = report.command {
                if let Err(err) = link.send(command) {
                    warn!("Actuator transmission failed: {}", err);
                }
            }

            // --- 4. Journal ---
            if let Some(target) = &report.target {
                targets += 1;
                journal.record(MotionLogEntry::now(target.centroid()));
            }

            // --- 5. Observe & Poll Cancel ---
            if observer.observe(&frame, &report) == LoopControl::Cancel {
                info!("Servo loop cancelled by operator after {} cycles", cycles);
                break StopReason::Cancelled;
            }
        };

        let flushed = journal.flush(&journal_path);

        let summary = RunSummary {
            cycles,
            targets,
            commands_sent: link.commands_sent(),
            transmission_failures: link.failures(),
            journal_entries: journal.len(),
            stop_reason,
        };

        drop(source);
        drop(link);

        match flushed {
            Ok(_) => Ok(summary),
            Err(err) => {
                error!("Motion journal could not be written to {}: {}", journal_path.display(), err);
                Err(err.into())
            }
        }
    }
}
