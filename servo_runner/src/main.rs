mod capture;
mod console;

use anyhow::Context;
use capture::{CameraSource, CaptureTarget};
use clap::Parser;
use console::{DiagnosticDisplay, OperatorConsole};
use servo_vision::{
    ActuatorLink, ControllerConfig, CycleReport, Frame, RunSummary, SerialSettings, ServoConfig, ServoLoop,
    ServoPipeline, TransmitPolicy,
};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Keeps a serial pan/tilt head pointed at the dominant moving object in view"
)]
struct Args {
    /// Camera device index.
    #[arg(short = 'c', long, default_value_t = 0)]
    camera: i32,

    /// Replay a recorded video file instead of opening a camera.
    #[arg(short = 'i', long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Serial port of the pan/tilt actuator.
    #[arg(short = 'p', long, default_value = "/dev/ttyUSB0")]
    port: String,

    /// Baud rate of the actuator's serial line.
    #[arg(short = 'b', long, default_value_t = servo_vision::core_modules::actuator_link::DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Where the motion journal is written at shutdown.
    #[arg(short = 'j', long, default_value = "motion_log.csv")]
    journal: PathBuf,

    /// Run without the diagnostic windows. Ctrl-C is then the only way to stop.
    #[arg(long)]
    headless: bool,

    /// Blobs must have more foreground pixels than this.
    #[arg(long, default_value_t = 500)]
    min_area: u32,

    /// Deadband half-width, in pixels.
    #[arg(long, default_value_t = 10)]
    movement_threshold: i32,

    /// Mask values above this are foreground (shadows are 127).
    #[arg(long, default_value_t = 127)]
    mask_threshold: u8,

    /// Only send a command when the angles actually changed.
    #[arg(long)]
    transmit_on_adjustment_only: bool,
}

impl Args {
    fn servo_config(&self) -> ServoConfig {
        ServoConfig {
            mask_threshold: self.mask_threshold,
            min_blob_area: self.min_area,
            controller: ControllerConfig {
                movement_threshold: self.movement_threshold,
                ..ControllerConfig::default()
            },
            transmit_policy: if self.transmit_on_adjustment_only {
                TransmitPolicy::OnAdjustment
            } else {
                TransmitPolicy::EveryTarget
            },
            ..ServoConfig::default()
        }
    }

    fn capture_target(&self) -> CaptureTarget {
        match &self.input {
            Some(path) => CaptureTarget::File(path.clone()),
            None => CaptureTarget::Device(self.camera),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // Ctrl-C is watched on a background runtime; the loop itself stays on the
    // main thread, which is where the GUI toolkit expects to be driven.
    let runtime = tokio::runtime::Runtime::new().context("Failed to start signal runtime")?;
    let (interrupt_tx, interrupt_rx) = watch::channel(false);
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping after the current cycle");
            let _ = interrupt_tx.send(true);
        }
    });

    let summary = run(&args, interrupt_rx)?;
    info!(
        "Run finished ({:?}): {} cycles, {} targets, {} commands sent, {} transmission failures, {} journal entries",
        summary.stop_reason,
        summary.cycles,
        summary.targets,
        summary.commands_sent,
        summary.transmission_failures,
        summary.journal_entries
    );

    runtime.shutdown_background();
    Ok(())
}

fn run(args: &Args, interrupt_rx: watch::Receiver<bool>) -> anyhow::Result<RunSummary> {
    // --- 1. Resource Acquisition ---
    // Anything acquired here is released on drop, including when a later step fails.
    let source = CameraSource::open(&args.capture_target()).context("Capture device unavailable")?;

    let settings = SerialSettings {
        baud_rate: args.baud,
        ..SerialSettings::new(args.port.as_str())
    };
    let link = ActuatorLink::open_serial(&settings).context("Actuator channel unavailable")?;

    let display = if args.headless {
        None
    } else {
        match DiagnosticDisplay::open() {
            Ok(display) => Some(display),
            Err(err) => {
                warn!("Failed to open display window: {}. Running headless.", err);
                None
            }
        }
    };
    let mut console = OperatorConsole::new(display, interrupt_rx);

    // --- 2. Main Processing Loop ---
    let pipeline = ServoPipeline::new(args.servo_config());
    let servo = ServoLoop::new(source, link, pipeline, &args.journal);
    let mut observer = |frame: &Frame, report: &CycleReport| console.poll(frame, report);

    let summary = servo.run(&mut observer).context("Servo loop failed")?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_stock_rig() {
        let args = Args::try_parse_from(["servo_runner"]).expect("parse");
        assert_eq!(args.camera, 0);
        assert_eq!(args.baud, 9600);
        assert_eq!(args.journal, PathBuf::from("motion_log.csv"));

        let config = args.servo_config();
        assert_eq!(config.min_blob_area, 500);
        assert_eq!(config.controller.movement_threshold, 10);
        assert_eq!(config.controller.frame_center, (320, 240));
        assert_eq!(config.transmit_policy, TransmitPolicy::EveryTarget);
        assert!(matches!(args.capture_target(), CaptureTarget::Device(0)));
    }

    #[test]
    fn input_file_replaces_the_camera() {
        let args = Args::try_parse_from([
            "servo_runner",
            "--input",
            "recording.mp4",
            "--transmit-on-adjustment-only",
            "--movement-threshold",
            "25",
        ])
        .expect("parse");

        assert!(matches!(args.capture_target(), CaptureTarget::File(ref p) if p == &PathBuf::from("recording.mp4")));
        let config = args.servo_config();
        assert_eq!(config.transmit_policy, TransmitPolicy::OnAdjustment);
        assert_eq!(config.controller.movement_threshold, 25);
    }
}
