// THEORY:
// The `ActuatorLink` is the outbound wire to the pan/tilt head. It encodes an
// `ActuatorState` as one text line, `"<x_angle>,<y_angle>\n"`, and writes it to
// an already-open byte channel.
//
// The link is generic over any `std::io::Write` so the loop can drive a real
// serial port in production and an in-memory buffer under test. A failed write
// is reported to the caller as a `TransmissionError`; the channel is not
// reopened, so every later command is attempted on the same channel again.
//
// A write that fails part way leaves a fragment of a line on the wire. The link
// remembers that, and the next command is preceded by a lone `\n` so the
// fragment is terminated on its own and never merges into a valid command.

use crate::core_modules::actuator_controller::ActuatorState;
use crate::error::{LinkError, TransmissionError};
use serialport::SerialPort;
use std::io::{self, Write};
use std::time::Duration;
use tracing::{info, warn};

/// Baud rate of the stock pan/tilt firmware.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Encodes a state as the actuator's command line.
pub fn encode_command(state: ActuatorState) -> String {
    format!("{},{}\n", state.x_angle, state.y_angle)
}

/// Where and how to open the serial actuator channel.
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
    /// Upper bound on a single write before it is reported as failed. The
    /// serial backend needs a finite value; a write cut short by it is
    /// terminated on the next send.
    pub write_timeout: Duration,
}

impl SerialSettings {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            write_timeout: Duration::from_secs(10),
        }
    }
}

/// A line-based command channel to the pan/tilt actuator.
pub struct ActuatorLink<W: Write> {
    channel: W,
    commands_sent: u64,
    failures: u64,
    /// Set when the last write stopped in the middle of a line.
    needs_resync: bool,
}

impl ActuatorLink<Box<dyn SerialPort>> {
    /// Opens the serial channel. Failing here is fatal for the run.
    pub fn open_serial(settings: &SerialSettings) -> Result<Self, LinkError> {
        let port = serialport::new(settings.port.as_str(), settings.baud_rate)
            .timeout(settings.write_timeout)
            .open()
            .map_err(|source| LinkError::Unavailable {
                port: settings.port.clone(),
                source,
            })?;
        info!("Actuator channel {} opened at {} baud", settings.port, settings.baud_rate);
        Ok(Self::new(port))
    }
}

impl<W: Write> ActuatorLink<W> {
    pub fn new(channel: W) -> Self {
        Self {
            channel,
            commands_sent: 0,
            failures: 0,
            needs_resync: false,
        }
    }

    /// Writes one command line for `state` and flushes the channel.
    pub fn send(&mut self, state: ActuatorState) -> Result<(), TransmissionError> {
        let command = encode_command(state);
        let mut line = Vec::with_capacity(command.len() + 1);
        if self.needs_resync {
            line.push(b'\n');
        }
        line.extend_from_slice(command.as_bytes());

        let (written, result) = write_counted(&mut self.channel, &line);
        let result = result.and_then(|_| self.channel.flush());

        // Anything short of a full line, but more than nothing, leaves a fragment.
        if written == line.len() {
            self.needs_resync = false;
        } else if written > 0 {
            self.needs_resync = true;
        }

        match result {
            Ok(()) => {
                self.commands_sent += 1;
                info!("Sent to actuator: {}", command.trim_end());
                Ok(())
            }
            Err(source) => {
                self.failures += 1;
                if written > 0 && written < line.len() {
                    warn!("Partial command left on the actuator channel ({} of {} bytes)", written, line.len());
                }
                Err(TransmissionError { command, source })
            }
        }
    }

    /// True if the next command will first terminate a partial line.
    pub fn needs_resync(&self) -> bool {
        self.needs_resync
    }

    pub fn commands_sent(&self) -> u64 {
        self.commands_sent
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn channel(&self) -> &W {
        &self.channel
    }

    /// Releases the link and hands back the underlying channel.
    pub fn into_inner(self) -> W {
        self.channel
    }
}

/// `write_all` that also reports how many bytes reached the channel.
fn write_counted<W: Write>(channel: &mut W, mut buf: &[u8]) -> (usize, io::Result<()>) {
    let mut written = 0;
    while !buf.is_empty() {
        match channel.write(buf) {
            Ok(0) => {
                return (written, Err(io::Error::new(io::ErrorKind::WriteZero, "channel accepted no bytes")));
            }
            Ok(n) => {
                written += n;
                buf = &buf[n..];
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return (written, Err(e)),
        }
    }
    (written, Ok(()))
}
