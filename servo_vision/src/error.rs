// THEORY:
// The `error` module holds the failure taxonomy of the servo loop. Only the I/O
// boundaries can fail: opening the capture device, opening or writing the
// actuator channel, and persisting the motion journal. Detection, selection and
// control are pure computations over well-formed frames and have no error type.
//
// End of stream is deliberately absent here: a source that runs dry returns
// `None` from `FrameSource::next_frame` and the loop shuts down normally.

use thiserror::Error;

/// The capture device could not be opened. Fatal, raised before the loop starts.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("capture device {device} unavailable: {reason}")]
    Unavailable { device: String, reason: String },
}

/// The actuator channel could not be opened. Fatal, raised before the loop starts.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("actuator channel {port} unavailable: {source}")]
    Unavailable {
        port: String,
        #[source]
        source: serialport::Error,
    },
}

/// A single command could not be written to the actuator channel.
/// Recoverable: the loop reports it and keeps going.
#[derive(Error, Debug)]
#[error("failed to transmit command {command:?}: {source}")]
pub struct TransmissionError {
    /// The encoded command line that was being written.
    pub command: String,
    #[source]
    pub source: std::io::Error,
}

/// The motion journal could not be written at shutdown. Fatal for the run.
#[derive(Error, Debug)]
pub enum JournalFlushError {
    #[error("journal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal encoding error: {0}")]
    Csv(#[from] csv::Error),

    #[error("could not move journal into place: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Umbrella error for a full run of the servo loop.
#[derive(Error, Debug)]
pub enum ServoError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Journal(#[from] JournalFlushError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_error_names_the_device() {
        let err = CaptureError::Unavailable {
            device: "camera 0".to_string(),
            reason: "not opened".to_string(),
        };
        assert!(err.to_string().contains("camera 0"));
        assert!(err.to_string().contains("not opened"));
    }

    #[test]
    fn transmission_error_keeps_the_command() {
        let err = TransmissionError {
            command: "89,90\n".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged"),
        };
        assert!(err.to_string().contains("89,90"));
        assert!(err.to_string().contains("unplugged"));
    }

    #[test]
    fn journal_error_lifts_into_servo_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let servo_err: ServoError = JournalFlushError::from(io_err).into();
        match servo_err {
            ServoError::Journal(JournalFlushError::Io(_)) => {}
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
