use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open device {spec}: {reason}")]
    DeviceOpen { spec: String, reason: String },
    #[error("capture failed: {0}")]
    Capture(String),
    #[error("stream already started")]
    AlreadyStarted,
    #[error("stream not started")]
    NotStarted,
    #[error("stream stopped")]
    Stopped,
    #[error("no new frame within {0:?}")]
    Timeout(Duration),
    #[error("failed to spawn capture thread: {0}")]
    Spawn(String),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl Error {
    pub(crate) fn device_open(spec: impl Into<String>, reason: impl ToString) -> Self {
        Error::DeviceOpen {
            spec: spec.into(),
            reason: reason.to_string(),
        }
    }
}
