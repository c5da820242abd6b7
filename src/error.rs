use crate::config::ConfigError;
use crate::format::FormatError;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("no `{binary}` executable found under {install_dir}")]
    ExecutableNotFound { install_dir: String, binary: String },
    #[error("found {count} `{binary}` executables under {install_dir}; expected exactly one")]
    AmbiguousExecutable {
        install_dir: String,
        binary: String,
        count: usize,
    },
    #[error("failed to launch simulation in {working_dir}: {reason}")]
    LaunchFailed { working_dir: String, reason: String },
    #[error("timed out after {timeout_ms}ms waiting for output channel `{channel}`")]
    SimulationTimeout { channel: String, timeout_ms: u64 },
    #[error("output channel `{channel}` produced no data rows")]
    EmptyResult { channel: String },
    #[error("output channel `{channel}` is malformed: {reason}")]
    MalformedOutput { channel: String, reason: String },
    #[error("failed to deliver input channel `{channel}`: {source}")]
    WriteFailed {
        channel: String,
        #[source]
        source: std::io::Error,
    },
    #[error("worker for channel `{channel}` panicked")]
    WorkerPanicked { channel: String },
    #[error("run lifecycle cannot move from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl SimulationError {
    /// Logical channel name for per-channel failures.
    pub fn channel(&self) -> Option<&str> {
        match self {
            Self::SimulationTimeout { channel, .. }
            | Self::EmptyResult { channel }
            | Self::MalformedOutput { channel, .. }
            | Self::WriteFailed { channel, .. }
            | Self::WorkerPanicked { channel } => Some(channel),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::SimulationTimeout { .. })
    }
}

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> SimulationError {
    SimulationError::Io {
        path: path.display().to_string(),
        source,
    }
}
