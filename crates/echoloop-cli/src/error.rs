//! Error types for sessions and configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Status line shown while the microphone is being acquired.
pub const STATUS_STARTING: &str = "Starting microphone...";
/// Status line shown while a session is live.
pub const STATUS_LIVE: &str = "Live - sing along!";
/// Status line shown when idle.
pub const STATUS_READY: &str = "Ready to start";

/// Errors from session start/stop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The platform refused microphone access.
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),

    /// No usable audio device.
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Audio capture is not available on this platform.
    #[error("audio capture not supported: {0}")]
    UnsupportedPlatform(String),

    /// `start` was called while a session is live.
    #[error("session already active")]
    AlreadyActive,

    /// `stop` was called with no live session.
    #[error("session already idle")]
    AlreadyIdle,

    /// Any other stream or graph failure.
    #[error("audio error: {0}")]
    Audio(String),

    /// The render thread could not be started.
    #[error("render loop error: {0}")]
    Render(String),
}

impl SessionError {
    /// False for guard rejections that leave the session unchanged.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::AlreadyActive | Self::AlreadyIdle)
    }

    /// The one-line status shown to the user for this error.
    pub fn status_message(&self) -> String {
        match self {
            Self::PermissionDenied(_) => "Error: microphone access denied".to_string(),
            Self::DeviceUnavailable(_) => "Error: no audio device available".to_string(),
            Self::UnsupportedPlatform(_) => {
                "Error: audio capture not supported on this platform".to_string()
            }
            Self::AlreadyActive => STATUS_LIVE.to_string(),
            Self::AlreadyIdle => STATUS_READY.to_string(),
            Self::Audio(reason) => format!("Error: audio failure ({reason})"),
            Self::Render(reason) => format!("Error: display failure ({reason})"),
        }
    }
}

impl From<echoloop_io::Error> for SessionError {
    fn from(err: echoloop_io::Error) -> Self {
        use echoloop_io::Error;
        match err {
            Error::PermissionDenied(msg) => Self::PermissionDenied(msg),
            Error::DeviceUnavailable(msg) => Self::DeviceUnavailable(msg),
            Error::UnsupportedPlatform(msg) => Self::UnsupportedPlatform(msg),
            other => Self::Audio(other.to_string()),
        }
    }
}

/// Errors from loading or validating an [`AppConfig`](crate::AppConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A value is outside what the session can run with
    #[error("invalid value for '{field}': {reason}")]
    Invalid {
        /// Dotted field name, e.g. `audio.sample_rate`.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a validation error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
