//! TOML application config.
//!
//! Every section and field is optional; missing values take the defaults
//! below. Parameter values are clamped into their ranges on load, the rest
//! is checked by [`AppConfig::validate`].
//!
//! ```toml
//! [audio]
//! sample_rate = 48000
//! buffer_size = 256
//! input_device = "USB"
//! output_device = "JBL"
//!
//! [params]
//! gain = 1.0
//! delay_time = 0.3
//! feedback_gain = 0.4
//!
//! [display]
//! frame_interval_ms = 16
//! smoothing = 0.8
//! min_db = -100.0
//! max_db = -30.0
//! ```

use std::path::Path;
use std::time::Duration;

use echoloop_analysis::AnalyzerConfig;
use echoloop_core::{DELAY_TIME_RANGE, FEEDBACK_RANGE, GAIN_RANGE, ParameterSnapshot};
use echoloop_io::StreamConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Audio device and stream settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AudioSection {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Requested buffer size in frames.
    pub buffer_size: u32,
    /// Substring of the input device name; default device if absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_device: Option<String>,
    /// Substring of the output device name; default device if absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_device: Option<String>,
}

impl Default for AudioSection {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 256,
            input_device: None,
            output_device: None,
        }
    }
}

/// Initial live parameter values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParamsSection {
    /// Output gain, linear 0.0-1.5.
    pub gain: f32,
    /// Echo delay in seconds, 0.0-1.0.
    pub delay_time: f32,
    /// Feedback gain, 0.0-0.95.
    pub feedback_gain: f32,
}

impl Default for ParamsSection {
    fn default() -> Self {
        Self {
            gain: GAIN_RANGE.default,
            delay_time: DELAY_TIME_RANGE.default,
            feedback_gain: FEEDBACK_RANGE.default,
        }
    }
}

/// Spectrum display settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplaySection {
    /// Time between rendered frames.
    pub frame_interval_ms: u64,
    /// Analyzer temporal smoothing.
    pub smoothing: f32,
    /// Level drawn as an empty bar.
    pub min_db: f32,
    /// Level drawn as a full bar.
    pub max_db: f32,
}

impl Default for DisplaySection {
    fn default() -> Self {
        let analyzer = AnalyzerConfig::default();
        Self {
            frame_interval_ms: 16,
            smoothing: analyzer.smoothing,
            min_db: analyzer.min_db,
            max_db: analyzer.max_db,
        }
    }
}

/// Whole application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// `[audio]`
    pub audio: AudioSection,
    /// `[params]`
    pub params: ParamsSection,
    /// `[display]`
    pub display: DisplaySection,
}

impl AppConfig {
    /// Load a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Parse a config from a TOML string. Parameters are clamped.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config: AppConfig = toml::from_str(toml_str)?;
        config.set_snapshot(config.snapshot());
        Ok(config)
    }

    /// Rejects settings the session cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(8000..=192_000).contains(&self.audio.sample_rate) {
            return Err(ConfigError::invalid(
                "audio.sample_rate",
                format!("{} Hz is outside 8000..=192000", self.audio.sample_rate),
            ));
        }
        if !(16..=8192).contains(&self.audio.buffer_size) {
            return Err(ConfigError::invalid(
                "audio.buffer_size",
                format!("{} frames is outside 16..=8192", self.audio.buffer_size),
            ));
        }
        if self.display.frame_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "display.frame_interval_ms",
                "must be at least 1",
            ));
        }
        self.analyzer_config()
            .validate()
            .map_err(|e| ConfigError::invalid("display", e.to_string()))
    }

    /// Initial parameter values, clamped.
    pub fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot {
            gain: self.params.gain,
            delay_time_secs: self.params.delay_time,
            feedback_gain: self.params.feedback_gain,
        }
        .clamped()
    }

    /// Stores `snapshot` (clamped) as the initial parameter values.
    pub fn set_snapshot(&mut self, snapshot: ParameterSnapshot) {
        let snapshot = snapshot.clamped();
        self.params = ParamsSection {
            gain: snapshot.gain,
            delay_time: snapshot.delay_time_secs,
            feedback_gain: snapshot.feedback_gain,
        };
    }

    /// Stream settings for [`SignalGraph::construct`](echoloop_io::SignalGraph::construct).
    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            sample_rate: self.audio.sample_rate,
            buffer_size: self.audio.buffer_size,
            input_device: self.audio.input_device.clone(),
            output_device: self.audio.output_device.clone(),
            ..StreamConfig::default()
        }
    }

    /// Analyzer settings from `[display]`.
    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            smoothing: self.display.smoothing,
            min_db: self.display.min_db,
            max_db: self.display.max_db,
        }
    }

    /// Render frame interval.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.display.frame_interval_ms.max(1))
    }
}
