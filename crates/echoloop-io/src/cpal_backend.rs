//! cpal-based audio backend implementation.
//!
//! [`CpalBackend`] is the default [`AudioBackend`] implementation. It wraps
//! [cpal](https://crates.io/crates/cpal) for ALSA (Linux), CoreAudio (macOS)
//! and WASAPI (Windows).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use echoloop_io::{AudioBackend, BackendStreamConfig, CpalBackend};
//!
//! let backend = CpalBackend::try_new()?;
//! let stream = backend.build_output_stream(
//!     &BackendStreamConfig::default(),
//!     Box::new(|buffer: &mut [f32]| buffer.fill(0.0)),
//!     Box::new(|err| eprintln!("Audio error: {}", err)),
//! )?;
//! // Stream plays until `stream` is dropped.
//! ```

use crate::backend::{
    AudioBackend, BackendStreamConfig, ErrorCallback, InputCallback, InputConstraints,
    OutputCallback, StreamHandle,
};
use crate::devices::device_name;
use crate::{AudioDevice, Error, Result};
use cpal::Host;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

/// Maps a cpal error message onto the crate's error kinds.
///
/// cpal reports permission refusal and vanished devices through backend
/// specific strings, so the message text is all there is to go on.
pub(crate) fn classify_stream_error(message: &str) -> Error {
    let lower = message.to_lowercase();
    if ["permission", "denied", "not permitted", "unauthorized"]
        .iter()
        .any(|k| lower.contains(k))
    {
        Error::PermissionDenied(message.to_string())
    } else if ["no longer available", "not available", "no such device"]
        .iter()
        .any(|k| lower.contains(k))
    {
        Error::DeviceUnavailable(message.to_string())
    } else if lower.contains("not supported") {
        Error::UnsupportedFormat(message.to_string())
    } else {
        Error::Stream(message.to_string())
    }
}

/// cpal-based audio backend.
///
/// Holds a cpal [`Host`] instance, the connection to the platform's audio
/// system.
pub struct CpalBackend {
    host: Host,
}

impl CpalBackend {
    /// Create a new cpal backend using the platform's default audio host.
    ///
    /// On Linux this is ALSA, on macOS CoreAudio, on Windows WASAPI.
    pub fn new() -> Self {
        tracing::info!(
            host = cpal::default_host().id().name(),
            "cpal backend initialized"
        );
        Self {
            host: cpal::default_host(),
        }
    }

    /// Like [`new`](Self::new), but fails when the platform has no audio host.
    pub fn try_new() -> Result<Self> {
        if cpal::available_hosts().is_empty() {
            return Err(Error::UnsupportedPlatform(
                "no audio host available".to_string(),
            ));
        }
        Ok(Self::new())
    }

    /// Find a cpal output device by name, or return the default.
    fn find_output_device(&self, name: Option<&str>) -> Result<cpal::Device> {
        match name {
            Some(search) => {
                let search_lower = search.to_lowercase();
                let devices = self
                    .host
                    .output_devices()
                    .map_err(|e| classify_stream_error(&e.to_string()))?;

                for device in devices {
                    if let Ok(dev_name) = device_name(&device)
                        && dev_name.to_lowercase().contains(search_lower.as_str())
                    {
                        return Ok(device);
                    }
                }
                Err(Error::DeviceUnavailable(format!(
                    "no output device matching '{}'",
                    search
                )))
            }
            None => self
                .host
                .default_output_device()
                .ok_or_else(|| Error::DeviceUnavailable("no default output device".to_string())),
        }
    }

    /// Find a cpal input device by name, or return the default.
    fn find_input_device(&self, name: Option<&str>) -> Result<cpal::Device> {
        match name {
            Some(search) => {
                let search_lower = search.to_lowercase();
                let devices = self
                    .host
                    .input_devices()
                    .map_err(|e| classify_stream_error(&e.to_string()))?;

                for device in devices {
                    if let Ok(dev_name) = device_name(&device)
                        && dev_name.to_lowercase().contains(&search_lower)
                    {
                        return Ok(device);
                    }
                }
                Err(Error::DeviceUnavailable(format!(
                    "no input device matching '{}'",
                    search
                )))
            }
            None => self
                .host
                .default_input_device()
                .ok_or_else(|| Error::DeviceUnavailable("no microphone found".to_string())),
        }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn list_devices(&self) -> Result<Vec<AudioDevice>> {
        // Same host as `cpal::default_host()` used by the free function.
        crate::devices::list_devices()
    }

    fn default_output_device(&self) -> Result<Option<AudioDevice>> {
        let (_, output) = crate::devices::default_device()?;
        Ok(output)
    }

    fn default_input_device(&self) -> Result<Option<AudioDevice>> {
        let (input, _) = crate::devices::default_device()?;
        Ok(input)
    }

    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        mut callback: OutputCallback,
        mut error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        let device = self.find_output_device(config.device_name.as_deref())?;

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: config.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(config.buffer_size),
        };

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    callback(data);
                },
                move |err| {
                    error_callback(&err.to_string());
                },
                None,
            )
            .map_err(|e| classify_stream_error(&e.to_string()))?;

        stream
            .play()
            .map_err(|e| classify_stream_error(&e.to_string()))?;
        tracing::info!(
            channels = config.channels,
            sample_rate = config.sample_rate,
            "output stream started"
        );

        Ok(StreamHandle::new(stream))
    }

    fn build_input_stream(
        &self,
        config: &BackendStreamConfig,
        constraints: &InputConstraints,
        mut callback: InputCallback,
        mut error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        if !constraints.is_raw() {
            tracing::warn!(
                ?constraints,
                "cpal captures unprocessed input; voice processing request ignored"
            );
        }

        let device = self.find_input_device(config.device_name.as_deref())?;

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: config.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(config.buffer_size),
        };

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    callback(data);
                },
                move |err| {
                    error_callback(&err.to_string());
                },
                None,
            )
            .map_err(|e| classify_stream_error(&e.to_string()))?;

        stream
            .play()
            .map_err(|e| classify_stream_error(&e.to_string()))?;
        tracing::info!(
            channels = config.channels,
            sample_rate = config.sample_rate,
            "input stream started"
        );

        Ok(StreamHandle::new(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpal_backend_name() {
        let backend = CpalBackend::new();
        assert_eq!(backend.name(), "cpal");
    }

    #[test]
    fn test_cpal_backend_list_devices() {
        let backend = CpalBackend::new();
        // Should not panic; device availability depends on the system.
        let result = backend.list_devices();
        assert!(result.is_ok());
    }

    #[test]
    fn test_classify_permission() {
        assert!(matches!(
            classify_stream_error("Permission denied (os error 13)"),
            Error::PermissionDenied(_)
        ));
    }

    #[test]
    fn test_classify_device_gone() {
        assert!(matches!(
            classify_stream_error("The requested device is no longer available."),
            Error::DeviceUnavailable(_)
        ));
    }

    #[test]
    fn test_classify_format_and_fallback() {
        assert!(matches!(
            classify_stream_error("The requested stream configuration is not supported"),
            Error::UnsupportedFormat(_)
        ));
        assert!(matches!(
            classify_stream_error("something odd"),
            Error::Stream(_)
        ));
    }
}
