//! Audio device enumeration via cpal.

use crate::Result;
use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};

/// Extract device name via `description()` (cpal 0.17+).
pub(crate) fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Audio device information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Whether the device supports audio input.
    pub is_input: bool,
    /// Whether the device supports audio output.
    pub is_output: bool,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
}

impl AudioDevice {
    /// Convenience constructor for an output-only device.
    pub fn output(name: impl Into<String>, default_sample_rate: u32) -> Self {
        Self {
            name: name.into(),
            is_input: false,
            is_output: true,
            default_sample_rate,
        }
    }

    /// Convenience constructor for an input-only device.
    pub fn input(name: impl Into<String>, default_sample_rate: u32) -> Self {
        Self {
            name: name.into(),
            is_input: true,
            is_output: false,
            default_sample_rate,
        }
    }
}

/// List all available audio devices.
pub fn list_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    // Input devices
    if let Ok(inputs) = host.input_devices() {
        for device in inputs {
            if let Ok(name) = device_name(&device) {
                let sample_rate = device
                    .default_input_config()
                    .map(|c| c.sample_rate())
                    .unwrap_or(48000);

                // Check if also an output
                let is_output = device.default_output_config().is_ok();

                devices.push(AudioDevice {
                    name,
                    is_input: true,
                    is_output,
                    default_sample_rate: sample_rate,
                });
            }
        }
    }

    // Output-only devices
    if let Ok(outputs) = host.output_devices() {
        for device in outputs {
            if let Ok(name) = device_name(&device) {
                // Skip if already added as input
                if devices.iter().any(|d| d.name == name) {
                    continue;
                }

                let sample_rate = device
                    .default_output_config()
                    .map(|c| c.sample_rate())
                    .unwrap_or(48000);

                devices.push(AudioDevice::output(name, sample_rate));
            }
        }
    }

    Ok(devices)
}

/// Get the default input and output device info.
pub fn default_device() -> Result<(Option<AudioDevice>, Option<AudioDevice>)> {
    let host = cpal::default_host();

    let input = host.default_input_device().and_then(|d| {
        device_name(&d).ok().map(|name| {
            let sample_rate = d
                .default_input_config()
                .map(|c| c.sample_rate())
                .unwrap_or(48000);
            AudioDevice::input(name, sample_rate)
        })
    });

    let output = host.default_output_device().and_then(|d| {
        device_name(&d).ok().map(|name| {
            let sample_rate = d
                .default_output_config()
                .map(|c| c.sample_rate())
                .unwrap_or(48000);
            AudioDevice::output(name, sample_rate)
        })
    });

    Ok((input, output))
}
