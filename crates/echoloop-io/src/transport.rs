//! Output transport discovery.
//!
//! Reports whether a wireless (Bluetooth-like) speaker is among the output
//! devices, so the control surface can show a hint. Purely informational:
//! output always goes to the default (or configured) device.

use crate::AudioDevice;

/// Name fragments that identify wireless audio outputs.
const WIRELESS_KEYWORDS: &[&str] = &[
    "bluetooth",
    "bluez",
    "a2dp",
    "airpods",
    "wireless",
    "jbl",
    "bose",
    "beats",
];

/// Kind of audio path to the speakers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputTransport {
    /// Built-in or cabled output.
    Wired,
    /// Bluetooth or similar radio link.
    Wireless,
}

/// Outcome of [`detect_wireless_output`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportReport {
    /// Detected transport.
    pub transport: OutputTransport,
    /// Name of the first wireless output found.
    pub device: Option<String>,
}

impl TransportReport {
    /// True when a wireless output is present.
    pub fn is_wireless(&self) -> bool {
        self.transport == OutputTransport::Wireless
    }

    /// Human-readable status line for the control surface.
    pub fn hint(&self) -> String {
        match &self.device {
            Some(name) => format!(
                "Wireless output '{name}' found - pair it as the default device; expect extra latency"
            ),
            None => "No wireless output found - audio plays on the default output".to_string(),
        }
    }
}

/// Returns true when `name` looks like a wireless output.
pub fn is_wireless_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    WIRELESS_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Scans `devices` for a wireless output.
pub fn detect_wireless_output(devices: &[AudioDevice]) -> TransportReport {
    let device = devices
        .iter()
        .find(|d| d.is_output && is_wireless_name(&d.name))
        .map(|d| d.name.clone());

    match device {
        Some(name) => {
            tracing::info!(device = %name, "wireless output detected");
            TransportReport {
                transport: OutputTransport::Wireless,
                device: Some(name),
            }
        }
        None => TransportReport {
            transport: OutputTransport::Wired,
            device: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_bluetooth_speaker() {
        let devices = vec![
            AudioDevice::output("Built-in Speakers", 48000),
            AudioDevice::output("JBL Flip 5", 48000),
        ];
        let report = detect_wireless_output(&devices);
        assert!(report.is_wireless());
        assert_eq!(report.device.as_deref(), Some("JBL Flip 5"));
        assert!(report.hint().contains("JBL Flip 5"));
    }

    #[test]
    fn ignores_wireless_inputs() {
        let devices = vec![
            AudioDevice::input("Bluetooth Headset Mic", 16000),
            AudioDevice::output("HDMI Output", 48000),
        ];
        let report = detect_wireless_output(&devices);
        assert_eq!(report.transport, OutputTransport::Wired);
        assert!(report.hint().contains("default output"));
    }

    #[test]
    fn empty_list_is_wired() {
        assert!(!detect_wireless_output(&[]).is_wireless());
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        assert!(is_wireless_name("bluez_output.A2DP_SINK"));
        assert!(!is_wireless_name("Realtek HD Audio"));
    }

    #[test]
    fn wired_headsets_are_not_wireless() {
        let devices = vec![
            AudioDevice::output("USB Headset Analog Stereo", 48000),
            AudioDevice::output("Headset (Realtek Audio)", 48000),
        ];
        assert!(!detect_wireless_output(&devices).is_wireless());
    }
}
