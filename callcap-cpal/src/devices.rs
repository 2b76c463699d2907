//! Audio device enumeration and discovery via cpal.
//!
//! Exposes the host's device table as [`DeviceInfo`] records, finds the
//! default input, and locates a loopback/virtual device (the capturable
//! input that carries another application's output) by a case-insensitive
//! substring of its advertised name.

use cpal::traits::{DeviceTrait, HostTrait};

use callcap_core::models::audio::DeviceInfo;
use callcap_core::models::error::CaptureError;

/// Name fragment of the usual macOS loopback driver; callers can match any
/// other virtual device by passing their own hint.
pub const DEFAULT_LOOPBACK_HINT: &str = "blackhole";

pub(crate) fn describe(device: &cpal::Device, is_default_input: bool) -> DeviceInfo {
    let name = device
        .name()
        .unwrap_or_else(|_| "Unknown Device".to_string());
    let input_channels = device
        .default_input_config()
        .map(|config| config.channels())
        .unwrap_or(0);
    let output_channels = device
        .default_output_config()
        .map(|config| config.channels())
        .unwrap_or(0);
    DeviceInfo {
        id: name.clone(),
        name,
        input_channels,
        output_channels,
        is_default_input,
    }
}

/// List every audio device the host exposes.
pub fn list_devices() -> Result<Vec<DeviceInfo>, CaptureError> {
    let host = cpal::default_host();
    let default_input_name = host.default_input_device().and_then(|d| d.name().ok());
    let devices = host
        .devices()
        .map_err(|e| CaptureError::Device(e.to_string()))?;
    Ok(devices
        .map(|device| {
            let is_default = device
                .name()
                .ok()
                .as_deref()
                .is_some_and(|name| Some(name) == default_input_name.as_deref());
            describe(&device, is_default)
        })
        .collect())
}

/// The platform's default input device, if any.
pub fn default_input_device() -> Option<DeviceInfo> {
    let host = cpal::default_host();
    host.default_input_device()
        .map(|device| describe(&device, true))
}

/// Find an input-capable device whose name contains `hint`
/// (case-insensitive). A missing loopback device is reported, not fatal:
/// the caller decides whether to degrade to mic-only capture.
pub fn find_loopback_device(hint: &str) -> Result<Option<DeviceInfo>, CaptureError> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| CaptureError::Device(e.to_string()))?;
    for device in devices {
        if let Ok(name) = device.name() {
            if name_matches(&name, hint) {
                return Ok(Some(describe(&device, false)));
            }
        }
    }
    log::warn!("no loopback device matching '{}' found", hint);
    Ok(None)
}

pub(crate) fn name_matches(name: &str, needle: &str) -> bool {
    name.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_ignores_case() {
        assert!(name_matches("BlackHole 2ch", "blackhole"));
        assert!(name_matches("blackhole 16ch", "BlackHole"));
        assert!(name_matches("VB-Cable", "vb-cable"));
    }

    #[test]
    fn matching_is_substring_not_equality() {
        assert!(name_matches("Existing BlackHole Device", "blackhole"));
        assert!(!name_matches("Built-in Microphone", "blackhole"));
    }
}
