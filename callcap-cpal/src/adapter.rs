//! cpal-backed stream adapter.
//!
//! Opens one input device at the session's exact sample rate, channel
//! count, and block size, and hands every delivered frame to the session's
//! sink as f32 samples. No resampling happens here: a rate the device
//! cannot honor is an open failure, not a silent conversion.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig};

use callcap_core::models::audio::DeviceInfo;
use callcap_core::models::config::CaptureConfig;
use callcap_core::models::error::CaptureError;
use callcap_core::traits::stream_adapter::{FrameSink, StreamAdapter};

use crate::devices;

/// One hardware input stream.
///
/// The underlying `cpal::Stream` is bound to the thread that opened it, so
/// the adapter (and any session owning it) stays on the controller thread;
/// cpal delivers frames on its own driver callback thread either way.
pub struct CpalStreamAdapter {
    device: cpal::Device,
    info: DeviceInfo,
    sample_rate: u32,
    channels: u16,
    block_size: u32,
    stream: Option<cpal::Stream>,
}

impl CpalStreamAdapter {
    /// Adapter over the system default input device.
    pub fn default_input(config: &CaptureConfig) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(CaptureError::DeviceNotAvailable)?;
        Ok(Self::from_device(device, true, config))
    }

    /// Adapter over a specific input device, matched by exact name.
    pub fn by_name(name: &str, config: &CaptureConfig) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let mut devices = host
            .input_devices()
            .map_err(|e| CaptureError::Device(e.to_string()))?;
        let device = devices
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| CaptureError::Device(format!("input device '{}' not found", name)))?;
        Ok(Self::from_device(device, false, config))
    }

    /// Microphone adapter: the configured device name, or the default input.
    pub fn for_mic(config: &CaptureConfig) -> Result<Self, CaptureError> {
        match &config.mic_device {
            Some(name) => Self::by_name(name, config),
            None => Self::default_input(config),
        }
    }

    /// System-audio adapter: the configured device name, or the first
    /// loopback device discovered by [`devices::find_loopback_device`].
    /// Fails with [`CaptureError::DeviceNotAvailable`] when no loopback
    /// device exists — dual capture treats that as a hard precondition.
    pub fn for_system(config: &CaptureConfig) -> Result<Self, CaptureError> {
        match &config.system_device {
            Some(name) => Self::by_name(name, config),
            None => {
                let info = devices::find_loopback_device(devices::DEFAULT_LOOPBACK_HINT)?
                    .ok_or(CaptureError::DeviceNotAvailable)?;
                Self::by_name(&info.name, config)
            }
        }
    }

    fn from_device(device: cpal::Device, is_default_input: bool, config: &CaptureConfig) -> Self {
        let info = devices::describe(&device, is_default_input);
        Self {
            device,
            info,
            sample_rate: config.sample_rate,
            channels: config.channels,
            block_size: config.block_size,
            stream: None,
        }
    }
}

impl StreamAdapter for CpalStreamAdapter {
    fn start(&mut self, sink: FrameSink) -> Result<(), CaptureError> {
        if self.stream.is_some() {
            return Err(CaptureError::Device(format!(
                "{} is already streaming",
                self.info.name
            )));
        }

        let stream_config = StreamConfig {
            channels: self.channels,
            sample_rate: SampleRate(self.sample_rate),
            buffer_size: BufferSize::Fixed(self.block_size),
        };
        let format = self
            .device
            .default_input_config()
            .map_err(|e| CaptureError::Device(e.to_string()))?
            .sample_format();

        // Keep the error callback quiet for the driver and mirror issues
        // into the log.
        let err_fn = |err| log::warn!("input stream error: {}", err);

        // Convert every supported sample type to f32 up front so sessions
        // stay format-agnostic.
        let stream = match format {
            SampleFormat::F32 => self
                .device
                .build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| sink(data),
                    err_fn,
                    None,
                ),
            SampleFormat::I16 => {
                let mut scratch = Vec::new();
                self.device.build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        scratch.clear();
                        scratch.extend(data.iter().map(|&s| s as f32 / 32_768.0));
                        sink(&scratch);
                    },
                    err_fn,
                    None,
                )
            }
            SampleFormat::U16 => {
                let mut scratch = Vec::new();
                self.device.build_input_stream(
                    &stream_config,
                    move |data: &[u16], _: &cpal::InputCallbackInfo| {
                        scratch.clear();
                        scratch.extend(
                            data.iter().map(|&s| (s as f32 - 32_768.0) / 32_768.0),
                        );
                        sink(&scratch);
                    },
                    err_fn,
                    None,
                )
            }
            other => {
                return Err(CaptureError::Device(format!(
                    "unsupported sample format: {:?}",
                    other
                )))
            }
        }
        .map_err(|e| CaptureError::Device(e.to_string()))?;

        stream
            .play()
            .map_err(|e| CaptureError::Device(e.to_string()))?;
        self.stream = Some(stream);
        log::debug!(
            "input stream opened ({}, {} Hz, {} ch, block {})",
            self.info.name,
            self.sample_rate,
            self.channels,
            self.block_size
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        // Abort-style: dropping the stream discards in-flight driver
        // buffers instead of draining them, keeping shutdown latency
        // bounded. Safe to call repeatedly or before a successful start.
        if let Some(stream) = self.stream.take() {
            let paused = stream.pause();
            drop(stream);
            if let Err(err) = paused {
                return Err(CaptureError::StreamStop(err.to_string()));
            }
        }
        Ok(())
    }

    fn device_info(&self) -> DeviceInfo {
        self.info.clone()
    }
}
