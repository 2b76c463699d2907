use std::path::PathBuf;
use std::str::FromStr;

/// Configuration for a capture session.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Target sample rate in Hz (default: 16000, the usual STT rate).
    pub sample_rate: u32,

    /// Number of channels (default: 1).
    pub channels: u16,

    /// Frames per driver callback. Both streams of a dual session use the
    /// same explicit block size so their queues fill in comparable steps
    /// (default: 1600 = 100 ms at 16 kHz).
    pub block_size: u32,

    /// Duration of each streaming chunk in seconds (default: 5.0).
    pub chunk_duration_secs: f64,

    /// Directory where recordings and transcripts are written.
    pub output_directory: PathBuf,

    /// Specific microphone device name, or None for the system default.
    pub mic_device: Option<String>,

    /// Loopback/virtual device name carrying system audio, or None.
    pub system_device: Option<String>,
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if ![1, 2].contains(&self.channels) {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        if self.block_size == 0 {
            return Err("block size must be positive".into());
        }
        if self.chunk_duration_secs <= 0.0 {
            return Err("chunk duration must be positive".into());
        }
        Ok(())
    }

    /// Samples per streaming chunk (`sample_rate × channels × chunk_duration`).
    pub fn chunk_samples(&self) -> usize {
        (self.sample_rate as f64 * self.channels as f64 * self.chunk_duration_secs) as usize
    }

    /// Load configuration from `CALLCAP_*` environment variables, falling
    /// back to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            sample_rate: env_or("CALLCAP_SAMPLE_RATE", defaults.sample_rate),
            channels: env_or("CALLCAP_CHANNELS", defaults.channels),
            block_size: env_or("CALLCAP_BLOCK_SIZE", defaults.block_size),
            chunk_duration_secs: env_or("CALLCAP_CHUNK_SECS", defaults.chunk_duration_secs),
            output_directory: std::env::var("CALLCAP_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_directory),
            mic_device: std::env::var("CALLCAP_MIC_DEVICE").ok(),
            system_device: std::env::var("CALLCAP_SYSTEM_DEVICE").ok(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            block_size: 1600,
            chunk_duration_secs: 5.0,
            output_directory: PathBuf::from("output"),
            mic_device: None,
            system_device: None,
        }
    }
}

fn env_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(CaptureConfig::default().validate().is_ok());
    }

    #[test]
    fn chunk_samples_at_16k() {
        let config = CaptureConfig::default();
        assert_eq!(config.chunk_samples(), 80_000);
    }

    #[test]
    fn rejects_zero_sample_rate() {
        let config = CaptureConfig {
            sample_rate: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_surround_channel_counts() {
        let config = CaptureConfig {
            channels: 6,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_nonpositive_chunk_duration() {
        let config = CaptureConfig {
            chunk_duration_secs: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
