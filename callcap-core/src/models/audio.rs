use serde::{Deserialize, Serialize};

/// Which physical source a stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamRole {
    Mic,
    System,
}

/// An audio device visible to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub input_channels: u16,
    pub output_channels: u16,
    pub is_default_input: bool,
}

/// A fixed-length slice of accumulated audio handed to the consumer.
///
/// Every chunk except the final one holds exactly the configured number of
/// samples; the final chunk (`is_final == true`) may be shorter.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub index: u64,
    pub is_final: bool,
}

impl AudioChunk {
    pub fn duration_secs(&self, sample_rate: u32, channels: u16) -> f64 {
        if sample_rate == 0 || channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (sample_rate as f64 * channels as f64)
    }
}
