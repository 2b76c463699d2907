use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::audio::StreamRole;

/// Output of a dual-stream recording: the time-aligned mix plus both
/// originals. All three are empty when either stream captured nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DualCapture {
    pub combined: Vec<f32>,
    pub mic: Vec<f32>,
    pub system: Vec<f32>,
}

impl DualCapture {
    pub fn is_empty(&self) -> bool {
        self.combined.is_empty()
    }
}

/// Paths written by a dual-session save; empty tracks are skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedRecordings {
    pub combined: Option<PathBuf>,
    pub mic: Option<PathBuf>,
    pub system: Option<PathBuf>,
}

/// Metadata stored in a JSON sidecar alongside a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub created_at: String,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub sources: Vec<StreamRole>,
}

impl RecordingMetadata {
    pub fn new(duration_secs: f64, sample_rate: u32, channels: u16, sources: Vec<StreamRole>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            duration_secs,
            sample_rate,
            channels,
            sources,
        }
    }
}
