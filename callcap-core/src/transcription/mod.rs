//! Seams to the external recognition and analysis engines.
//!
//! Speech-to-text and transcript analysis are opaque collaborators: samples
//! in, text out. Nothing in this crate runs inference; controllers plug a
//! real engine in behind these traits.

pub mod streaming;

use serde::{Deserialize, Serialize};

pub use streaming::{ChunkTranscript, StreamingTranscriber};

/// One timed span of recognized speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Result of recognizing one buffer of audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    pub segments: Vec<TranscriptSegment>,
    pub language: Option<String>,
}

/// Speech-to-text engine. Each call is a standalone request; no streaming
/// protocol is assumed.
pub trait SpeechRecognizer: Send + Sync {
    fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<Transcription, String>;
}

/// Text analysis service, one stateless request per full transcript.
pub trait TranscriptAnalyzer: Send + Sync {
    fn analyze(&self, transcript: &str) -> Result<String, String>;
}
