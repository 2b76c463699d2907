//! # callcap-core
//!
//! Platform-agnostic call capture core library.
//!
//! Captures one or two live audio streams through a backend-provided
//! [`StreamAdapter`], buffers driver-delivered frames, aligns and mixes two
//! independently-clocked streams, segments continuous audio into fixed-size
//! chunks for incremental consumption, and writes WAV/transcript/metadata
//! output. Speech recognition and text analysis stay behind trait seams —
//! samples in, text out.
//!
//! ## Architecture
//!
//! ```text
//! callcap-core (this crate)
//! ├── traits/        ← StreamAdapter, ChunkSink
//! ├── models/        ← CaptureError, CaptureState, CaptureConfig, DeviceInfo, ...
//! ├── processing/    ← mixing, levels, PCM16 quantization
//! ├── session/       ← CaptureSession, PausableSession, DualSession, streaming
//! ├── transcription/ ← SpeechRecognizer / TranscriptAnalyzer seams, StreamingTranscriber
//! └── storage/       ← WAV writer, transcript export, metadata sidecar
//! ```
//!
//! Data flow: stream adapter → per-stream queue → chunk engine (worker
//! thread) → consumer callback. Backends (e.g. `callcap-cpal`) implement
//! `StreamAdapter` and plug into the generic sessions.

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;
pub mod transcription;

// Re-export key types at crate root for convenience.
pub use models::audio::{AudioChunk, DeviceInfo, StreamRole};
pub use models::config::CaptureConfig;
pub use models::error::CaptureError;
pub use models::recording::{DualCapture, RecordingMetadata, SavedRecordings};
pub use models::state::CaptureState;
pub use models::status::RecordingStatus;
pub use session::dual::DualSession;
pub use session::pausable::PausableSession;
pub use session::single::CaptureSession;
pub use session::streaming::{StreamingDualSession, StreamingSession};
pub use traits::chunk_sink::ChunkSink;
pub use traits::stream_adapter::{FrameSink, StreamAdapter};
pub use transcription::{
    SpeechRecognizer, StreamingTranscriber, TranscriptAnalyzer, TranscriptSegment, Transcription,
};
