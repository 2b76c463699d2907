//! Incremental transcription of streamed chunks.

use parking_lot::Mutex;

use crate::models::audio::AudioChunk;
use crate::processing::mixer;
use crate::traits::chunk_sink::ChunkSink;

use super::{SpeechRecognizer, Transcription, TranscriptSegment};

/// Minimum chunk length worth transcribing, in seconds.
const MIN_CHUNK_SECS: f64 = 0.5;

/// Peak level below which a chunk is treated as silence and skipped.
const SILENCE_FLOOR: f32 = 0.01;

/// Transcript of one streamed chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkTranscript {
    pub chunk: u64,
    pub text: String,
    pub segments: Vec<TranscriptSegment>,
}

/// A [`ChunkSink`] that feeds each chunk to a [`SpeechRecognizer`] and
/// accumulates the per-chunk transcripts.
///
/// Chunks that are too short or below the silence floor are skipped without
/// a recognition request. Runs on the chunk engine's worker thread, so a
/// slow recognizer delays chunk delivery but never drops audio (the queues
/// upstream are unbounded).
pub struct StreamingTranscriber<R> {
    recognizer: R,
    sample_rate: u32,
    channels: u16,
    entries: Mutex<Vec<ChunkTranscript>>,
}

impl<R: SpeechRecognizer> StreamingTranscriber<R> {
    pub fn new(recognizer: R, sample_rate: u32, channels: u16) -> Self {
        Self {
            recognizer,
            sample_rate,
            channels,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// All per-chunk transcripts accumulated so far, in emission order.
    pub fn transcripts(&self) -> Vec<ChunkTranscript> {
        self.entries.lock().clone()
    }

    /// The non-empty chunk texts joined into one transcript.
    pub fn full_transcript(&self) -> String {
        self.entries
            .lock()
            .iter()
            .map(|t| t.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// All recognized segments across chunks, in emission order.
    pub fn segments(&self) -> Vec<TranscriptSegment> {
        self.entries
            .lock()
            .iter()
            .flat_map(|t| t.segments.iter().cloned())
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn recognize(&self, samples: &[f32]) -> Result<Transcription, String> {
        // The recognizer expects mono input; dual-channel sessions deliver
        // interleaved frames.
        if self.channels > 1 {
            let mono = mixer::downmix_to_mono(samples, self.channels as usize);
            self.recognizer.transcribe(&mono, self.sample_rate)
        } else {
            self.recognizer.transcribe(samples, self.sample_rate)
        }
    }
}

impl<R: SpeechRecognizer> ChunkSink for StreamingTranscriber<R> {
    fn on_chunk(&self, chunk: &AudioChunk) -> Result<(), String> {
        if chunk.duration_secs(self.sample_rate, self.channels) < MIN_CHUNK_SECS {
            return Ok(());
        }
        let peak = mixer::peak_level(&chunk.samples);
        if peak < SILENCE_FLOOR {
            log::debug!("chunk {} skipped as silence (peak {:.4})", chunk.index, peak);
            return Ok(());
        }
        log::debug!(
            "transcribing chunk {} ({} samples, rms {:.4})",
            chunk.index,
            chunk.samples.len(),
            mixer::rms_level(&chunk.samples)
        );

        let result = self.recognize(&chunk.samples)?;
        let text = result.text.trim().to_string();
        if !text.is_empty() {
            self.entries.lock().push(ChunkTranscript {
                chunk: chunk.index,
                text,
                segments: result.segments,
            });
        }
        Ok(())
    }
}
